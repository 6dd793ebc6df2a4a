//! YAML configuration: `.runnel/workspace.yml` and `.runnel/tasks/*.yml`

pub mod tasks;
pub mod workspace;
