use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::RunnelResult;

pub const DEFAULT_TASK: &str = "default";
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkspaceConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    /// Task run when none is given on the command line
    pub default_task: Option<String>,
    /// Debounce window for watch mode, in milliseconds
    pub debounce_ms: Option<u64>,
}

impl WorkspaceConfig {
    pub fn default_task(&self) -> &str {
        self.default_task.as_deref().unwrap_or(DEFAULT_TASK)
    }

    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)
    }
}

pub fn parse_workspace_config(yaml_str: &str) -> RunnelResult<WorkspaceConfig> {
    let config: WorkspaceConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config)
}
