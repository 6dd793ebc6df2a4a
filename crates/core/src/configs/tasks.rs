use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{RunnelError, RunnelResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Command {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskConfig {
    pub name: String,
    pub description: Option<String>,
    pub script: Option<String>,
    pub command: Option<Command>,
    pub dependencies: Option<Vec<String>>,
    /// Hide the task from listings; it can still be depended on or triggered by watch rules.
    #[serde(default)]
    pub internal: bool,
    /// Commands that replace `command` while the named mode is active.
    pub modes: Option<BTreeMap<String, Command>>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WatchConfig {
    /// Glob patterns, relative to the workspace root
    pub patterns: Vec<String>,
    /// Tasks to run when a matching file changes
    pub tasks: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TasksFileConfig {
    pub description: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

pub fn parse_tasks_config(yaml_str: &str) -> RunnelResult<TasksFileConfig> {
    let config: TasksFileConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config)
}

/// Pretty-printed JSON schema for tasks files
pub fn tasks_schema() -> RunnelResult<String> {
    let schema = schemars::schema_for!(TasksFileConfig);
    serde_json::to_string_pretty(&schema)
        .map_err(|e| RunnelError::Config(format!("Failed to render tasks schema: {}", e)))
}
