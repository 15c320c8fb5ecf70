//! Storage-layer records: stored module entries and grouped projects.

use std::time::{SystemTime, UNIX_EPOCH};

use blockbot_core::{Module, ModuleType};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::path;

/// One stored module as listed by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
    pub date_modified_millis: i64,
}

impl ModuleEntry {
    /// Full module identity, with names taken from the path.
    pub fn to_module(&self) -> Result<Module, StorageError> {
        let (workspace, module) = path::parse_module_path(&self.path)?;
        Ok(Module {
            module_path: self.path.clone(),
            module_type: self.module_type,
            module_name: module.to_string(),
            workspace_name: workspace.to_string(),
            date_modified_millis: self.date_modified_millis,
        })
    }
}

/// A workspace: its robot plus mechanisms and opmodes, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub robot: Module,
    pub mechanisms: Vec<Module>,
    pub op_modes: Vec<Module>,
}

impl Project {
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        std::iter::once(&self.robot).chain(&self.mechanisms).chain(&self.op_modes)
    }
}

/// Milliseconds since the unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
