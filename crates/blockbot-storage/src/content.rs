//! Persisted module content.
//!
//! A module is stored as one pretty-printed JSON document holding its
//! serialized block graph plus the declarations other modules resolve
//! against. The text is canonical: [`make_module_content_text`] of a parsed
//! document reproduces it byte for byte, which is what change detection
//! compares.

use blockbot_core::decl::{ComponentDecl, EventDecl, MethodDecl};
use blockbot_core::{Declarations, Module, ModuleType, OpModeDetails, SerializedWorkspace};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleContent {
    pub module_type: ModuleType,
    #[serde(default)]
    pub blocks: SerializedWorkspace,
    #[serde(default)]
    pub components: Vec<ComponentDecl>,
    #[serde(default)]
    pub events: Vec<EventDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_mode: Option<OpModeDetails>,
}

impl ModuleContent {
    /// Empty content for a new module.
    pub fn new(module_type: ModuleType) -> Self {
        ModuleContent {
            module_type,
            blocks: SerializedWorkspace::default(),
            components: Vec::new(),
            events: Vec::new(),
            methods: Vec::new(),
            op_mode: None,
        }
    }

    /// The declarations this module offers to the rest of its workspace.
    pub fn declarations(&self) -> Declarations {
        Declarations {
            components: self.components.clone(),
            events: self.events.clone(),
            methods: self.methods.clone(),
        }
    }

    pub fn to_text(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds the canonical content text of a module.
pub fn make_module_content_text(
    module: &Module,
    blocks: SerializedWorkspace,
    components: Vec<ComponentDecl>,
    events: Vec<EventDecl>,
    methods: Vec<MethodDecl>,
    op_mode: Option<OpModeDetails>,
) -> Result<String, StorageError> {
    ModuleContent {
        module_type: module.module_type,
        blocks,
        components,
        events,
        methods,
        op_mode,
    }
    .to_text()
}

/// Parses content text. Malformed JSON and documents whose module type is
/// unknown both fail.
pub fn parse_module_content_text(text: &str) -> Result<ModuleContent, StorageError> {
    let content: ModuleContent = serde_json::from_str(text)?;
    if content.module_type == ModuleType::Unknown {
        return Err(StorageError::InvalidContent {
            reason: "module type is unknown".to_string(),
        });
    }
    Ok(content)
}

pub fn new_module_content_text(module_type: ModuleType) -> Result<String, StorageError> {
    ModuleContent::new(module_type).to_text()
}
