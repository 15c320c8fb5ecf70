//! Consistency diagnostics produced while generating.
//!
//! Generation never fails on a dangling or mis-shaped reference; it emits
//! best-effort code and records what it had to paper over.

use blockbot_core::BlockId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A problem tied to one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub block: BlockId,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(block: BlockId, message: impl Into<String>) -> Self {
        Diagnostic {
            block,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: block {}: {}", self.block, self.message)
    }
}
