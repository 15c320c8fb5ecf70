//! Codegen error types.

use blockbot_core::{CoreError, ModuleType};

/// Errors that stop generation outright. Consistency problems in the graph
/// are reported as [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// The graph could not be read.
    #[error("invalid graph: {0}")]
    Graph(#[from] CoreError),

    /// The module type has no python class shape.
    #[error("cannot generate python for a module of type '{0}'")]
    UnsupportedModuleType(ModuleType),

    /// Generator options out of range.
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}
