//! Python code generation for blockbot modules.
//!
//! Generation runs in two passes over a [`BlockGraph`]:
//!
//! 1. [`context`] collects opmode metadata first, then declarations and
//!    event handlers, into a [`GeneratorContext`].
//! 2. [`python`] walks the graph again and writes one python class, with
//!    imports gathered along the way and rendered sorted above it.
//!
//! The output depends only on the graph, the [`DeclarationScope`] and the
//! [`GenerateOptions`]. Inconsistent references never abort generation;
//! they surface as [`Diagnostic`]s next to best-effort code.

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod naming;
pub mod python;

pub use context::{GeneratorContext, HandlerInfo, ImportSet};
pub use diagnostics::{Diagnostic, Severity};
pub use error::CodegenError;

use blockbot_core::{BlockGraph, DeclarationScope, Declarations, Module, ModuleType, OpModeDetails};
use tracing::info;

pub const DEFAULT_INDENT: usize = 4;
pub const MAX_INDENT: usize = 8;

/// Knobs for python emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Spaces per indentation level.
    pub indent: usize,
    /// Emit the "generated file" comment on the first line.
    pub header: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            indent: DEFAULT_INDENT,
            header: true,
        }
    }
}

impl GenerateOptions {
    pub fn validate(&self) -> Result<(), CodegenError> {
        if self.indent == 0 || self.indent > MAX_INDENT {
            return Err(CodegenError::InvalidOptions(format!(
                "indent must be between 1 and {MAX_INDENT}, got {}",
                self.indent
            )));
        }
        Ok(())
    }
}

/// Everything one generation run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedModule {
    pub python: String,
    pub class_name: String,
    /// All declarations of the module, private methods included.
    pub declarations: Declarations,
    pub op_mode: Option<OpModeDetails>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Generates the python source of one module.
pub fn generate(
    module_type: ModuleType,
    module_name: &str,
    graph: &BlockGraph,
    scope: &DeclarationScope,
    options: &GenerateOptions,
) -> Result<GeneratedModule, CodegenError> {
    options.validate()?;
    let mut ctx = GeneratorContext::collect(module_type, module_name, graph)?;
    let python = python::emit(graph, scope, &mut ctx, options)?;

    info!(
        module = module_name,
        module_type = %module_type,
        class = %ctx.class_name,
        methods = ctx.methods.len(),
        handlers = ctx.handlers.len(),
        diagnostics = ctx.diagnostics.len(),
        "generated python"
    );

    Ok(GeneratedModule {
        python,
        class_name: ctx.class_name,
        declarations: ctx.declarations,
        op_mode: ctx.op_mode,
        diagnostics: ctx.diagnostics,
    })
}

/// [`generate`] for an identified module.
pub fn generate_module(
    module: &Module,
    graph: &BlockGraph,
    scope: &DeclarationScope,
    options: &GenerateOptions,
) -> Result<GeneratedModule, CodegenError> {
    generate(module.module_type, &module.module_name, graph, scope, options)
}
