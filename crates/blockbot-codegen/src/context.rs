//! Collection pass: everything the emitter needs to know before it writes
//! the first line.
//!
//! Opmode metadata is read first, then declarations (components, events,
//! methods) and event handlers, all in deterministic graph order.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use blockbot_core::{BlockGraph, BlockId, BlockKind, CallTarget, Declarations, ModuleType, OpModeDetails, Parameter};

use crate::diagnostics::Diagnostic;
use crate::error::CodegenError;
use crate::naming::{class_name, python_identifier};

pub const BASE_CLASSES_MODULE: &str = "blocks_base_classes";
pub const PLACEHOLDERS_MODULE: &str = "wpilib_placeholders";

/// Sorted `import x` and `from x import a, b` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSet {
    modules: BTreeSet<String>,
    symbols: BTreeMap<String, BTreeSet<String>>,
}

impl ImportSet {
    pub fn add_module(&mut self, module: &str) {
        self.modules.insert(module.to_string());
    }

    pub fn add_symbol(&mut self, module: &str, symbol: &str) {
        self.symbols
            .entry(module.to_string())
            .or_default()
            .insert(symbol.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.symbols.is_empty()
    }

    pub fn render(&self) -> Vec<String> {
        let plain = self.modules.iter().map(|m| format!("import {m}"));
        let from = self.symbols.iter().map(|(module, symbols)| {
            let list: Vec<&str> = symbols.iter().map(String::as_str).collect();
            format!("from {module} import {}", list.join(", "))
        });
        plain.chain(from).collect()
    }
}

/// An event handler method to emit and register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    pub block: BlockId,
    pub sender: CallTarget,
    pub event: String,
    pub params: Vec<Parameter>,
    pub method_name: String,
}

impl HandlerInfo {
    /// Expression of the object the handler registers with.
    pub fn sender_expr(&self) -> String {
        match &self.sender {
            CallTarget::Robot => "self.robot".to_string(),
            CallTarget::Component { component } => format!("self.{}", python_identifier(component)),
            CallTarget::Mechanism { instance, .. } => format!("self.{}", python_identifier(instance)),
            _ => "self".to_string(),
        }
    }
}

/// Results of the collection pass.
#[derive(Debug, Clone)]
pub struct GeneratorContext {
    pub module_type: ModuleType,
    pub class_name: String,
    pub op_mode: Option<OpModeDetails>,
    pub declarations: Declarations,
    /// Top-level method definitions, in id order.
    pub methods: Vec<BlockId>,
    pub handlers: Vec<HandlerInfo>,
    pub imports: ImportSet,
    pub diagnostics: Vec<Diagnostic>,
}

impl GeneratorContext {
    pub fn collect(module_type: ModuleType, module_name: &str, graph: &BlockGraph) -> Result<Self, CodegenError> {
        let class_name = match module_type {
            ModuleType::Robot => "Robot".to_string(),
            ModuleType::Mechanism | ModuleType::OpMode => class_name(module_name),
            ModuleType::Unknown => return Err(CodegenError::UnsupportedModuleType(module_type)),
        };

        let op_mode = match module_type {
            ModuleType::OpMode => graph
                .walk_all()
                .into_iter()
                .find_map(|id| graph.block(id).and_then(OpModeDetails::from_block)),
            _ => None,
        };

        let mut ctx = GeneratorContext {
            module_type,
            class_name,
            op_mode,
            declarations: Declarations::collect(graph),
            methods: Vec::new(),
            handlers: Vec::new(),
            imports: ImportSet::default(),
            diagnostics: Vec::new(),
        };

        let mut used_names = HashSet::new();
        for id in graph.top_blocks() {
            let block = graph.get(id)?;
            match block.kind {
                BlockKind::MethodDef => ctx.methods.push(id),
                BlockKind::EventHandler => {
                    let Some(call) = block.extra.call() else { continue };
                    let stem = match &call.target {
                        CallTarget::Robot => Some("robot".to_string()),
                        CallTarget::Component { component } => Some(component.clone()),
                        CallTarget::Mechanism { instance, .. } => Some(instance.clone()),
                        CallTarget::SelfModule | CallTarget::FireEvent => None,
                        CallTarget::ModuleFunction { .. } => {
                            ctx.diagnostics
                                .push(Diagnostic::warning(id, "event handler has no event sender"));
                            continue;
                        }
                    };
                    let base = match stem {
                        Some(stem) => format!("_handle_{}_{}", python_identifier(&stem), python_identifier(&call.name)),
                        None => format!("_handle_{}", python_identifier(&call.name)),
                    };
                    let mut method_name = base.clone();
                    let mut n = 2;
                    while !used_names.insert(method_name.clone()) {
                        method_name = format!("{base}_{n}");
                        n += 1;
                    }
                    ctx.handlers.push(HandlerInfo {
                        block: id,
                        sender: call.target.clone(),
                        event: call.name.clone(),
                        params: call.args.clone(),
                        method_name,
                    });
                }
                _ => {}
            }
        }

        Ok(ctx)
    }

    pub fn exports_declarations(&self) -> bool {
        self.module_type.exports_declarations()
    }
}
