//! Emission pass: writes the python class for a collected module.
//!
//! Output is a pure function of the graph, the scope and the options. Blocks
//! are visited in graph order and imports are rendered sorted, so the same
//! input always yields byte-identical text.

use blockbot_core::block::{field, input};
use blockbot_core::decl::Lookup;
use blockbot_core::propagate::missing_declaration_warning;
use blockbot_core::{Block, BlockGraph, BlockId, BlockKind, CallState, CallTarget, DeclarationScope, ModuleType};

use crate::context::{GeneratorContext, HandlerInfo, BASE_CLASSES_MODULE, PLACEHOLDERS_MODULE};
use crate::diagnostics::Diagnostic;
use crate::error::CodegenError;
use crate::naming::{python_identifier, string_literal};
use crate::GenerateOptions;

pub const HEADER: &str = "# Generated by blockbot. Do not edit.";

/// Indented line buffer.
#[derive(Debug)]
struct PythonWriter {
    unit: String,
    level: usize,
    lines: Vec<String>,
}

impl PythonWriter {
    fn new(indent: usize) -> Self {
        PythonWriter {
            unit: " ".repeat(indent),
            level: 0,
            lines: Vec::new(),
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        self.lines.push(format!("{}{}", self.unit.repeat(self.level), text.as_ref()));
    }

    /// A single empty line; repeated calls collapse.
    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn indent(&mut self) {
        self.level += 1;
    }

    fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }
}

struct Emitter<'a> {
    graph: &'a BlockGraph,
    scope: &'a DeclarationScope,
    ctx: &'a mut GeneratorContext,
    out: PythonWriter,
}

/// Renders the module source. Collects imports while walking, so the class
/// body is written before the import block is rendered above it.
pub fn emit(
    graph: &BlockGraph,
    scope: &DeclarationScope,
    ctx: &mut GeneratorContext,
    options: &GenerateOptions,
) -> Result<String, CodegenError> {
    let mut emitter = Emitter {
        graph,
        scope,
        ctx,
        out: PythonWriter::new(options.indent),
    };
    emitter.emit_class()?;
    let body = emitter.out.lines;

    let mut lines: Vec<String> = Vec::new();
    if options.header {
        lines.push(HEADER.to_string());
        lines.push(String::new());
    }
    lines.extend(ctx.imports.render());
    lines.push(String::new());
    lines.push(String::new());
    lines.extend(body);

    let mut text = lines.join("\n");
    text.push('\n');
    Ok(text)
}

impl Emitter<'_> {
    fn diagnose(&mut self, block: BlockId, message: impl Into<String>) {
        self.ctx.diagnostics.push(Diagnostic::warning(block, message));
    }

    // -----------------------------------------------------------------------
    // Class shape
    // -----------------------------------------------------------------------

    fn emit_class(&mut self) -> Result<(), CodegenError> {
        let base = match self.ctx.module_type {
            ModuleType::Robot => {
                self.ctx.imports.add_symbol(PLACEHOLDERS_MODULE, "OpModeRobot");
                "OpModeRobot"
            }
            ModuleType::Mechanism => {
                self.ctx.imports.add_symbol(BASE_CLASSES_MODULE, "Mechanism");
                "Mechanism"
            }
            ModuleType::OpMode => {
                self.ctx.imports.add_symbol(PLACEHOLDERS_MODULE, "PeriodicOpMode");
                self.emit_decorators();
                "PeriodicOpMode"
            }
            ModuleType::Unknown => return Err(CodegenError::UnsupportedModuleType(self.ctx.module_type)),
        };

        let header = format!("class {}({base}):", self.ctx.class_name);
        self.out.line(header);
        self.out.indent();

        self.emit_init();
        if self.ctx.exports_declarations() {
            self.out.blank();
            self.emit_define_hardware();
        }
        if !self.ctx.handlers.is_empty() {
            self.out.blank();
            self.emit_register_handlers();
        }
        let methods = self.ctx.methods.clone();
        for id in methods {
            self.out.blank();
            self.emit_method(id)?;
        }
        let handlers = self.ctx.handlers.clone();
        for handler in &handlers {
            self.out.blank();
            self.emit_handler(handler)?;
        }

        self.out.dedent();
        Ok(())
    }

    fn emit_decorators(&mut self) {
        let Some(details) = self.ctx.op_mode.clone() else {
            return;
        };
        if details.enabled {
            let kind = details.kind.as_str();
            self.ctx.imports.add_symbol(BASE_CLASSES_MODULE, kind);
            self.out.line(format!("@{kind}"));
        }
        if !details.name.trim().is_empty() {
            self.ctx.imports.add_symbol(BASE_CLASSES_MODULE, "Name");
            self.out.line(format!("@Name({})", string_literal(details.name.trim())));
        }
        if !details.group.trim().is_empty() {
            self.ctx.imports.add_symbol(BASE_CLASSES_MODULE, "Group");
            self.out.line(format!("@Group({})", string_literal(details.group.trim())));
        }
    }

    fn emit_init(&mut self) {
        let is_opmode = self.ctx.module_type == ModuleType::OpMode;
        self.out.line(if is_opmode {
            "def __init__(self, robot):"
        } else {
            "def __init__(self):"
        });
        self.out.indent();
        if is_opmode {
            self.out.line("super().__init__(robot)");
            self.out.line("self.robot = robot");
        } else {
            self.out.line("super().__init__()");
            self.out.line("self.define_hardware()");
        }
        if !self.ctx.handlers.is_empty() {
            self.out.line("self.register_event_handlers()");
        }
        self.out.dedent();
    }

    fn emit_define_hardware(&mut self) {
        self.out.line("def define_hardware(self):");
        self.out.indent();
        let mut emitted = 0;
        let components = self.ctx.declarations.components.clone();
        for component in &components {
            if component.class_name.trim().is_empty() {
                self.diagnose(component.block_id, format!("component '{}' has no class", component.name));
                continue;
            }
            if !component.import_module.is_empty() {
                self.ctx
                    .imports
                    .add_symbol(&component.import_module, &component.class_name);
            }
            let arg = component.port.as_deref().map(port_literal).unwrap_or_default();
            self.out.line(format!(
                "self.{} = {}({arg})",
                python_identifier(&component.name),
                component.class_name
            ));
            emitted += 1;
        }
        if emitted == 0 {
            self.out.line("pass");
        }
        self.out.dedent();
    }

    fn emit_register_handlers(&mut self) {
        self.out.line("def register_event_handlers(self):");
        self.out.indent();
        let handlers = self.ctx.handlers.clone();
        for handler in &handlers {
            self.out.line(format!(
                "{}.register_event_handler({}, self.{})",
                handler.sender_expr(),
                string_literal(&handler.event),
                handler.method_name
            ));
        }
        self.out.dedent();
    }

    fn emit_method(&mut self, id: BlockId) -> Result<(), CodegenError> {
        let block = self.graph.get(id)?;
        let name = python_identifier(block.name().unwrap_or_default());
        let params = block.extra.params().unwrap_or_default();
        self.out.line(format!("def {name}({}):", parameter_list(params.iter().map(|p| p.name.as_str()))));
        self.emit_body(id)
    }

    fn emit_handler(&mut self, handler: &HandlerInfo) -> Result<(), CodegenError> {
        self.out.line(format!(
            "def {}({}):",
            handler.method_name,
            parameter_list(handler.params.iter().map(|p| p.name.as_str()))
        ));
        self.emit_body(handler.block)
    }

    // -----------------------------------------------------------------------
    // Statements and expressions
    // -----------------------------------------------------------------------

    fn emit_body(&mut self, id: BlockId) -> Result<(), CodegenError> {
        let graph = self.graph;
        self.out.indent();
        let mut emitted = 0;
        for stmt in graph.statement_stack(id, input::STACK) {
            let block = graph.get(stmt)?;
            if block.kind == BlockKind::MethodCall || block.kind.is_value() {
                let expr = self.expression(Some(stmt))?;
                self.out.line(expr);
                emitted += 1;
            } else {
                self.diagnose(stmt, format!("a {:?} block cannot be used as a statement", block.kind));
            }
        }
        if emitted == 0 {
            self.out.line("pass");
        }
        self.out.dedent();
        Ok(())
    }

    fn expression(&mut self, id: Option<BlockId>) -> Result<String, CodegenError> {
        let Some(id) = id else {
            return Ok("None".to_string());
        };
        let graph = self.graph;
        let block = graph.get(id)?;
        let expr = match block.kind {
            BlockKind::Number => {
                let raw = block.field(field::NUM).unwrap_or_default().trim();
                if raw.parse::<f64>().is_ok_and(f64::is_finite) {
                    raw.to_string()
                } else {
                    self.diagnose(id, format!("'{raw}' is not a number"));
                    "0".to_string()
                }
            }
            BlockKind::Text => string_literal(block.field(field::TEXT).unwrap_or_default()),
            BlockKind::Boolean => {
                if block.field(field::BOOL) == Some("TRUE") {
                    "True".to_string()
                } else {
                    "False".to_string()
                }
            }
            BlockKind::VariableGet => python_identifier(block.field(field::VAR).unwrap_or_default()),
            BlockKind::MethodCall => match block.extra.call() {
                Some(call) => self.call_expression(block, call)?,
                None => "None".to_string(),
            },
            kind => {
                self.diagnose(id, format!("a {kind:?} block does not produce a value"));
                "None".to_string()
            }
        };
        Ok(expr)
    }

    fn call_expression(&mut self, block: &Block, call: &CallState) -> Result<String, CodegenError> {
        let mut name = call.name.clone();
        let mut arity = call.args.len();
        match self.scope.lookup(&self.ctx.declarations, BlockKind::MethodCall, call) {
            Lookup::Found(signature) => {
                if signature.args.len() != call.args.len() {
                    self.diagnose(
                        block.id,
                        format!(
                            "call to '{}' passes {} arguments but the declaration takes {}",
                            signature.name,
                            call.args.len(),
                            signature.args.len()
                        ),
                    );
                }
                name = signature.name;
                arity = signature.args.len();
            }
            Lookup::Missing => self.diagnose(block.id, missing_declaration_warning(&call.name)),
            Lookup::Unresolvable => {}
        }

        let mut args = Vec::with_capacity(arity);
        for i in 0..arity {
            let target = if i < call.args.len() {
                self.graph.input_target(block.id, &input::arg(i))
            } else {
                None
            };
            args.push(self.expression(target)?);
        }
        let args = args.join(", ");
        let function = python_identifier(&name);

        let expr = match &call.target {
            CallTarget::SelfModule => format!("self.{function}({args})"),
            CallTarget::Robot => format!("self.robot.{function}({args})"),
            CallTarget::Component { component } => format!("self.{}.{function}({args})", python_identifier(component)),
            CallTarget::Mechanism { instance, .. } => {
                format!("self.{}.{function}({args})", python_identifier(instance))
            }
            CallTarget::FireEvent => {
                let mut parts = vec![string_literal(&name)];
                if !args.is_empty() {
                    parts.push(args);
                }
                format!("self.fire_event({})", parts.join(", "))
            }
            CallTarget::ModuleFunction { module } => {
                self.ctx.imports.add_module(module);
                format!("{module}.{function}({args})")
            }
        };
        Ok(expr)
    }
}

fn parameter_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    std::iter::once("self".to_string())
        .chain(names.map(python_identifier))
        .collect::<Vec<_>>()
        .join(", ")
}

fn port_literal(port: &str) -> String {
    if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
        port.to_string()
    } else {
        string_literal(port)
    }
}
