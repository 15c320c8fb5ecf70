//! Declarations derived from a module graph and the scope call sites
//! resolve against.
//!
//! A module exports its components, events and outside-visible methods;
//! other modules of the workspace read (never write) them. Resolution
//! order for a call site is module -> robot -> mechanisms.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::block::{field, input, Block, BlockKind, CallState, CallTarget, ExtraState, Parameter};
use crate::graph::BlockGraph;
use crate::id::BlockId;

/// Who may call a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Callable only from inside the declaring module.
    #[default]
    Within,
    /// Callable from other modules of the workspace.
    Outside,
}

/// An event declared by one event block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDecl {
    pub block_id: BlockId,
    pub name: String,
    pub args: Vec<Parameter>,
}

/// A method declared by one method-definition block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDecl {
    pub block_id: BlockId,
    pub name: String,
    pub python_name: String,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub args: Vec<Parameter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Component,
    Mechanism,
}

/// A hardware component or mechanism instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDecl {
    pub block_id: BlockId,
    pub name: String,
    pub kind: ComponentKind,
    pub class_name: String,
    pub import_module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

/// Type of an opmode, selecting its class decorator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpModeKind {
    Auto,
    #[default]
    Teleop,
    Test,
}

impl OpModeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpModeKind::Auto => "Auto",
            OpModeKind::Teleop => "Teleop",
            OpModeKind::Test => "Test",
        }
    }

    /// Parses the `TYPE` field value. Unknown values fall back to `Teleop`.
    pub fn from_field(value: &str) -> Self {
        match value {
            "Auto" => OpModeKind::Auto,
            "Test" => OpModeKind::Test,
            _ => OpModeKind::Teleop,
        }
    }
}

/// Metadata of an opmode module.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpModeDetails {
    #[serde(rename = "type")]
    pub kind: OpModeKind,
    pub name: String,
    pub group: String,
    pub enabled: bool,
}

impl OpModeDetails {
    /// Reads the details from an opmode-details block.
    pub fn from_block(block: &Block) -> Option<Self> {
        if block.kind != BlockKind::OpModeDetails {
            return None;
        }
        Some(OpModeDetails {
            kind: OpModeKind::from_field(block.field(field::TYPE).unwrap_or_default()),
            name: block.field(field::NAME).unwrap_or_default().to_string(),
            group: block.field(field::GROUP).unwrap_or_default().to_string(),
            enabled: block.field(field::ENABLED) == Some("TRUE"),
        })
    }
}

/// Everything one module declares.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Declarations {
    pub components: Vec<ComponentDecl>,
    pub events: Vec<EventDecl>,
    pub methods: Vec<MethodDecl>,
}

impl Declarations {
    /// Collects declarations in graph walk order.
    ///
    /// Components and events count only when they sit in the matching
    /// section of the component holder; methods are top-level definitions.
    pub fn collect(graph: &BlockGraph) -> Declarations {
        let mut decls = Declarations::default();

        for id in graph.blocks_of_kind(BlockKind::ComponentHolder) {
            for section in [input::MECHANISMS, input::COMPONENTS] {
                for member in graph.statement_stack(id, section) {
                    if let Some(decl) = graph.block(member).and_then(component_decl) {
                        decls.components.push(decl);
                    }
                }
            }
            for member in graph.statement_stack(id, input::EVENTS) {
                let Some(block) = graph.block(member) else { continue };
                if let ExtraState::Event { params } = &block.extra {
                    decls.events.push(EventDecl {
                        block_id: block.id,
                        name: block.name().unwrap_or_default().to_string(),
                        args: params.clone(),
                    });
                }
            }
        }

        for id in graph.top_blocks() {
            let Some(block) = graph.block(id) else { continue };
            if let ExtraState::Method(state) = &block.extra {
                let name = block.name().unwrap_or_default().to_string();
                decls.methods.push(MethodDecl {
                    block_id: block.id,
                    python_name: python_identifier(&name),
                    name,
                    visibility: state.visibility,
                    return_type: state.return_type.clone(),
                    args: state.params.clone(),
                });
            }
        }

        decls
    }

    /// The subset visible from other modules.
    pub fn exported(&self) -> Declarations {
        Declarations {
            components: self.components.clone(),
            events: self.events.clone(),
            methods: self
                .methods
                .iter()
                .filter(|m| m.visibility == Visibility::Outside)
                .cloned()
                .collect(),
        }
    }

    fn find_event(&self, id: Option<BlockId>, name: &str) -> Option<Signature> {
        let found = id
            .and_then(|id| self.events.iter().find(|e| e.block_id == id))
            .or_else(|| self.events.iter().find(|e| e.name == name))?;
        Some(Signature {
            block_id: found.block_id,
            name: found.name.clone(),
            args: found.args.clone(),
            return_type: None,
        })
    }

    fn find_method(&self, id: Option<BlockId>, name: &str) -> Option<Signature> {
        let found = id
            .and_then(|id| self.methods.iter().find(|m| m.block_id == id))
            .or_else(|| self.methods.iter().find(|m| m.name == name))?;
        Some(Signature {
            block_id: found.block_id,
            name: found.name.clone(),
            args: found.args.clone(),
            return_type: found.return_type.clone(),
        })
    }
}

fn component_decl(block: &Block) -> Option<ComponentDecl> {
    let name = block.name().unwrap_or_default().to_string();
    match &block.extra {
        ExtraState::Component(state) => Some(ComponentDecl {
            block_id: block.id,
            name,
            kind: ComponentKind::Component,
            class_name: state.class_name.clone(),
            import_module: state.import_module.clone(),
            port: block.field(field::PORT).filter(|p| !p.is_empty()).map(str::to_string),
        }),
        ExtraState::Mechanism(state) => Some(ComponentDecl {
            block_id: block.id,
            name,
            kind: ComponentKind::Mechanism,
            class_name: state.class_name.clone(),
            import_module: state.module_name.clone(),
            port: None,
        }),
        _ => None,
    }
}

/// The declaration a reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub block_id: BlockId,
    pub name: String,
    pub args: Vec<Parameter>,
    pub return_type: Option<String>,
}

/// Outcome of resolving a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Signature),
    /// The owning module is known but declares nothing matching.
    Missing,
    /// The owning module's declarations are not available, or the target
    /// (components, python modules) carries no declarations at all.
    Unresolvable,
}

/// Declarations of the modules a graph can reference besides itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationScope {
    /// Exported declarations of the workspace robot, when the open module
    /// is not the robot itself.
    pub robot: Option<Declarations>,
    /// Exported declarations of mechanism modules, keyed by module name.
    pub mechanisms: IndexMap<String, Declarations>,
}

impl DeclarationScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_robot(mut self, robot: Declarations) -> Self {
        self.robot = Some(robot);
        self
    }

    pub fn with_mechanism(mut self, module: impl Into<String>, decls: Declarations) -> Self {
        self.mechanisms.insert(module.into(), decls);
        self
    }

    /// Resolves the reference held by a `MethodCall` or `EventHandler` block.
    ///
    /// `own` holds the declarations of the graph the reference lives in.
    pub fn lookup(&self, own: &Declarations, kind: BlockKind, call: &CallState) -> Lookup {
        let wants_event = kind == BlockKind::EventHandler || call.target == CallTarget::FireEvent;
        let owner = match &call.target {
            CallTarget::SelfModule | CallTarget::FireEvent => Some(own),
            CallTarget::Robot => self.robot.as_ref(),
            CallTarget::Mechanism { module, .. } => self.mechanisms.get(module),
            CallTarget::Component { .. } | CallTarget::ModuleFunction { .. } => return Lookup::Unresolvable,
        };
        let Some(owner) = owner else {
            return Lookup::Unresolvable;
        };
        let found = if wants_event {
            owner.find_event(call.other_block_id, &call.name)
        } else {
            owner.find_method(call.other_block_id, &call.name)
        };
        found.map_or(Lookup::Missing, Lookup::Found)
    }
}

/// Turns a display name into a valid python identifier.
pub fn python_identifier(name: &str) -> String {
    let mut out: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}
