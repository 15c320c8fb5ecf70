//! Block kinds, fields, input sockets and kind-specific extra state.
//!
//! [`BlockKind`] is a closed enumeration: the change framework dispatches on
//! it through a lookup table rather than through per-kind string names.
//! Everything a block knows about other blocks is held as [`BlockId`]
//! references; structural links live in the owning graph.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::decl::Visibility;
use crate::id::BlockId;

/// Field names used across block kinds.
pub mod field {
    pub const NAME: &str = "NAME";
    pub const TYPE: &str = "TYPE";
    pub const ENABLED: &str = "ENABLED";
    pub const GROUP: &str = "GROUP";
    pub const NUM: &str = "NUM";
    pub const TEXT: &str = "TEXT";
    pub const BOOL: &str = "BOOL";
    pub const VAR: &str = "VAR";
    pub const PORT: &str = "PORT";
    /// Prefix of the read-only parameter display fields on declarations.
    pub const PARAM_PREFIX: &str = "PARAM_";
}

/// Input socket names used across block kinds.
pub mod input {
    pub const STACK: &str = "STACK";
    pub const MECHANISMS: &str = "MECHANISMS";
    pub const COMPONENTS: &str = "COMPONENTS";
    pub const EVENTS: &str = "EVENTS";
    /// Prefix of call-site argument sockets (`ARG0`, `ARG1`, ...).
    pub const ARG_PREFIX: &str = "ARG";

    /// Name of the argument socket at `index`.
    pub fn arg(index: usize) -> String {
        format!("{ARG_PREFIX}{index}")
    }
}

/// The closed set of block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Holds the mechanisms, components and events sections of a robot or mechanism.
    ComponentHolder,
    Component,
    /// A mechanism instance inside a robot.
    Mechanism,
    /// Event declaration.
    Event,
    EventHandler,
    MethodDef,
    /// Method call or fire-event call site.
    MethodCall,
    /// Root of a parameter-editor sub-graph.
    ParamContainer,
    ParamItem,
    OpModeDetails,
    Number,
    Text,
    Boolean,
    VariableGet,
}

impl BlockKind {
    pub const ALL: [BlockKind; 14] = [
        BlockKind::ComponentHolder,
        BlockKind::Component,
        BlockKind::Mechanism,
        BlockKind::Event,
        BlockKind::EventHandler,
        BlockKind::MethodDef,
        BlockKind::MethodCall,
        BlockKind::ParamContainer,
        BlockKind::ParamItem,
        BlockKind::OpModeDetails,
        BlockKind::Number,
        BlockKind::Text,
        BlockKind::Boolean,
        BlockKind::VariableGet,
    ];

    /// Blocks that declare a named, parameterized entity other blocks refer to.
    pub fn is_declaration(self) -> bool {
        matches!(self, BlockKind::Event | BlockKind::MethodDef)
    }

    /// Blocks that refer to a declaration by id.
    pub fn is_reference(self) -> bool {
        matches!(self, BlockKind::MethodCall | BlockKind::EventHandler)
    }

    /// Literal and variable blocks that only ever sit in value sockets.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            BlockKind::Number | BlockKind::Text | BlockKind::Boolean | BlockKind::VariableGet
        )
    }
}

/// Whether a socket takes a single value block or a statement chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Value,
    Statement,
}

/// A named input socket on a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSocket {
    pub name: String,
    pub kind: InputKind,
}

impl InputSocket {
    pub fn value(name: impl Into<String>) -> Self {
        InputSocket {
            name: name.into(),
            kind: InputKind::Value,
        }
    }

    pub fn statement(name: impl Into<String>) -> Self {
        InputSocket {
            name: name.into(),
            kind: InputKind::Statement,
        }
    }
}

/// A named, optionally typed parameter. Order within a list is significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            ty: None,
        }
    }

    pub fn typed(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            ty: Some(ty.into()),
        }
    }
}

/// What a call site or event handler is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum CallTarget {
    /// A method of the module being edited.
    #[default]
    SelfModule,
    /// A method or event of the workspace's robot.
    Robot,
    /// A method of a hardware component instance.
    Component { component: String },
    /// A method or event of a mechanism instance inside the robot.
    Mechanism { instance: String, module: String },
    /// Fires one of the module's own events.
    FireEvent,
    /// A free function of a python module.
    ModuleFunction { module: String },
}

impl CallTarget {
    /// Targets whose declaration lives in the same graph as the call site.
    pub fn is_local(&self) -> bool {
        matches!(self, CallTarget::SelfModule | CallTarget::FireEvent)
    }
}

/// Extra state of call sites and event handlers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallState {
    #[serde(flatten)]
    pub target: CallTarget,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Id of the declaration block, in the graph that owns it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_block_id: Option<BlockId>,
}

/// Extra state of method definitions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodState {
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub visibility: Visibility,
}

/// Extra state of hardware component blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentState {
    pub class_name: String,
    pub import_module: String,
}

/// Extra state of mechanism instance blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MechanismState {
    pub class_name: String,
    pub module_name: String,
}

/// Kind-specific state that is not a plain field value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExtraState {
    #[default]
    None,
    Event {
        #[serde(default)]
        params: Vec<Parameter>,
    },
    Method(MethodState),
    Call(CallState),
    Component(ComponentState),
    Mechanism(MechanismState),
    ParamItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        original_name: Option<String>,
    },
}

impl ExtraState {
    /// The state a freshly created block of `kind` starts with.
    pub fn default_for(kind: BlockKind) -> ExtraState {
        match kind {
            BlockKind::Event => ExtraState::Event { params: Vec::new() },
            BlockKind::MethodDef => ExtraState::Method(MethodState::default()),
            BlockKind::MethodCall | BlockKind::EventHandler => ExtraState::Call(CallState::default()),
            BlockKind::Component => ExtraState::Component(ComponentState::default()),
            BlockKind::Mechanism => ExtraState::Mechanism(MechanismState::default()),
            BlockKind::ParamItem => ExtraState::ParamItem { original_name: None },
            _ => ExtraState::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ExtraState::None)
    }

    /// Declared parameter list of an event or method definition.
    pub fn params(&self) -> Option<&[Parameter]> {
        match self {
            ExtraState::Event { params } => Some(params),
            ExtraState::Method(m) => Some(&m.params),
            _ => None,
        }
    }

    pub fn params_mut(&mut self) -> Option<&mut Vec<Parameter>> {
        match self {
            ExtraState::Event { params } => Some(params),
            ExtraState::Method(m) => Some(&mut m.params),
            _ => None,
        }
    }

    pub fn call(&self) -> Option<&CallState> {
        match self {
            ExtraState::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn call_mut(&mut self) -> Option<&mut CallState> {
        match self {
            ExtraState::Call(call) => Some(call),
            _ => None,
        }
    }
}

/// A single block in a module graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Ordered field name -> literal value.
    pub fields: IndexMap<String, String>,
    /// Declared input sockets, derived from kind and extra state.
    pub inputs: SmallVec<[InputSocket; 4]>,
    pub extra: ExtraState,
    /// Transient diagnostic shown on the block. Never persisted.
    pub warning: Option<String>,
}

impl Block {
    /// Creates a block of `kind` with its default fields, state and sockets.
    pub fn new(id: BlockId, kind: BlockKind) -> Self {
        Block::with_extra(id, kind, ExtraState::default_for(kind))
    }

    pub fn with_extra(id: BlockId, kind: BlockKind, extra: ExtraState) -> Self {
        let mut block = Block {
            id,
            kind,
            fields: default_fields(kind),
            inputs: SmallVec::new(),
            extra,
            warning: None,
        };
        block.rebuild_inputs();
        block.update_param_fields();
        block
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Value of the `NAME` field, if the kind has one.
    pub fn name(&self) -> Option<&str> {
        self.field(field::NAME)
    }

    pub fn input(&self, name: &str) -> Option<&InputSocket> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.input(name).is_some()
    }

    /// Recomputes the socket list from kind and extra state.
    pub fn rebuild_inputs(&mut self) {
        self.inputs = default_inputs(self.kind, &self.extra);
    }

    /// Rebuilds the read-only `PARAM_n` display fields of a declaration.
    ///
    /// Every existing `PARAM_` field is removed before the new ones are
    /// appended, so shrinking a list never leaves stale fields behind.
    pub fn update_param_fields(&mut self) {
        let Some(params) = self.extra.params() else {
            return;
        };
        let names: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
        self.fields.retain(|k, _| !k.starts_with(field::PARAM_PREFIX));
        for (i, name) in names.into_iter().enumerate() {
            self.fields.insert(format!("{}{i}", field::PARAM_PREFIX), name);
        }
    }
}

fn default_fields(kind: BlockKind) -> IndexMap<String, String> {
    let pairs: &[(&str, &str)] = match kind {
        BlockKind::Event
        | BlockKind::MethodDef
        | BlockKind::MethodCall
        | BlockKind::EventHandler
        | BlockKind::Component
        | BlockKind::Mechanism
        | BlockKind::ParamItem => &[(field::NAME, "")],
        BlockKind::OpModeDetails => &[
            (field::TYPE, "Teleop"),
            (field::ENABLED, "TRUE"),
            (field::NAME, ""),
            (field::GROUP, ""),
        ],
        BlockKind::Number => &[(field::NUM, "0")],
        BlockKind::Text => &[(field::TEXT, "")],
        BlockKind::Boolean => &[(field::BOOL, "TRUE")],
        BlockKind::VariableGet => &[(field::VAR, "")],
        BlockKind::ComponentHolder | BlockKind::ParamContainer => &[],
    };
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_inputs(kind: BlockKind, extra: &ExtraState) -> SmallVec<[InputSocket; 4]> {
    let mut inputs = SmallVec::new();
    match kind {
        BlockKind::ComponentHolder => {
            inputs.push(InputSocket::statement(input::MECHANISMS));
            inputs.push(InputSocket::statement(input::COMPONENTS));
            inputs.push(InputSocket::statement(input::EVENTS));
        }
        BlockKind::MethodDef | BlockKind::EventHandler | BlockKind::ParamContainer => {
            inputs.push(InputSocket::statement(input::STACK));
        }
        BlockKind::MethodCall => {
            let arity = extra.call().map_or(0, |c| c.args.len());
            for i in 0..arity {
                inputs.push(InputSocket::value(input::arg(i)));
            }
        }
        _ => {}
    }
    inputs
}
