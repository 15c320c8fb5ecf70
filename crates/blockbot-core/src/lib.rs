//! Block program graph model and change-propagation engine.
//!
//! A module's program is an arena of [`Block`]s linked into statement
//! chains and input nestings ([`BlockGraph`]). Every mutation queues a
//! [`ChangeEvent`]; an [`EditSession`] drains the queue through the
//! [`ChangeRegistry`], which fans events out to the structural validator
//! ([`validate`]) and the consistency propagator ([`propagate`]).
//!
//! # Modules
//!
//! - [`id`]: `BlockId` newtype bridged to petgraph indices
//! - [`block`]: block kinds, fields, input sockets and extra state
//! - [`decl`]: declarations (events, methods, components) and scopes
//! - [`module`]: module identity and module types
//! - [`graph`]: the `BlockGraph` arena and its mutation primitives
//! - [`serialize`]: nested persisted form of a graph
//! - [`event`]: change events and their kinds
//! - [`framework`]: typed callback registry
//! - [`validate`]: placement rules and name validation
//! - [`propagate`]: rename and signature propagation, load reconciliation
//! - [`mutator`]: parameter-editor sub-graph decompose/compose
//! - [`session`]: the explicit per-graph editing context

pub mod block;
pub mod decl;
pub mod error;
pub mod event;
pub mod framework;
pub mod graph;
pub mod id;
pub mod module;
pub mod mutator;
pub mod propagate;
pub mod serialize;
pub mod session;
pub mod validate;

// Re-export commonly used types
pub use block::{Block, BlockKind, CallState, CallTarget, ExtraState, InputKind, InputSocket, Parameter};
pub use decl::{ComponentDecl, DeclarationScope, Declarations, EventDecl, MethodDecl, OpModeDetails, OpModeKind, Visibility};
pub use error::CoreError;
pub use event::{ChangeEvent, ChangeEventKind, EventPayload};
pub use framework::{ChangeContext, ChangeRegistry};
pub use graph::{BlockGraph, BlockLink};
pub use id::BlockId;
pub use module::{Module, ModuleType};
pub use mutator::ParamChange;
pub use serialize::{SerializedBlock, SerializedWorkspace};
pub use session::{EditSession, FieldEdit, ListenerPhase};
