//! Core error types for blockbot-core.
//!
//! Structural failures only: validation and consistency problems are
//! reported through block warnings and [`FieldEdit`](crate::session::FieldEdit)
//! values, never as errors.

use crate::block::BlockKind;
use crate::id::BlockId;
use thiserror::Error;

/// Core errors produced by the blockbot-core crate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A block id was not found in the graph.
    #[error("block not found: {id}")]
    BlockNotFound { id: BlockId },

    /// A block id is already taken.
    #[error("duplicate block id: {id}")]
    DuplicateBlock { id: BlockId },

    /// A block id with no successor; fresh ids could not follow it.
    #[error("block id out of range: {id}")]
    IdOverflow { id: BlockId },

    /// The named input does not exist on the block.
    #[error("block {id} has no input named '{input}'")]
    UnknownInput { id: BlockId, input: String },

    /// A link would violate the tree shape of the graph.
    #[error("invalid link: {reason}")]
    InvalidLink { reason: String },

    /// The operation requires a block of a different kind.
    #[error("block {id} is a {actual:?}, expected {expected}")]
    WrongKind {
        id: BlockId,
        actual: BlockKind,
        expected: &'static str,
    },

    /// A parameter-editor graph has no container block.
    #[error("mutator graph has no parameter container")]
    MissingContainer,

    #[error("unknown module type: '{name}'")]
    UnknownModuleType { name: String },
}
