//! Stable block identifiers.
//!
//! A [`BlockId`] is allocated by its [`BlockGraph`](crate::graph::BlockGraph)
//! and never reused within that graph, so call sites can hold it as a
//! reference to their declaration across edits and save/load cycles.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Stable block identifier, unique within one module graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl BlockId {
    /// The id that follows this one in allocation order.
    pub fn next(self) -> BlockId {
        BlockId(self.0 + 1)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Arena slot of a block inside the petgraph storage. Slots are not stable
/// across deserialization; the graph maps ids to slots explicitly.
pub(crate) type Slot = NodeIndex<u32>;
