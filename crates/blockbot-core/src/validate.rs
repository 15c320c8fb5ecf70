//! Structural placement rules and declaration name validation.

use thiserror::Error;

use crate::block::{field, input, BlockKind};
use crate::error::CoreError;
use crate::graph::BlockGraph;
use crate::id::BlockId;

pub const EVENT_PLACEMENT_WARNING: &str = "Events can only go in the events section of the robot or mechanism";
pub const COMPONENT_PLACEMENT_WARNING: &str =
    "Components can only go in the components section of the robot or mechanism";
pub const MECHANISM_PLACEMENT_WARNING: &str = "Mechanisms can only go in the mechanisms section of the robot";

/// A block kind that may only live in one section of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRule {
    pub kind: BlockKind,
    pub container: BlockKind,
    pub input: &'static str,
    pub message: &'static str,
}

pub const PLACEMENT_RULES: &[PlacementRule] = &[
    PlacementRule {
        kind: BlockKind::Event,
        container: BlockKind::ComponentHolder,
        input: input::EVENTS,
        message: EVENT_PLACEMENT_WARNING,
    },
    PlacementRule {
        kind: BlockKind::Component,
        container: BlockKind::ComponentHolder,
        input: input::COMPONENTS,
        message: COMPONENT_PLACEMENT_WARNING,
    },
    PlacementRule {
        kind: BlockKind::Mechanism,
        container: BlockKind::ComponentHolder,
        input: input::MECHANISMS,
        message: MECHANISM_PLACEMENT_WARNING,
    },
];

pub fn rule_for(kind: BlockKind) -> Option<&'static PlacementRule> {
    PLACEMENT_RULES.iter().find(|r| r.kind == kind)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// No rule applies to the block's kind.
    Unconstrained,
    Valid,
    /// The block was detached (or is loose) and carries `message`.
    Detached { message: &'static str },
}

/// Enforces the placement rule of `id` against its current position.
///
/// A misplaced block is unplugged with its stack healed, never deleted.
/// The outcome depends only on where the block sits now.
pub fn check_placement(graph: &mut BlockGraph, id: BlockId) -> Result<Placement, CoreError> {
    let kind = graph.get(id)?.kind;
    let Some(rule) = rule_for(kind) else {
        return Ok(Placement::Unconstrained);
    };

    let placed = graph
        .enclosing_input(id)
        .is_some_and(|(parent, socket)| {
            socket == rule.input && graph.block(parent).is_some_and(|p| p.kind == rule.container)
        });
    if placed {
        graph.set_warning(id, None)?;
        return Ok(Placement::Valid);
    }

    if graph.parent(id).is_some() {
        tracing::debug!(block = %id, ?kind, "detaching misplaced block");
        graph.unplug(id, true)?;
    }
    graph.set_warning(id, Some(rule.message.to_string()))?;
    Ok(Placement::Detached { message: rule.message })
}

/// Why a declaration name edit was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameRejection {
    #[error("name must not be empty")]
    Empty,

    #[error("another {kind} is already named '{name}'")]
    Duplicate { name: String, kind: &'static str },
}

/// Validates a proposed declaration name, returning it trimmed.
///
/// Names of the same declaration kind must be unique within one module.
pub fn validate_name(graph: &BlockGraph, id: BlockId, proposed: &str) -> Result<String, NameRejection> {
    let name = proposed.trim();
    if name.is_empty() {
        return Err(NameRejection::Empty);
    }
    let Some(kind) = graph.block(id).map(|b| b.kind) else {
        return Ok(name.to_string());
    };
    let clash = graph
        .blocks()
        .into_iter()
        .any(|b| b.id != id && b.kind == kind && b.field(field::NAME) == Some(name));
    if clash {
        let kind = match kind {
            BlockKind::Event => "event",
            BlockKind::MethodDef => "method",
            _ => "block",
        };
        return Err(NameRejection::Duplicate {
            name: name.to_string(),
            kind,
        });
    }
    Ok(name.to_string())
}
