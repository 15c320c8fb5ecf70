//! Typed dispatch of change events to per-kind callbacks.
//!
//! The registry is a lookup table from [`BlockKind`] to an ordered list of
//! registrations, each pairing a set of [`ChangeEventKind`]s with a
//! callback. [`ChangeRegistry::with_defaults`] builds the table used by
//! editing sessions; further registrations may be added at any time.
//! Dispatch is synchronous: callbacks run in registration order and any
//! mutation they make is queued as a new event, dispatched after the
//! current one.

use std::collections::HashMap;
use std::fmt;

use smallvec::SmallVec;

use crate::block::{field, BlockKind};
use crate::decl::{DeclarationScope, Declarations};
use crate::error::CoreError;
use crate::event::{ChangeEvent, ChangeEventKind, EventPayload};
use crate::graph::BlockGraph;
use crate::id::BlockId;
use crate::{propagate, validate};

/// What a callback may touch: the graph being edited and the declarations
/// of the modules it can reference.
pub struct ChangeContext<'a> {
    pub graph: &'a mut BlockGraph,
    pub scope: &'a DeclarationScope,
}

pub type ChangeCallback = Box<dyn Fn(&mut ChangeContext<'_>, BlockId, &ChangeEvent) -> Result<(), CoreError>>;

struct Registration {
    events: SmallVec<[ChangeEventKind; 4]>,
    callback: ChangeCallback,
}

#[derive(Default)]
pub struct ChangeRegistry {
    table: HashMap<BlockKind, Vec<Registration>>,
}

impl fmt::Debug for ChangeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(BlockKind, usize)> = self.table.iter().map(|(k, v)| (*k, v.len())).collect();
        counts.sort();
        f.debug_struct("ChangeRegistry").field("registrations", &counts).finish()
    }
}

impl ChangeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with placement validation, rename and signature
    /// propagation, orphan flagging and reference reconciliation installed.
    pub fn with_defaults() -> Self {
        let mut registry = ChangeRegistry::new();

        for kind in validate::PLACEMENT_RULES.iter().map(|r| r.kind) {
            registry.register(kind, &[ChangeEventKind::Move], |ctx, id, _| {
                validate::check_placement(ctx.graph, id).map(|_| ())
            });
        }

        for kind in [BlockKind::Event, BlockKind::MethodDef] {
            registry.register(kind, &[ChangeEventKind::Change], on_declaration_change);
            registry.register(kind, &[ChangeEventKind::Delete], |ctx, id, _| {
                propagate::flag_orphaned_callers(ctx.graph, id);
                Ok(())
            });
        }

        for kind in [BlockKind::MethodCall, BlockKind::EventHandler] {
            registry.register(kind, &[ChangeEventKind::Create], |ctx, id, _| {
                let own = Declarations::collect(ctx.graph);
                propagate::reconcile_reference(ctx.graph, &own, ctx.scope, id).map(|_| ())
            });
        }

        registry
    }

    /// Adds a callback for blocks of `kind` and the given event kinds.
    pub fn register<F>(&mut self, kind: BlockKind, events: &[ChangeEventKind], callback: F)
    where
        F: Fn(&mut ChangeContext<'_>, BlockId, &ChangeEvent) -> Result<(), CoreError> + 'static,
    {
        self.table.entry(kind).or_default().push(Registration {
            events: events.iter().copied().collect(),
            callback: Box::new(callback),
        });
    }

    /// Number of registrations for `kind`.
    pub fn registrations(&self, kind: BlockKind) -> usize {
        self.table.get(&kind).map_or(0, Vec::len)
    }

    /// Runs every matching callback for `event`. Returns how many ran.
    ///
    /// A failing callback is logged and does not stop the others.
    pub fn dispatch(&self, ctx: &mut ChangeContext<'_>, event: &ChangeEvent) -> usize {
        let (Some(id), Some(kind)) = (event.block, event.block_kind) else {
            return 0;
        };
        let Some(registrations) = self.table.get(&kind) else {
            return 0;
        };
        let event_kind = event.kind();
        let mut invoked = 0;
        for registration in registrations.iter().filter(|r| r.events.contains(&event_kind)) {
            invoked += 1;
            if let Err(e) = (registration.callback)(ctx, id, event) {
                tracing::warn!(block = %id, ?kind, ?event_kind, error = %e, "change callback failed");
            }
        }
        tracing::trace!(block = %id, ?kind, ?event_kind, invoked, "dispatched");
        invoked
    }
}

fn on_declaration_change(ctx: &mut ChangeContext<'_>, id: BlockId, event: &ChangeEvent) -> Result<(), CoreError> {
    match &event.payload {
        EventPayload::FieldChanged { field: name, new, .. } if name == field::NAME => {
            propagate::rename_callers(ctx.graph, id, new);
        }
        EventPayload::SignatureChanged { changes } => {
            propagate::mutate_callers(ctx.graph, id, changes);
        }
        _ => {}
    }
    Ok(())
}
