//! EditSession: the explicit context of one open module graph.
//!
//! A session owns the graph, the callback registry, the declaration scope
//! of the modules the graph can reference, and the listener phase. Loading
//! runs in the [`ListenerPhase::WhileLoading`] phase, where only reference
//! creation is handled (each call site and event handler is reconciled
//! against the scope). A `FinishedLoading` event, queued after the last
//! block, switches the session to [`ListenerPhase::AfterLoading`], where
//! every event goes through the registry.
//!
//! Session operations flush the event queue before returning, so callers
//! always observe a graph whose dependent blocks are consistent.

use crate::block::{field, BlockKind, ExtraState};
use crate::decl::{DeclarationScope, Declarations};
use crate::error::CoreError;
use crate::event::{ChangeEvent, ChangeEventKind};
use crate::framework::{ChangeContext, ChangeRegistry};
use crate::graph::BlockGraph;
use crate::id::BlockId;
use crate::mutator::{self, ParamChange};
use crate::propagate::{self, ReconcileReport};
use crate::serialize::SerializedWorkspace;
use crate::validate::{self, NameRejection};

/// Upper bound on events handled by one flush. Callbacks are idempotent, so
/// reaching it means two callbacks keep undoing each other.
const MAX_EVENTS_PER_FLUSH: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerPhase {
    WhileLoading,
    AfterLoading,
}

/// Outcome of a field edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    /// The (normalized) value was stored and dependents updated.
    Applied { value: String },
    /// The normalized value equals the current one.
    Unchanged,
    /// The validator refused the value; nothing changed.
    Rejected { reason: NameRejection },
}

#[derive(Debug)]
pub struct EditSession {
    graph: BlockGraph,
    registry: ChangeRegistry,
    scope: DeclarationScope,
    phase: ListenerPhase,
}

impl EditSession {
    /// A session over an empty graph, ready for editing.
    pub fn new(registry: ChangeRegistry, scope: DeclarationScope) -> Self {
        EditSession {
            graph: BlockGraph::new(),
            registry,
            scope,
            phase: ListenerPhase::AfterLoading,
        }
    }

    /// Rebuilds a persisted graph and runs both listener phases.
    pub fn load(
        workspace: &SerializedWorkspace,
        scope: DeclarationScope,
        registry: ChangeRegistry,
    ) -> Result<Self, CoreError> {
        let graph = BlockGraph::from_serialized(workspace)?;
        let mut session = EditSession {
            graph,
            registry,
            scope,
            phase: ListenerPhase::WhileLoading,
        };
        session.graph.push_event(ChangeEvent::finished_loading());
        let handled = session.flush();
        tracing::debug!(blocks = session.graph.len(), events = handled, "session loaded");
        Ok(session)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn graph(&self) -> &BlockGraph {
        &self.graph
    }

    /// Direct graph access. Queued events are handled on the next
    /// [`flush`](Self::flush) or session operation.
    pub fn graph_mut(&mut self) -> &mut BlockGraph {
        &mut self.graph
    }

    pub fn scope(&self) -> &DeclarationScope {
        &self.scope
    }

    pub fn phase(&self) -> ListenerPhase {
        self.phase
    }

    pub fn registry_mut(&mut self) -> &mut ChangeRegistry {
        &mut self.registry
    }

    /// Declarations of the open graph.
    pub fn declarations(&self) -> Declarations {
        Declarations::collect(&self.graph)
    }

    pub fn serialize(&self) -> SerializedWorkspace {
        self.graph.to_serialized()
    }

    /// Every block warning, in ascending id order.
    pub fn warnings(&self) -> Vec<(BlockId, String)> {
        self.graph
            .blocks()
            .into_iter()
            .filter_map(|b| b.warning.clone().map(|w| (b.id, w)))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Event handling
    // -----------------------------------------------------------------------

    /// Handles queued events until the queue is empty. Returns how many
    /// were handled.
    pub fn flush(&mut self) -> usize {
        let mut handled = 0;
        let mut own: Option<Declarations> = None;
        while let Some(event) = self.graph.pop_event() {
            if handled == MAX_EVENTS_PER_FLUSH {
                let dropped = self.graph.take_events().len() + 1;
                tracing::warn!(dropped, "event limit reached, dropping queued events");
                break;
            }
            handled += 1;

            match self.phase {
                ListenerPhase::WhileLoading => match (event.kind(), event.block, event.block_kind) {
                    (ChangeEventKind::FinishedLoading, _, _) => {
                        self.phase = ListenerPhase::AfterLoading;
                    }
                    (ChangeEventKind::Create, Some(id), Some(kind)) if kind.is_reference() => {
                        let own = own.get_or_insert_with(|| Declarations::collect(&self.graph));
                        if let Err(e) = propagate::reconcile_reference(&mut self.graph, own, &self.scope, id) {
                            tracing::warn!(block = %id, error = %e, "reconcile during load failed");
                        }
                    }
                    _ => {}
                },
                ListenerPhase::AfterLoading => {
                    let mut ctx = ChangeContext {
                        graph: &mut self.graph,
                        scope: &self.scope,
                    };
                    self.registry.dispatch(&mut ctx, &event);
                }
            }
        }
        handled
    }

    /// Replaces the scope and reconciles every reference against it.
    pub fn set_scope(&mut self, scope: DeclarationScope) -> ReconcileReport {
        self.scope = scope;
        let report = propagate::reconcile_all(&mut self.graph, &self.scope);
        self.flush();
        report
    }

    // -----------------------------------------------------------------------
    // Editing operations
    // -----------------------------------------------------------------------

    pub fn create_block(&mut self, kind: BlockKind) -> BlockId {
        self.create_block_with(kind, ExtraState::default_for(kind))
    }

    pub fn create_block_with(&mut self, kind: BlockKind, extra: ExtraState) -> BlockId {
        let id = self.graph.add_block_with(kind, extra);
        self.flush();
        id
    }

    /// Creates a call site bound to a declaration of this graph.
    pub fn create_call_to(&mut self, decl: BlockId) -> Result<BlockId, CoreError> {
        let extra = propagate::call_state_for(&self.graph, decl)?;
        let name = extra.call().map(|c| c.name.clone()).unwrap_or_default();
        let id = self.graph.add_block_with(BlockKind::MethodCall, extra);
        self.graph.set_field(id, field::NAME, &name)?;
        self.flush();
        Ok(id)
    }

    /// Edits a field. Declaration names pass through the name validator
    /// first; a rejected name leaves the block and its callers untouched.
    pub fn set_field(&mut self, id: BlockId, name: &str, value: &str) -> Result<FieldEdit, CoreError> {
        let block = self.graph.get(id)?;
        let value = if block.kind.is_declaration() && name == field::NAME {
            match validate::validate_name(&self.graph, id, value) {
                Ok(valid) => valid,
                Err(reason) => {
                    tracing::debug!(block = %id, %reason, "name edit rejected");
                    return Ok(FieldEdit::Rejected { reason });
                }
            }
        } else {
            value.to_string()
        };
        if self.graph.get(id)?.field(name) == Some(value.as_str()) {
            return Ok(FieldEdit::Unchanged);
        }
        self.graph.set_field(id, name, &value)?;
        self.flush();
        Ok(FieldEdit::Applied { value })
    }

    pub fn connect_next(&mut self, prev: BlockId, block: BlockId) -> Result<(), CoreError> {
        self.graph.connect_next(prev, block)?;
        self.flush();
        Ok(())
    }

    pub fn connect_input(&mut self, parent: BlockId, input: &str, child: BlockId) -> Result<(), CoreError> {
        self.graph.connect_input(parent, input, child)?;
        self.flush();
        Ok(())
    }

    pub fn unplug(&mut self, id: BlockId, heal: bool) -> Result<(), CoreError> {
        self.graph.unplug(id, heal)?;
        self.flush();
        Ok(())
    }

    pub fn delete_block(&mut self, id: BlockId, heal: bool) -> Result<Vec<BlockId>, CoreError> {
        let removed = self.graph.delete_block(id, heal)?;
        self.flush();
        Ok(removed)
    }

    /// Opens the parameter editor of a declaration.
    pub fn open_mutator(&self, decl: BlockId) -> Result<BlockGraph, CoreError> {
        mutator::decompose(&self.graph, decl)
    }

    /// Applies an edited parameter editor and propagates to call sites.
    pub fn apply_mutator(&mut self, decl: BlockId, editor: &mut BlockGraph) -> Result<Vec<ParamChange>, CoreError> {
        let changes = mutator::compose(&mut self.graph, decl, editor)?;
        self.flush();
        Ok(changes)
    }
}
