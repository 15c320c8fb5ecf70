//! BlockGraph: the block arena of one module.
//!
//! Blocks are nodes of a petgraph `StableGraph`; structure is expressed only
//! by edges. Each block has at most one incoming edge, which is either a
//! [`BlockLink::Next`] from the previous statement or a
//! [`BlockLink::Input`] from the block owning the socket. A block with no
//! incoming edge is a top block. Detaching a block is edge removal, so no
//! block ever holds a pointer to another.
//!
//! All mutations go through `BlockGraph` methods, which keep the tree shape
//! intact and queue a [`ChangeEvent`] per effect. Queries return ids in a
//! deterministic order (ascending id for sets, depth-first for walks).

use std::collections::{HashMap, VecDeque};

use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::block::{field, Block, BlockKind, ExtraState, InputKind};
use crate::error::CoreError;
use crate::event::{ChangeEvent, EventPayload};
use crate::id::{BlockId, Slot};
use crate::mutator::ParamChange;

/// Structural link from a parent block to a child block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockLink {
    /// Child is the statement following the parent.
    Next,
    /// Child is plugged into the parent's named socket.
    Input { name: String },
}

/// The block arena of one module.
#[derive(Debug, Clone, Default)]
pub struct BlockGraph {
    graph: StableGraph<Block, BlockLink, Directed, u32>,
    slots: HashMap<BlockId, Slot>,
    next_id: u32,
    pending: VecDeque<ChangeEvent>,
}

impl BlockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.slots.get(&id).and_then(|&slot| self.graph.node_weight(slot))
    }

    /// Returns the block or `BlockNotFound`.
    pub fn get(&self, id: BlockId) -> Result<&Block, CoreError> {
        self.block(id).ok_or(CoreError::BlockNotFound { id })
    }

    fn get_mut(&mut self, id: BlockId) -> Result<&mut Block, CoreError> {
        let slot = self.slot(id)?;
        self.graph
            .node_weight_mut(slot)
            .ok_or(CoreError::BlockNotFound { id })
    }

    fn slot(&self, id: BlockId) -> Result<Slot, CoreError> {
        self.slots
            .get(&id)
            .copied()
            .ok_or(CoreError::BlockNotFound { id })
    }

    fn id_at(&self, slot: Slot) -> BlockId {
        self.graph[slot].id
    }

    /// All block ids in ascending order.
    pub fn ids(&self) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self.slots.keys().copied().collect();
        ids.sort();
        ids
    }

    /// All blocks in ascending id order.
    pub fn blocks(&self) -> Vec<&Block> {
        self.ids().into_iter().filter_map(|id| self.block(id)).collect()
    }

    pub fn blocks_of_kind(&self, kind: BlockKind) -> Vec<BlockId> {
        self.blocks()
            .into_iter()
            .filter(|b| b.kind == kind)
            .map(|b| b.id)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Structure queries
    // -----------------------------------------------------------------------

    /// The parent block and the link leading from it to `id`.
    pub fn parent_link(&self, id: BlockId) -> Option<(BlockId, &BlockLink)> {
        let slot = *self.slots.get(&id)?;
        self.graph
            .edges_directed(slot, Direction::Incoming)
            .next()
            .map(|e| (self.id_at(e.source()), e.weight()))
    }

    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.parent_link(id).map(|(p, _)| p)
    }

    /// The statement directly above `id` in its stack.
    pub fn previous(&self, id: BlockId) -> Option<BlockId> {
        match self.parent_link(id) {
            Some((p, BlockLink::Next)) => Some(p),
            _ => None,
        }
    }

    fn child_where(&self, id: BlockId, pred: impl Fn(&BlockLink) -> bool) -> Option<BlockId> {
        let slot = *self.slots.get(&id)?;
        self.graph
            .edges_directed(slot, Direction::Outgoing)
            .find(|e| pred(e.weight()))
            .map(|e| self.id_at(e.target()))
    }

    pub fn next(&self, id: BlockId) -> Option<BlockId> {
        self.child_where(id, |l| *l == BlockLink::Next)
    }

    /// The block plugged into `id`'s socket `input`.
    pub fn input_target(&self, id: BlockId, input: &str) -> Option<BlockId> {
        self.child_where(id, |l| matches!(l, BlockLink::Input { name } if name == input))
    }

    /// `first` and every statement following it.
    pub fn stack(&self, first: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut cur = self.contains(first).then_some(first);
        while let Some(id) = cur {
            out.push(id);
            cur = self.next(id);
        }
        out
    }

    /// The statement chain plugged into `id`'s socket `input`.
    pub fn statement_stack(&self, id: BlockId, input: &str) -> Vec<BlockId> {
        self.input_target(id, input)
            .map(|first| self.stack(first))
            .unwrap_or_default()
    }

    fn last_in_stack(&self, first: BlockId) -> BlockId {
        let mut last = first;
        while let Some(n) = self.next(last) {
            last = n;
        }
        last
    }

    /// Blocks without a parent, in ascending id order.
    pub fn top_blocks(&self) -> Vec<BlockId> {
        self.ids()
            .into_iter()
            .filter(|&id| self.parent(id).is_none())
            .collect()
    }

    /// Depth-first pre-order walk from `root`: a block, then the contents of
    /// its sockets in declared order, then the statement that follows it.
    pub fn walk(&self, root: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        if self.contains(root) {
            stack.push(root);
        }
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(n) = self.next(id) {
                stack.push(n);
            }
            if let Some(block) = self.block(id) {
                for socket in block.inputs.iter().rev() {
                    if let Some(child) = self.input_target(id, &socket.name) {
                        stack.push(child);
                    }
                }
            }
        }
        out
    }

    /// Walk of every top block, in top-block order.
    pub fn walk_all(&self) -> Vec<BlockId> {
        self.top_blocks()
            .into_iter()
            .flat_map(|top| self.walk(top))
            .collect()
    }

    /// Nearest strict ancestor of `id` satisfying `pred`, following parent
    /// links of either kind. `None` once a top block is passed.
    pub fn nearest_ancestor(&self, id: BlockId, pred: impl Fn(&Block) -> bool) -> Option<BlockId> {
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if self.block(p).is_some_and(&pred) {
                return Some(p);
            }
            cur = self.parent(p);
        }
        None
    }

    /// The socket whose statement chain contains `id`: climbs previous
    /// links to the head of the stack and reports the socket it hangs from.
    pub fn enclosing_input(&self, id: BlockId) -> Option<(BlockId, &str)> {
        let mut cur = id;
        loop {
            match self.parent_link(cur)? {
                (p, BlockLink::Next) => cur = p,
                (p, BlockLink::Input { name }) => return Some((p, name.as_str())),
            }
        }
    }

    fn is_ancestor_or_self(&self, candidate: BlockId, of: BlockId) -> bool {
        let mut cur = Some(of);
        while let Some(id) = cur {
            if id == candidate {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    // -----------------------------------------------------------------------
    // Block creation and deletion
    // -----------------------------------------------------------------------

    /// Creates a top block of `kind` with default state.
    pub fn add_block(&mut self, kind: BlockKind) -> BlockId {
        self.add_block_with(kind, ExtraState::default_for(kind))
    }

    /// Creates a top block of `kind` with the given extra state.
    pub fn add_block_with(&mut self, kind: BlockKind, extra: ExtraState) -> BlockId {
        let id = self.fresh_id();
        let block = Block::with_extra(id, kind, extra);
        self.place(block);
        id
    }

    /// Inserts a fully built block, keeping its id.
    pub fn insert_block(&mut self, block: Block) -> Result<BlockId, CoreError> {
        if self.contains(block.id) {
            return Err(CoreError::DuplicateBlock { id: block.id });
        }
        if block.id.0.checked_add(1).is_none() {
            return Err(CoreError::IdOverflow { id: block.id });
        }
        let id = block.id;
        self.place(block);
        Ok(id)
    }

    /// The id after the highest one in use, or the lowest free id once the
    /// top of the id space is taken.
    fn fresh_id(&self) -> BlockId {
        let next = BlockId(self.next_id);
        if !self.contains(next) {
            return next;
        }
        let mut id = BlockId(0);
        while self.contains(id) {
            id = id.next();
        }
        id
    }

    fn place(&mut self, block: Block) {
        let id = block.id;
        let kind = block.kind;
        if let Some(next) = id.0.checked_add(1) {
            self.next_id = self.next_id.max(next);
        }
        let slot = self.graph.add_node(block);
        self.slots.insert(id, slot);
        self.emit(id, kind, EventPayload::Created);
    }

    /// Deletes `id` together with everything plugged into it.
    ///
    /// With `heal`, the statements following `id` move up to take its place;
    /// without it they are deleted too. Returns the removed ids in walk order.
    pub fn delete_block(&mut self, id: BlockId, heal: bool) -> Result<Vec<BlockId>, CoreError> {
        self.slot(id)?;
        self.detach(id, heal)?;
        let doomed = self.walk(id);
        for &gone in &doomed {
            if let Some(slot) = self.slots.remove(&gone) {
                if let Some(block) = self.graph.remove_node(slot) {
                    self.emit(gone, block.kind, EventPayload::Deleted);
                }
            }
        }
        Ok(doomed)
    }

    // -----------------------------------------------------------------------
    // Linking
    // -----------------------------------------------------------------------

    /// Removes the incoming edge of `id`, returning the old parent.
    ///
    /// With `heal`, the block's follower is reattached to the old parent
    /// through the same link so the stack closes up.
    fn detach(&mut self, id: BlockId, heal: bool) -> Result<Option<BlockId>, CoreError> {
        let slot = self.slot(id)?;
        let Some(edge) = self.graph.edges_directed(slot, Direction::Incoming).next() else {
            return Ok(None);
        };
        let (edge_id, parent_slot, link) = (edge.id(), edge.source(), edge.weight().clone());
        self.graph.remove_edge(edge_id);

        if heal {
            let follower = self
                .graph
                .edges_directed(slot, Direction::Outgoing)
                .find(|e| *e.weight() == BlockLink::Next)
                .map(|e| (e.id(), e.target()));
            if let Some((next_edge, next_slot)) = follower {
                self.graph.remove_edge(next_edge);
                self.graph.add_edge(parent_slot, next_slot, link);
            }
        }
        Ok(Some(self.id_at(parent_slot)))
    }

    /// Detaches `id` from its parent and makes it a top block.
    pub fn unplug(&mut self, id: BlockId, heal: bool) -> Result<(), CoreError> {
        let kind = self.get(id)?.kind;
        if let Some(old_parent) = self.detach(id, heal)? {
            self.emit(
                id,
                kind,
                EventPayload::Moved {
                    old_parent: Some(old_parent),
                    new_parent: None,
                },
            );
        }
        Ok(())
    }

    fn check_link(&self, parent: BlockId, child: BlockId) -> Result<BlockKind, CoreError> {
        self.get(parent)?;
        let kind = self.get(child)?.kind;
        if self.is_ancestor_or_self(child, parent) {
            return Err(CoreError::InvalidLink {
                reason: format!("{child} is {parent} or one of its ancestors"),
            });
        }
        Ok(kind)
    }

    /// Makes `block` (with its followers) the statement after `prev`.
    ///
    /// Whatever followed `prev` is appended after the moved chain.
    pub fn connect_next(&mut self, prev: BlockId, block: BlockId) -> Result<(), CoreError> {
        let kind = self.check_link(prev, block)?;
        if kind.is_value() || self.get(prev)?.kind.is_value() {
            return Err(CoreError::InvalidLink {
                reason: "value blocks do not form statement chains".into(),
            });
        }
        let old_parent = self.detach(block, false)?;
        let displaced = self.next(prev);
        if let Some(displaced) = displaced {
            self.detach(displaced, false)?;
        }
        let (prev_slot, block_slot) = (self.slot(prev)?, self.slot(block)?);
        self.graph.add_edge(prev_slot, block_slot, BlockLink::Next);
        if let Some(displaced) = displaced {
            let tail = self.slot(self.last_in_stack(block))?;
            let displaced_slot = self.slot(displaced)?;
            self.graph.add_edge(tail, displaced_slot, BlockLink::Next);
        }
        self.emit(
            block,
            kind,
            EventPayload::Moved {
                old_parent,
                new_parent: Some(prev),
            },
        );
        Ok(())
    }

    /// Plugs `child` into `parent`'s socket `input`.
    ///
    /// A value already in the socket is unplugged; a statement chain already
    /// in the socket is appended after `child`'s chain.
    pub fn connect_input(&mut self, parent: BlockId, input: &str, child: BlockId) -> Result<(), CoreError> {
        let kind = self.check_link(parent, child)?;
        let socket_kind = self
            .get(parent)?
            .input(input)
            .map(|s| s.kind)
            .ok_or_else(|| CoreError::UnknownInput {
                id: parent,
                input: input.to_string(),
            })?;
        if socket_kind == InputKind::Statement && kind.is_value() {
            return Err(CoreError::InvalidLink {
                reason: format!("value block {child} cannot fill statement input '{input}'"),
            });
        }

        let old_parent = self.detach(child, false)?;
        if let Some(occupant) = self.input_target(parent, input) {
            match socket_kind {
                InputKind::Value => self.unplug(occupant, false)?,
                InputKind::Statement => {
                    self.detach(occupant, false)?;
                    let tail = self.slot(self.last_in_stack(child))?;
                    let occupant_slot = self.slot(occupant)?;
                    self.graph.add_edge(tail, occupant_slot, BlockLink::Next);
                }
            }
        }
        let (parent_slot, child_slot) = (self.slot(parent)?, self.slot(child)?);
        self.graph.add_edge(
            parent_slot,
            child_slot,
            BlockLink::Input {
                name: input.to_string(),
            },
        );
        self.emit(
            child,
            kind,
            EventPayload::Moved {
                old_parent,
                new_parent: Some(parent),
            },
        );
        Ok(())
    }

    /// Links `child` under `parent` without queuing an event. Used when
    /// rebuilding a graph from its persisted form.
    pub(crate) fn attach(&mut self, parent: BlockId, child: BlockId, link: BlockLink) -> Result<(), CoreError> {
        self.check_link(parent, child)?;
        if self.parent(child).is_some() {
            return Err(CoreError::InvalidLink {
                reason: format!("{child} already has a parent"),
            });
        }
        let occupied = match &link {
            BlockLink::Next => self.next(parent),
            BlockLink::Input { name } => {
                if !self.get(parent)?.has_input(name) {
                    return Err(CoreError::UnknownInput {
                        id: parent,
                        input: name.clone(),
                    });
                }
                self.input_target(parent, name)
            }
        };
        if let Some(occupant) = occupied {
            return Err(CoreError::InvalidLink {
                reason: format!("{parent} already holds {occupant} there"),
            });
        }
        let (parent_slot, child_slot) = (self.slot(parent)?, self.slot(child)?);
        self.graph.add_edge(parent_slot, child_slot, link);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Block content
    // -----------------------------------------------------------------------

    /// Sets a field value, returning the previous one. Unchanged values emit
    /// no event.
    pub fn set_field(&mut self, id: BlockId, name: &str, value: &str) -> Result<Option<String>, CoreError> {
        let block = self.get_mut(id)?;
        let kind = block.kind;
        let old = block.fields.insert(name.to_string(), value.to_string());
        if old.as_deref() != Some(value) {
            self.emit(
                id,
                kind,
                EventPayload::FieldChanged {
                    field: name.to_string(),
                    old: old.clone(),
                    new: value.to_string(),
                },
            );
        }
        Ok(old)
    }

    /// Replaces a block's extra state and re-derives its sockets.
    ///
    /// Fails if a socket that would disappear still holds a block.
    pub fn set_extra(&mut self, id: BlockId, extra: ExtraState) -> Result<(), CoreError> {
        let block = self.get(id)?;
        let mut updated = block.clone();
        updated.extra = extra;
        updated.rebuild_inputs();
        updated.update_param_fields();
        for socket in &block.inputs {
            if !updated.has_input(&socket.name) && self.input_target(id, &socket.name).is_some() {
                return Err(CoreError::InvalidLink {
                    reason: format!("input '{}' of {id} is still connected", socket.name),
                });
            }
        }
        let kind = updated.kind;
        *self.get_mut(id)? = updated;
        self.emit(id, kind, EventPayload::MutationChanged);
        Ok(())
    }

    /// Replaces a declaration's parameter list and rebuilds its parameter
    /// display fields. Emits a signature change carrying `changes`.
    pub fn set_signature(&mut self, id: BlockId, changes: Vec<ParamChange>) -> Result<(), CoreError> {
        let block = self.get_mut(id)?;
        let kind = block.kind;
        let Some(params) = block.extra.params_mut() else {
            return Err(CoreError::WrongKind {
                id,
                actual: kind,
                expected: "event or method definition",
            });
        };
        *params = changes.iter().map(|c| c.param.clone()).collect();
        block.update_param_fields();
        self.emit(id, kind, EventPayload::SignatureChanged { changes });
        Ok(())
    }

    /// Sets or clears the block's warning. Not an undoable change, so no
    /// event is queued.
    pub fn set_warning(&mut self, id: BlockId, warning: Option<String>) -> Result<(), CoreError> {
        self.get_mut(id)?.warning = warning;
        Ok(())
    }

    /// Convenience for the `NAME` field.
    pub fn set_name(&mut self, id: BlockId, name: &str) -> Result<Option<String>, CoreError> {
        self.set_field(id, field::NAME, name)
    }

    // -----------------------------------------------------------------------
    // Event queue
    // -----------------------------------------------------------------------

    fn emit(&mut self, id: BlockId, kind: BlockKind, payload: EventPayload) {
        self.pending.push_back(ChangeEvent::for_block(id, kind, payload));
    }

    pub fn push_event(&mut self, event: ChangeEvent) {
        self.pending.push_back(event);
    }

    pub fn pop_event(&mut self) -> Option<ChangeEvent> {
        self.pending.pop_front()
    }

    pub fn take_events(&mut self) -> Vec<ChangeEvent> {
        self.pending.drain(..).collect()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    // -----------------------------------------------------------------------
    // Debug consistency check
    // -----------------------------------------------------------------------

    /// Verifies the tree shape: one incoming edge at most, input links name
    /// declared sockets, and the id map agrees with the arena.
    #[cfg(debug_assertions)]
    pub fn assert_consistency(&self) {
        assert_eq!(self.slots.len(), self.graph.node_count());
        for (&id, &slot) in &self.slots {
            assert_eq!(self.graph[slot].id, id);
            assert!(self.graph.edges_directed(slot, Direction::Incoming).count() <= 1);
            for edge in self.graph.edges_directed(slot, Direction::Outgoing) {
                if let BlockLink::Input { name } = edge.weight() {
                    assert!(self.graph[slot].has_input(name), "{id} lacks socket {name}");
                }
            }
            assert!(id.0 < self.next_id || self.next_id == u32::MAX);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::input;
    use crate::event::ChangeEventKind;

    fn method_with_body(g: &mut BlockGraph, n: usize) -> (BlockId, Vec<BlockId>) {
        let def = g.add_block(BlockKind::MethodDef);
        let body: Vec<BlockId> = (0..n).map(|_| g.add_block(BlockKind::MethodCall)).collect();
        if let Some(&first) = body.first() {
            g.connect_input(def, input::STACK, first).unwrap();
        }
        for pair in body.windows(2) {
            g.connect_next(pair[0], pair[1]).unwrap();
        }
        (def, body)
    }

    #[test]
    fn ids_are_allocated_in_order() {
        let mut g = BlockGraph::new();
        let a = g.add_block(BlockKind::Event);
        let b = g.add_block(BlockKind::Event);
        assert_eq!(a, BlockId(0));
        assert_eq!(b, BlockId(1));
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn insert_keeps_id_and_bumps_counter() {
        let mut g = BlockGraph::new();
        g.insert_block(Block::new(BlockId(10), BlockKind::Text)).unwrap();
        assert_eq!(g.add_block(BlockKind::Text), BlockId(11));
        assert_eq!(
            g.insert_block(Block::new(BlockId(10), BlockKind::Text)),
            Err(CoreError::DuplicateBlock { id: BlockId(10) })
        );
    }

    #[test]
    fn top_of_id_space() {
        let mut g = BlockGraph::new();
        assert_eq!(
            g.insert_block(Block::new(BlockId(u32::MAX), BlockKind::Text)),
            Err(CoreError::IdOverflow { id: BlockId(u32::MAX) })
        );
        assert!(g.is_empty());

        g.insert_block(Block::new(BlockId(u32::MAX - 1), BlockKind::Text)).unwrap();
        assert_eq!(g.add_block(BlockKind::Text), BlockId(u32::MAX));
        // Nothing above is left; the lowest free id is reused.
        assert_eq!(g.add_block(BlockKind::Text), BlockId(0));
        assert_eq!(g.add_block(BlockKind::Text), BlockId(1));
        g.assert_consistency();
    }

    #[test]
    fn statement_stack_and_walk_order() {
        let mut g = BlockGraph::new();
        let (def, body) = method_with_body(&mut g, 3);
        assert_eq!(g.statement_stack(def, input::STACK), body);
        let mut expected = vec![def];
        expected.extend(&body);
        assert_eq!(g.walk(def), expected);
        assert_eq!(g.top_blocks(), vec![def]);
        g.assert_consistency();
    }

    #[test]
    fn walk_visits_inputs_before_next() {
        let mut g = BlockGraph::new();
        let (def, body) = method_with_body(&mut g, 2);
        let call = body[0];
        let mut extra = g.get(call).unwrap().extra.clone();
        extra.call_mut().unwrap().args = vec![crate::block::Parameter::new("x")];
        g.set_extra(call, extra).unwrap();
        let num = g.add_block(BlockKind::Number);
        g.connect_input(call, "ARG0", num).unwrap();
        assert_eq!(g.walk(def), vec![def, call, num, body[1]]);
    }

    #[test]
    fn unplug_with_heal_closes_the_stack() {
        let mut g = BlockGraph::new();
        let (def, body) = method_with_body(&mut g, 3);
        g.unplug(body[1], true).unwrap();
        assert_eq!(g.statement_stack(def, input::STACK), vec![body[0], body[2]]);
        assert!(g.parent(body[1]).is_none());
        assert!(g.next(body[1]).is_none());
        g.assert_consistency();
    }

    #[test]
    fn unplug_without_heal_takes_followers() {
        let mut g = BlockGraph::new();
        let (def, body) = method_with_body(&mut g, 3);
        g.unplug(body[1], false).unwrap();
        assert_eq!(g.statement_stack(def, input::STACK), vec![body[0]]);
        assert_eq!(g.stack(body[1]), vec![body[1], body[2]]);
    }

    #[test]
    fn connect_next_splices_into_stack() {
        let mut g = BlockGraph::new();
        let (def, body) = method_with_body(&mut g, 2);
        let extra = g.add_block(BlockKind::MethodCall);
        g.connect_next(body[0], extra).unwrap();
        assert_eq!(g.statement_stack(def, input::STACK), vec![body[0], extra, body[1]]);
        g.assert_consistency();
    }

    #[test]
    fn statement_input_appends_previous_occupant() {
        let mut g = BlockGraph::new();
        let (def, body) = method_with_body(&mut g, 1);
        let head = g.add_block(BlockKind::MethodCall);
        g.connect_input(def, input::STACK, head).unwrap();
        assert_eq!(g.statement_stack(def, input::STACK), vec![head, body[0]]);
    }

    #[test]
    fn value_input_unplugs_previous_occupant() {
        let mut g = BlockGraph::new();
        let extra = ExtraState::Call(crate::block::CallState {
            args: vec![crate::block::Parameter::new("x")],
            ..Default::default()
        });
        let call = g.add_block_with(BlockKind::MethodCall, extra);
        let a = g.add_block(BlockKind::Number);
        let b = g.add_block(BlockKind::Number);
        g.connect_input(call, "ARG0", a).unwrap();
        g.connect_input(call, "ARG0", b).unwrap();
        assert_eq!(g.input_target(call, "ARG0"), Some(b));
        assert!(g.parent(a).is_none());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut g = BlockGraph::new();
        let (def, body) = method_with_body(&mut g, 2);
        assert!(matches!(
            g.connect_next(body[1], body[0]),
            Err(CoreError::InvalidLink { .. })
        ));
        assert!(matches!(
            g.connect_input(body[0], input::STACK, def),
            Err(CoreError::UnknownInput { .. }) | Err(CoreError::InvalidLink { .. })
        ));
        g.assert_consistency();
    }

    #[test]
    fn unknown_socket_is_an_error() {
        let mut g = BlockGraph::new();
        let def = g.add_block(BlockKind::MethodDef);
        let call = g.add_block(BlockKind::MethodCall);
        assert_eq!(
            g.connect_input(def, "NOPE", call),
            Err(CoreError::UnknownInput {
                id: def,
                input: "NOPE".into()
            })
        );
    }

    #[test]
    fn delete_with_heal_keeps_followers() {
        let mut g = BlockGraph::new();
        let (def, body) = method_with_body(&mut g, 3);
        let removed = g.delete_block(body[1], true).unwrap();
        assert_eq!(removed, vec![body[1]]);
        assert_eq!(g.statement_stack(def, input::STACK), vec![body[0], body[2]]);
        g.assert_consistency();
    }

    #[test]
    fn delete_without_heal_removes_subtree() {
        let mut g = BlockGraph::new();
        let (def, body) = method_with_body(&mut g, 3);
        let removed = g.delete_block(def, false).unwrap();
        assert_eq!(removed.len(), 4);
        assert!(g.is_empty());
        assert!(!g.contains(body[2]));
    }

    #[test]
    fn nearest_ancestor_and_enclosing_input() {
        let mut g = BlockGraph::new();
        let holder = g.add_block(BlockKind::ComponentHolder);
        let first = g.add_block(BlockKind::Event);
        let second = g.add_block(BlockKind::Event);
        g.connect_input(holder, input::EVENTS, first).unwrap();
        g.connect_next(first, second).unwrap();

        let found = g.nearest_ancestor(second, |b| b.kind == BlockKind::ComponentHolder);
        assert_eq!(found, Some(holder));
        assert_eq!(g.enclosing_input(second), Some((holder, input::EVENTS)));
        assert_eq!(g.nearest_ancestor(holder, |_| true), None);
        assert_eq!(g.enclosing_input(holder), None);
    }

    #[test]
    fn mutations_queue_events() {
        let mut g = BlockGraph::new();
        let (def, body) = method_with_body(&mut g, 2);
        let kinds: Vec<ChangeEventKind> = g.take_events().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeEventKind::Create,
                ChangeEventKind::Create,
                ChangeEventKind::Create,
                ChangeEventKind::Move,
                ChangeEventKind::Move,
            ]
        );

        g.set_name(def, "drive").unwrap();
        g.set_name(def, "drive").unwrap();
        assert_eq!(g.take_events().len(), 1);

        g.delete_block(body[0], false).unwrap();
        let deleted: Vec<_> = g.take_events().into_iter().map(|e| e.block).collect();
        assert_eq!(deleted, vec![Some(body[0]), Some(body[1])]);
        assert!(!g.has_pending_events());
    }

    #[test]
    fn set_extra_refuses_to_drop_connected_socket() {
        let mut g = BlockGraph::new();
        let extra = ExtraState::Call(crate::block::CallState {
            args: vec![crate::block::Parameter::new("x")],
            ..Default::default()
        });
        let call = g.add_block_with(BlockKind::MethodCall, extra);
        let num = g.add_block(BlockKind::Number);
        g.connect_input(call, "ARG0", num).unwrap();
        let shrunk = ExtraState::Call(Default::default());
        assert!(matches!(g.set_extra(call, shrunk), Err(CoreError::InvalidLink { .. })));
        assert!(g.get(call).unwrap().has_input("ARG0"));
    }

    #[test]
    fn set_signature_requires_declaration() {
        let mut g = BlockGraph::new();
        let call = g.add_block(BlockKind::MethodCall);
        assert!(matches!(
            g.set_signature(call, vec![]),
            Err(CoreError::WrongKind { .. })
        ));
    }
}
