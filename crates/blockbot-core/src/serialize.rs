//! Persisted form of a module graph.
//!
//! Blocks keep their ids. Statement chains are stored as flat lists (a
//! top-level stack, or the chain plugged into a statement socket) so that
//! nesting depth follows input nesting only, never chain length. Warnings
//! are transient and not persisted. Socket lists are derived from kind and
//! extra state on load.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockKind, ExtraState, InputKind};
use crate::error::CoreError;
use crate::graph::{BlockGraph, BlockLink};
use crate::id::BlockId;

/// A statement chain: the head block followed by its followers.
pub type SerializedStack = Vec<SerializedBlock>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializedWorkspace {
    #[serde(default)]
    pub stacks: Vec<SerializedStack>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedBlock {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, String>,
    #[serde(default, rename = "extraState", skip_serializing_if = "ExtraState::is_none")]
    pub extra_state: ExtraState,
    /// Socket name -> plugged chain. Value sockets hold exactly one block.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, SerializedStack>,
}

impl SerializedWorkspace {
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Number of blocks at every nesting level.
    pub fn block_count(&self) -> usize {
        fn count(stack: &[SerializedBlock]) -> usize {
            stack
                .iter()
                .map(|b| 1 + b.inputs.values().map(|s| count(s)).sum::<usize>())
                .sum()
        }
        self.stacks.iter().map(|s| count(s)).sum()
    }
}

impl BlockGraph {
    /// Serializes every top stack in ascending id order.
    pub fn to_serialized(&self) -> SerializedWorkspace {
        SerializedWorkspace {
            stacks: self
                .top_blocks()
                .into_iter()
                .map(|top| self.serialize_stack(top))
                .collect(),
        }
    }

    fn serialize_stack(&self, first: BlockId) -> SerializedStack {
        self.stack(first)
            .into_iter()
            .filter_map(|id| self.serialize_block(id))
            .collect()
    }

    fn serialize_block(&self, id: BlockId) -> Option<SerializedBlock> {
        let block = self.block(id)?;
        let mut inputs = IndexMap::new();
        for socket in &block.inputs {
            if let Some(child) = self.input_target(id, &socket.name) {
                inputs.insert(socket.name.clone(), self.serialize_stack(child));
            }
        }
        Some(SerializedBlock {
            id,
            kind: block.kind,
            fields: block.fields.clone(),
            extra_state: block.extra.clone(),
            inputs,
        })
    }

    /// Rebuilds a graph, queuing one create event per block in walk order.
    pub fn from_serialized(workspace: &SerializedWorkspace) -> Result<BlockGraph, CoreError> {
        let mut graph = BlockGraph::new();
        for stack in &workspace.stacks {
            graph.load_stack(stack)?;
        }
        Ok(graph)
    }

    fn load_stack(&mut self, stack: &[SerializedBlock]) -> Result<Option<BlockId>, CoreError> {
        let mut head = None;
        let mut prev: Option<BlockId> = None;
        for serialized in stack {
            let id = self.load_block(serialized)?;
            match prev {
                Some(p) => self.attach(p, id, BlockLink::Next)?,
                None => head = Some(id),
            }
            prev = Some(id);
        }
        Ok(head)
    }

    fn load_block(&mut self, serialized: &SerializedBlock) -> Result<BlockId, CoreError> {
        let mut block = Block::with_extra(serialized.id, serialized.kind, serialized.extra_state.clone());
        if !serialized.fields.is_empty() {
            let defaults = std::mem::replace(&mut block.fields, serialized.fields.clone());
            for (name, value) in defaults {
                block.fields.entry(name).or_insert(value);
            }
        }
        let id = self.insert_block(block)?;

        for (name, chain) in &serialized.inputs {
            let socket = self
                .get(id)?
                .input(name)
                .map(|s| s.kind)
                .ok_or_else(|| CoreError::UnknownInput {
                    id,
                    input: name.clone(),
                })?;
            if socket == InputKind::Value && chain.len() > 1 {
                return Err(CoreError::InvalidLink {
                    reason: format!("value input '{name}' of {id} holds {} blocks", chain.len()),
                });
            }
            if let Some(child) = self.load_stack(chain)? {
                self.attach(id, child, BlockLink::Input { name: name.clone() })?;
            }
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{field, input, CallState, Parameter};
    use crate::event::ChangeEventKind;
    use proptest::prelude::*;

    fn sample() -> BlockGraph {
        let mut g = BlockGraph::new();
        let holder = g.add_block(BlockKind::ComponentHolder);
        let event = g.add_block_with(
            BlockKind::Event,
            ExtraState::Event {
                params: vec![Parameter::typed("power", "float")],
            },
        );
        g.set_name(event, "shoot").unwrap();
        g.connect_input(holder, input::EVENTS, event).unwrap();

        let def = g.add_block(BlockKind::MethodDef);
        g.set_name(def, "run").unwrap();
        let fire = g.add_block_with(
            BlockKind::MethodCall,
            ExtraState::Call(CallState {
                target: crate::block::CallTarget::FireEvent,
                name: "shoot".into(),
                args: vec![Parameter::typed("power", "float")],
                return_type: None,
                other_block_id: Some(event),
            }),
        );
        g.connect_input(def, input::STACK, fire).unwrap();
        let num = g.add_block(BlockKind::Number);
        g.set_field(num, field::NUM, "0.5").unwrap();
        g.connect_input(fire, "ARG0", num).unwrap();
        g
    }

    #[test]
    fn round_trip_preserves_structure() {
        let g = sample();
        let ws = g.to_serialized();
        assert_eq!(ws.block_count(), g.len());

        let back = BlockGraph::from_serialized(&ws).unwrap();
        assert_eq!(back.to_serialized(), ws);
        assert_eq!(back.ids(), g.ids());
        back.assert_consistency();
    }

    #[test]
    fn json_shape_is_stable() {
        let ws = sample().to_serialized();
        let json = serde_json::to_value(&ws).unwrap();
        assert_eq!(json["stacks"][0][0]["type"], "component_holder");
        assert_eq!(json["stacks"][0][0]["inputs"]["EVENTS"][0]["fields"]["NAME"], "shoot");
        assert_eq!(json["stacks"][1][0]["inputs"]["STACK"][0]["extraState"]["target"], "fire_event");
        let text = serde_json::to_string(&ws).unwrap();
        let parsed: SerializedWorkspace = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, ws);
    }

    #[test]
    fn warnings_are_not_persisted() {
        let mut g = sample();
        g.set_warning(BlockId(0), Some("careful".into())).unwrap();
        let back = BlockGraph::from_serialized(&g.to_serialized()).unwrap();
        assert_eq!(back.get(BlockId(0)).unwrap().warning, None);
    }

    #[test]
    fn loading_queues_creates_in_walk_order() {
        let g = sample();
        let mut back = BlockGraph::from_serialized(&g.to_serialized()).unwrap();
        let events = back.take_events();
        assert!(events.iter().all(|e| e.kind() == ChangeEventKind::Create));
        let order: Vec<BlockId> = events.iter().filter_map(|e| e.block).collect();
        assert_eq!(order, g.walk_all());
    }

    #[test]
    fn unknown_input_is_rejected() {
        let mut ws = sample().to_serialized();
        let holder = &mut ws.stacks[0][0];
        let events = holder.inputs.shift_remove("EVENTS").unwrap();
        holder.inputs.insert("BOGUS".into(), events);
        assert!(matches!(
            BlockGraph::from_serialized(&ws),
            Err(CoreError::UnknownInput { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut ws = sample().to_serialized();
        let dup = ws.stacks[0].clone();
        ws.stacks.push(dup);
        assert!(matches!(
            BlockGraph::from_serialized(&ws),
            Err(CoreError::DuplicateBlock { .. })
        ));
    }

    #[test]
    fn id_without_successor_is_rejected() {
        let mut ws = sample().to_serialized();
        ws.stacks[0][0].id = BlockId(u32::MAX);
        assert_eq!(
            BlockGraph::from_serialized(&ws).unwrap_err(),
            CoreError::IdOverflow { id: BlockId(u32::MAX) }
        );
    }

    #[test]
    fn long_chains_stay_flat() {
        let mut g = BlockGraph::new();
        let def = g.add_block(BlockKind::MethodDef);
        let mut prev = None;
        for _ in 0..500 {
            let call = g.add_block(BlockKind::MethodCall);
            match prev {
                None => g.connect_input(def, input::STACK, call).unwrap(),
                Some(p) => g.connect_next(p, call).unwrap(),
            }
            prev = Some(call);
        }
        let text = serde_json::to_string(&g.to_serialized()).unwrap();
        let parsed: SerializedWorkspace = serde_json::from_str(&text).unwrap();
        assert_eq!(BlockGraph::from_serialized(&parsed).unwrap().len(), 501);
    }

    proptest! {
        #[test]
        fn chains_of_any_length_round_trip(len in 0usize..40, values in proptest::collection::vec(-1000i32..1000, 40)) {
            let mut g = BlockGraph::new();
            let def = g.add_block(BlockKind::MethodDef);
            let mut prev = None;
            for value in values.iter().take(len) {
                let call = g.add_block_with(
                    BlockKind::MethodCall,
                    ExtraState::Call(CallState {
                        name: "step".into(),
                        args: vec![Parameter::new("n")],
                        ..CallState::default()
                    }),
                );
                let num = g.add_block(BlockKind::Number);
                g.set_field(num, field::NUM, &value.to_string()).unwrap();
                g.connect_input(call, "ARG0", num).unwrap();
                match prev {
                    None => g.connect_input(def, input::STACK, call).unwrap(),
                    Some(p) => g.connect_next(p, call).unwrap(),
                }
                prev = Some(call);
            }
            let ws = g.to_serialized();
            let back = BlockGraph::from_serialized(&ws).unwrap();
            prop_assert_eq!(back.to_serialized(), ws);
            prop_assert_eq!(back.walk_all(), g.walk_all());
        }
    }
}
