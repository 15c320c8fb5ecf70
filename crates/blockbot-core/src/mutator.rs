//! Parameter editor for event and method declarations.
//!
//! [`decompose`] builds a separate sub-graph holding a container block with
//! one item per parameter; each item is tagged with the name the parameter
//! had when the editor opened. [`compose`] reads the edited items back,
//! rewrites the declaration's parameter list and display fields, and emits a
//! signature change whose [`ParamChange`]s let call sites keep argument
//! values by original name.

use std::collections::HashSet;

use crate::block::{field, input, BlockKind, ExtraState, Parameter};
use crate::error::CoreError;
use crate::graph::BlockGraph;
use crate::id::BlockId;

/// One parameter of a recomposed list and the name it had before the edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamChange {
    pub param: Parameter,
    /// `None` for parameters added during this edit.
    pub previous_name: Option<String>,
}

impl ParamChange {
    pub fn added(param: Parameter) -> Self {
        ParamChange {
            param,
            previous_name: None,
        }
    }

    /// A parameter identified by its current name.
    pub fn kept(param: Parameter) -> Self {
        let previous_name = Some(param.name.clone());
        ParamChange { param, previous_name }
    }
}

fn declaration_params(graph: &BlockGraph, decl: BlockId) -> Result<Vec<Parameter>, CoreError> {
    let block = graph.get(decl)?;
    block
        .extra
        .params()
        .map(<[Parameter]>::to_vec)
        .ok_or(CoreError::WrongKind {
            id: decl,
            actual: block.kind,
            expected: "event or method definition",
        })
}

/// Builds the editor sub-graph for `decl`'s parameters.
pub fn decompose(graph: &BlockGraph, decl: BlockId) -> Result<BlockGraph, CoreError> {
    let params = declaration_params(graph, decl)?;
    let mut mutator = BlockGraph::new();
    let container = mutator.add_block(BlockKind::ParamContainer);

    let mut prev: Option<BlockId> = None;
    for param in params {
        let item = mutator.add_block_with(
            BlockKind::ParamItem,
            ExtraState::ParamItem {
                original_name: Some(param.name.clone()),
            },
        );
        mutator.set_field(item, field::NAME, &param.name)?;
        if let Some(ty) = &param.ty {
            mutator.set_field(item, field::TYPE, ty)?;
        }
        match prev {
            None => mutator.connect_input(container, input::STACK, item)?,
            Some(p) => mutator.connect_next(p, item)?,
        }
        prev = Some(item);
    }
    mutator.take_events();
    Ok(mutator)
}

/// Applies the edited sub-graph to `decl` and returns the recomposed list.
///
/// Items are read in chain order. Names are trimmed; empty names are
/// skipped and repeated names get a numeric suffix. Afterwards every item
/// is re-tagged with its new name so the editor can be composed again.
pub fn compose(graph: &mut BlockGraph, decl: BlockId, mutator: &mut BlockGraph) -> Result<Vec<ParamChange>, CoreError> {
    declaration_params(graph, decl)?;
    let container = mutator
        .top_blocks()
        .into_iter()
        .find(|&id| mutator.block(id).is_some_and(|b| b.kind == BlockKind::ParamContainer))
        .ok_or(CoreError::MissingContainer)?;

    let mut used = HashSet::new();
    let mut changes = Vec::new();
    let mut retag = Vec::new();
    for item in mutator.statement_stack(container, input::STACK) {
        let block = mutator.get(item)?;
        if block.kind != BlockKind::ParamItem {
            continue;
        }
        let raw = block.name().unwrap_or_default().trim();
        if raw.is_empty() {
            continue;
        }
        let name = unique_name(raw, &used);
        used.insert(name.clone());
        let ty = block.field(field::TYPE).filter(|t| !t.is_empty()).map(str::to_string);
        let previous_name = match &block.extra {
            ExtraState::ParamItem { original_name } => original_name.clone(),
            _ => None,
        };
        changes.push(ParamChange {
            param: Parameter { name: name.clone(), ty },
            previous_name,
        });
        retag.push((item, name));
    }

    graph.set_signature(decl, changes.clone())?;

    for (item, name) in retag {
        mutator.set_field(item, field::NAME, &name)?;
        mutator.set_extra(
            item,
            ExtraState::ParamItem {
                original_name: Some(name),
            },
        )?;
    }
    mutator.take_events();
    Ok(changes)
}

fn unique_name(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}
