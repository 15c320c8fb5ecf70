//! Consistency propagation from declarations to the blocks that reference
//! them.
//!
//! References (`MethodCall`, `EventHandler`) hold their declaration's id in
//! `other_block_id`. Renames and signature changes of a declaration are
//! pushed to every reference in the same graph; references to other modules
//! are brought up to date by [`reconcile_all`] when a graph is loaded
//! against a fresh [`DeclarationScope`]. A reference that cannot be updated
//! is logged and skipped, never treated as fatal.

use crate::block::{field, input, CallState, CallTarget, ExtraState};
use crate::decl::{DeclarationScope, Declarations, Lookup};
use crate::error::CoreError;
use crate::graph::BlockGraph;
use crate::id::BlockId;
use crate::mutator::ParamChange;

/// Warning placed on references whose declaration no longer exists.
pub fn missing_declaration_warning(name: &str) -> String {
    format!("Cannot find a declaration named '{name}'")
}

/// Local references to `decl`, in ascending id order.
pub fn callers_of(graph: &BlockGraph, decl: BlockId) -> Vec<BlockId> {
    graph
        .blocks()
        .into_iter()
        .filter(|b| b.kind.is_reference())
        .filter(|b| {
            b.extra
                .call()
                .is_some_and(|c| c.target.is_local() && c.other_block_id == Some(decl))
        })
        .map(|b| b.id)
        .collect()
}

fn update_call(graph: &mut BlockGraph, id: BlockId, edit: impl FnOnce(&mut CallState)) -> Result<(), CoreError> {
    let block = graph.get(id)?;
    let mut extra = block.extra.clone();
    let call = extra.call_mut().ok_or(CoreError::WrongKind {
        id,
        actual: block.kind,
        expected: "method call or event handler",
    })?;
    edit(call);
    let name = call.name.clone();
    graph.set_extra(id, extra)?;
    graph.set_field(id, field::NAME, &name)?;
    Ok(())
}

/// Renames every local reference to `decl`. Returns how many were updated.
pub fn rename_callers(graph: &mut BlockGraph, decl: BlockId, new_name: &str) -> usize {
    let mut updated = 0;
    for caller in callers_of(graph, decl) {
        let result = update_call(graph, caller, |call| call.name = new_name.to_string());
        match result {
            Ok(()) => updated += 1,
            Err(e) => tracing::warn!(caller = %caller, error = %e, "skipping caller during rename"),
        }
    }
    tracing::debug!(decl = %decl, new_name, updated, "renamed callers");
    updated
}

/// Re-shapes every local reference to `decl` after a signature change.
pub fn mutate_callers(graph: &mut BlockGraph, decl: BlockId, changes: &[ParamChange]) -> usize {
    let mut updated = 0;
    for caller in callers_of(graph, decl) {
        match regenerate_arguments(graph, caller, changes) {
            Ok(()) => updated += 1,
            Err(e) => tracing::warn!(caller = %caller, error = %e, "skipping caller during signature change"),
        }
    }
    updated
}

/// Rebuilds a reference's argument list from `changes`.
///
/// Existing argument values are matched to new parameters by previous
/// name. Parameters without a match get an empty socket; values whose
/// parameter disappeared are deleted. Works for any current arity.
pub fn regenerate_arguments(graph: &mut BlockGraph, id: BlockId, changes: &[ParamChange]) -> Result<(), CoreError> {
    let block = graph.get(id)?;
    let old_args = block
        .extra
        .call()
        .map(|c| c.args.clone())
        .ok_or(CoreError::WrongKind {
            id,
            actual: block.kind,
            expected: "method call or event handler",
        })?;

    // Lift current argument values out of their sockets.
    let mut values: Vec<(String, Option<BlockId>)> = Vec::with_capacity(old_args.len());
    for (i, arg) in old_args.iter().enumerate() {
        let value = graph.input_target(id, &input::arg(i));
        if let Some(value) = value {
            graph.unplug(value, false)?;
        }
        values.push((arg.name.clone(), value));
    }

    update_call(graph, id, |call| {
        call.args = changes.iter().map(|c| c.param.clone()).collect();
    })?;

    for (i, change) in changes.iter().enumerate() {
        let Some(previous) = &change.previous_name else { continue };
        let slot = values.iter_mut().find(|(name, value)| name == previous && value.is_some());
        if let Some((_, value)) = slot {
            if let Some(value) = value.take() {
                if graph.get(id)?.has_input(&input::arg(i)) {
                    graph.connect_input(id, &input::arg(i), value)?;
                } else {
                    // Event handlers carry no sockets.
                    graph.delete_block(value, false)?;
                }
            }
        }
    }

    for (_, value) in values {
        if let Some(value) = value {
            graph.delete_block(value, false)?;
        }
    }
    Ok(())
}

/// Marks every local reference to a deleted declaration.
pub fn flag_orphaned_callers(graph: &mut BlockGraph, decl: BlockId) -> usize {
    let callers = callers_of(graph, decl);
    for &caller in &callers {
        let name = graph
            .block(caller)
            .and_then(|b| b.extra.call())
            .map(|c| c.name.clone())
            .unwrap_or_default();
        if let Err(e) = graph.set_warning(caller, Some(missing_declaration_warning(&name))) {
            tracing::warn!(caller = %caller, error = %e, "cannot flag orphaned caller");
        }
    }
    callers.len()
}

/// What reconciling one reference did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Unchanged,
    Updated,
    /// The owning module declares nothing matching; the block is warned.
    Dangling,
    /// The owning module's declarations are unavailable.
    Skipped,
}

/// Brings one reference in line with the declaration it resolves to.
///
/// `own` holds the declarations of `graph` itself.
pub fn reconcile_reference(
    graph: &mut BlockGraph,
    own: &Declarations,
    scope: &DeclarationScope,
    id: BlockId,
) -> Result<Reconciled, CoreError> {
    let block = graph.get(id)?;
    let kind = block.kind;
    let Some(call) = block.extra.call().cloned() else {
        return Ok(Reconciled::Unchanged);
    };

    match scope.lookup(own, kind, &call) {
        Lookup::Found(sig) => {
            let mut changed = false;
            let stale = call.other_block_id != Some(sig.block_id)
                || call.name != sig.name
                || call.return_type != sig.return_type;
            if stale {
                update_call(graph, id, |c| {
                    c.other_block_id = Some(sig.block_id);
                    c.name = sig.name.clone();
                    c.return_type = sig.return_type.clone();
                })?;
                changed = true;
            }
            if call.args != sig.args {
                let changes: Vec<ParamChange> = sig.args.iter().cloned().map(ParamChange::kept).collect();
                regenerate_arguments(graph, id, &changes)?;
                changed = true;
            }
            graph.set_warning(id, None)?;
            Ok(if changed {
                Reconciled::Updated
            } else {
                Reconciled::Unchanged
            })
        }
        Lookup::Missing => {
            tracing::warn!(block = %id, name = %call.name, "reference has no declaration");
            graph.set_warning(id, Some(missing_declaration_warning(&call.name)))?;
            Ok(Reconciled::Dangling)
        }
        Lookup::Unresolvable => Ok(Reconciled::Skipped),
    }
}

/// Totals of a [`reconcile_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub updated: usize,
    pub dangling: usize,
    pub skipped: usize,
}

/// Reconciles every reference in the graph against `scope`.
pub fn reconcile_all(graph: &mut BlockGraph, scope: &DeclarationScope) -> ReconcileReport {
    let own = Declarations::collect(graph);
    let mut report = ReconcileReport::default();
    let references: Vec<BlockId> = graph
        .blocks()
        .into_iter()
        .filter(|b| b.kind.is_reference())
        .map(|b| b.id)
        .collect();
    for id in references {
        match reconcile_reference(graph, &own, scope, id) {
            Ok(Reconciled::Updated) => report.updated += 1,
            Ok(Reconciled::Dangling) => report.dangling += 1,
            Ok(Reconciled::Skipped) => report.skipped += 1,
            Ok(Reconciled::Unchanged) => {}
            Err(e) => tracing::warn!(block = %id, error = %e, "skipping reference during reconcile"),
        }
    }
    report
}

/// Extra state of a fresh call site referencing `decl` in the same graph.
pub fn call_state_for(graph: &BlockGraph, decl: BlockId) -> Result<ExtraState, CoreError> {
    let block = graph.get(decl)?;
    let args = block.extra.params().map(<[_]>::to_vec).unwrap_or_default();
    let (target, return_type) = match &block.extra {
        ExtraState::Event { .. } => (CallTarget::FireEvent, None),
        ExtraState::Method(m) => (CallTarget::SelfModule, m.return_type.clone()),
        _ => {
            return Err(CoreError::WrongKind {
                id: decl,
                actual: block.kind,
                expected: "event or method definition",
            })
        }
    };
    Ok(ExtraState::Call(CallState {
        target,
        name: block.name().unwrap_or_default().to_string(),
        args,
        return_type,
        other_block_id: Some(decl),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockKind, MethodState, Parameter};

    struct Fixture {
        graph: BlockGraph,
        def: BlockId,
        call: BlockId,
    }

    /// `drive(speed)` and a call `drive(speed=5)` inside another method.
    fn fixture() -> Fixture {
        let mut g = BlockGraph::new();
        let def = g.add_block_with(
            BlockKind::MethodDef,
            ExtraState::Method(MethodState {
                params: vec![Parameter::new("speed")],
                ..Default::default()
            }),
        );
        g.set_name(def, "drive").unwrap();

        let outer = g.add_block(BlockKind::MethodDef);
        g.set_name(outer, "auto").unwrap();
        let call = g.add_block_with(BlockKind::MethodCall, call_state_for(&g, def).unwrap());
        g.set_name(call, "drive").unwrap();
        g.connect_input(outer, input::STACK, call).unwrap();
        let five = g.add_block(BlockKind::Number);
        g.set_field(five, field::NUM, "5").unwrap();
        g.connect_input(call, "ARG0", five).unwrap();
        g.take_events();
        Fixture { graph: g, def, call }
    }

    fn arg_value(g: &BlockGraph, call: BlockId, i: usize) -> Option<String> {
        g.input_target(call, &input::arg(i))
            .and_then(|v| g.block(v))
            .and_then(|b| b.field(field::NUM))
            .map(str::to_string)
    }

    #[test]
    fn rename_updates_only_matching_callers() {
        let Fixture { mut graph, def, call } = fixture();
        let other = graph.add_block_with(
            BlockKind::MethodCall,
            ExtraState::Call(CallState {
                name: "drive".into(),
                other_block_id: Some(BlockId(999)),
                ..Default::default()
            }),
        );
        assert_eq!(rename_callers(&mut graph, def, "move"), 1);
        assert_eq!(graph.get(call).unwrap().extra.call().unwrap().name, "move");
        assert_eq!(graph.get(call).unwrap().name(), Some("move"));
        assert_eq!(graph.get(other).unwrap().extra.call().unwrap().name, "drive");
    }

    #[test]
    fn added_parameter_gets_empty_socket() {
        let Fixture { mut graph, def, call } = fixture();
        let changes = vec![
            ParamChange::kept(Parameter::new("speed")),
            ParamChange::added(Parameter::new("heading")),
        ];
        graph.set_signature(def, changes.clone()).unwrap();
        assert_eq!(mutate_callers(&mut graph, def, &changes), 1);

        assert_eq!(arg_value(&graph, call, 0).as_deref(), Some("5"));
        assert!(graph.get(call).unwrap().has_input("ARG1"));
        assert_eq!(graph.input_target(call, "ARG1"), None);
        graph.assert_consistency();
    }

    #[test]
    fn reordered_and_renamed_parameters_keep_values() {
        let Fixture { mut graph, def, call } = fixture();
        let changes = vec![
            ParamChange::added(Parameter::new("heading")),
            ParamChange {
                param: Parameter::new("velocity"),
                previous_name: Some("speed".into()),
            },
        ];
        mutate_callers(&mut graph, def, &changes);
        assert_eq!(arg_value(&graph, call, 0), None);
        assert_eq!(arg_value(&graph, call, 1).as_deref(), Some("5"));
    }

    #[test]
    fn removed_parameter_drops_its_value() {
        let Fixture { mut graph, def, call } = fixture();
        let before = graph.len();
        mutate_callers(&mut graph, def, &[]);
        assert!(graph.get(call).unwrap().inputs.is_empty());
        assert_eq!(graph.len(), before - 1);
        graph.assert_consistency();
    }

    #[test]
    fn arity_mismatch_is_tolerated() {
        let Fixture { mut graph, def, call } = fixture();
        // Call site already lost its argument list.
        regenerate_arguments(&mut graph, call, &[]).unwrap();
        let changes = vec![ParamChange::kept(Parameter::new("speed")), ParamChange::kept(Parameter::new("x"))];
        assert_eq!(mutate_callers(&mut graph, def, &changes), 1);
        assert_eq!(graph.get(call).unwrap().inputs.len(), 2);
    }

    #[test]
    fn deleted_declaration_flags_callers() {
        let Fixture { mut graph, def, call } = fixture();
        graph.delete_block(def, false).unwrap();
        assert_eq!(flag_orphaned_callers(&mut graph, def), 1);
        assert_eq!(
            graph.get(call).unwrap().warning.as_deref(),
            Some(missing_declaration_warning("drive").as_str())
        );
    }

    #[test]
    fn reconcile_follows_robot_declaration() {
        let mut robot = BlockGraph::new();
        let holder = robot.add_block(BlockKind::ComponentHolder);
        let event = robot.add_block_with(
            BlockKind::Event,
            ExtraState::Event {
                params: vec![Parameter::new("power"), Parameter::new("angle")],
            },
        );
        robot.set_name(event, "fire").unwrap();
        robot.connect_input(holder, input::EVENTS, event).unwrap();
        let scope = DeclarationScope::new().with_robot(Declarations::collect(&robot).exported());

        let mut opmode = BlockGraph::new();
        let handler = opmode.add_block_with(
            BlockKind::EventHandler,
            ExtraState::Call(CallState {
                target: CallTarget::Robot,
                name: "shoot".into(),
                args: vec![Parameter::new("power")],
                return_type: None,
                other_block_id: Some(event),
            }),
        );
        let report = reconcile_all(&mut opmode, &scope);
        assert_eq!(report.updated, 1);
        let call = opmode.get(handler).unwrap().extra.call().unwrap().clone();
        assert_eq!(call.name, "fire");
        assert_eq!(call.args.len(), 2);

        // Second pass is a no-op.
        assert_eq!(reconcile_all(&mut opmode, &scope), ReconcileReport::default());
    }

    #[test]
    fn reconcile_warns_on_missing_declaration() {
        let scope = DeclarationScope::new().with_robot(Declarations::default());
        let mut g = BlockGraph::new();
        let call = g.add_block_with(
            BlockKind::MethodCall,
            ExtraState::Call(CallState {
                target: CallTarget::Robot,
                name: "gone".into(),
                ..Default::default()
            }),
        );
        let report = reconcile_all(&mut g, &scope);
        assert_eq!(report.dangling, 1);
        assert!(g.get(call).unwrap().warning.is_some());
    }
}
