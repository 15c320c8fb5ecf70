//! End-to-end propagation scenarios through an EditSession.

use blockbot_core::block::{field, input, MethodState};
use blockbot_core::{
    BlockId, BlockKind, CallTarget, ChangeRegistry, DeclarationScope, Declarations, EditSession, ExtraState,
    FieldEdit, Parameter, Visibility,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

struct Robot {
    session: EditSession,
    event: BlockId,
    drive: BlockId,
}

/// Robot with event `shoot(power)` and method `drive(speed)`, plus a
/// method `auto` that fires `shoot` twice and calls `drive(5)`.
fn robot() -> (Robot, Vec<BlockId>, BlockId) {
    let mut s = EditSession::new(ChangeRegistry::with_defaults(), DeclarationScope::new());
    let holder = s.create_block(BlockKind::ComponentHolder);
    let event = s.create_block_with(
        BlockKind::Event,
        ExtraState::Event {
            params: vec![Parameter::new("power")],
        },
    );
    s.connect_input(holder, input::EVENTS, event).unwrap();
    s.set_field(event, field::NAME, "shoot").unwrap();

    let drive = s.create_block_with(
        BlockKind::MethodDef,
        ExtraState::Method(MethodState {
            params: vec![Parameter::new("speed")],
            return_type: None,
            visibility: Visibility::Outside,
        }),
    );
    s.set_field(drive, field::NAME, "drive").unwrap();

    let auto = s.create_block(BlockKind::MethodDef);
    s.set_field(auto, field::NAME, "auto").unwrap();
    let fire_a = s.create_call_to(event).unwrap();
    let fire_b = s.create_call_to(event).unwrap();
    let call = s.create_call_to(drive).unwrap();
    s.connect_input(auto, input::STACK, fire_a).unwrap();
    s.connect_next(fire_a, fire_b).unwrap();
    s.connect_next(fire_b, call).unwrap();
    let five = s.create_block(BlockKind::Number);
    s.set_field(five, field::NUM, "5").unwrap();
    s.connect_input(call, "ARG0", five).unwrap();

    (
        Robot {
            session: s,
            event,
            drive,
        },
        vec![fire_a, fire_b],
        call,
    )
}

fn call_name(s: &EditSession, id: BlockId) -> String {
    s.graph().get(id).unwrap().extra.call().unwrap().name.clone()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn renamed_event_reaches_every_fire_site() {
    let (mut robot, fires, call) = robot();
    robot.session.set_field(robot.event, field::NAME, "fire").unwrap();
    for fire in fires {
        assert_eq!(call_name(&robot.session, fire), "fire");
    }
    assert_eq!(call_name(&robot.session, call), "drive");
}

#[test]
fn added_parameter_keeps_existing_argument() {
    let (mut robot, _, call) = robot();
    let mut editor = robot.session.open_mutator(robot.drive).unwrap();
    let container = editor.top_blocks()[0];
    let speed = editor.input_target(container, input::STACK).unwrap();
    let heading = editor.add_block(BlockKind::ParamItem);
    editor.set_field(heading, field::NAME, "heading").unwrap();
    editor.connect_next(speed, heading).unwrap();
    robot.session.apply_mutator(robot.drive, &mut editor).unwrap();

    let g = robot.session.graph();
    let five = g.input_target(call, "ARG0").unwrap();
    assert_eq!(g.get(five).unwrap().field(field::NUM), Some("5"));
    assert!(g.input_target(call, "ARG1").is_none());
    assert_eq!(
        g.get(robot.drive).unwrap().field("PARAM_1"),
        Some("heading")
    );
}

#[test]
fn opmode_follows_robot_rename_on_reload() {
    let (mut robot, _, _) = robot();
    let exported = robot.session.declarations().exported();

    let mut opmode = EditSession::new(
        ChangeRegistry::with_defaults(),
        DeclarationScope::new().with_robot(exported),
    );
    let handler = opmode.create_block_with(
        BlockKind::EventHandler,
        ExtraState::Call(blockbot_core::CallState {
            target: CallTarget::Robot,
            name: "shoot".into(),
            args: vec![Parameter::new("power")],
            return_type: None,
            other_block_id: Some(robot.event),
        }),
    );
    let saved = opmode.serialize();

    robot.session.set_field(robot.event, field::NAME, "fire").unwrap();
    let scope = DeclarationScope::new().with_robot(robot.session.declarations().exported());
    let reopened = EditSession::load(&saved, scope, ChangeRegistry::with_defaults()).unwrap();
    assert_eq!(call_name(&reopened, handler), "fire");
    assert!(reopened.warnings().is_empty());
}

#[test]
fn deleting_a_method_warns_its_callers() {
    let (mut robot, _, call) = robot();
    robot.session.delete_block(robot.drive, false).unwrap();
    let warnings = robot.session.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].0, call);
    assert!(Declarations::collect(robot.session.graph())
        .methods
        .iter()
        .all(|m| m.name != "drive"));
}

proptest! {
    #[test]
    fn last_accepted_name_wins(names in proptest::collection::vec("[ a-z]{0,6}", 1..12)) {
        let (mut robot, fires, _) = robot();
        let mut expected = "shoot".to_string();
        for name in &names {
            if let FieldEdit::Applied { value } = robot.session.set_field(robot.event, field::NAME, name).unwrap() {
                expected = value;
            }
        }
        for fire in fires {
            prop_assert_eq!(call_name(&robot.session, fire), expected.clone());
        }
        prop_assert!(!expected.trim().is_empty());
    }
}
