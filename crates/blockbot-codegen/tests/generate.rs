//! Python output of whole modules.

use blockbot_codegen::{generate, CodegenError, GenerateOptions, Severity};
use blockbot_core::block::{field, input, ComponentState, MethodState};
use blockbot_core::{
    BlockGraph, BlockId, BlockKind, CallState, CallTarget, DeclarationScope, Declarations, ExtraState, ModuleType,
    Parameter, Visibility,
};
use blockbot_core::decl::{EventDecl, MethodDecl};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn call(target: CallTarget, name: &str, args: &[&str], other: Option<BlockId>) -> ExtraState {
    ExtraState::Call(CallState {
        target,
        name: name.to_string(),
        args: args.iter().map(|a| Parameter::new(*a)).collect(),
        return_type: None,
        other_block_id: other,
    })
}

fn variable(g: &mut BlockGraph, name: &str) -> BlockId {
    let id = g.add_block(BlockKind::VariableGet);
    g.set_field(id, field::VAR, name).unwrap();
    id
}

fn number(g: &mut BlockGraph, value: &str) -> BlockId {
    let id = g.add_block(BlockKind::Number);
    g.set_field(id, field::NUM, value).unwrap();
    id
}

/// Robot with a motor on port 1, event `shoot(power)` and an exported
/// method `drive(speed)` that fires `shoot`.
fn robot_graph() -> BlockGraph {
    let mut g = BlockGraph::new();
    let holder = g.add_block(BlockKind::ComponentHolder);
    let motor = g.add_block_with(
        BlockKind::Component,
        ExtraState::Component(ComponentState {
            class_name: "ExpansionHubMotor".into(),
            import_module: "wpilib_placeholders".into(),
        }),
    );
    g.set_field(motor, field::NAME, "left motor").unwrap();
    g.set_field(motor, field::PORT, "1").unwrap();
    g.connect_input(holder, input::COMPONENTS, motor).unwrap();

    let event = g.add_block_with(
        BlockKind::Event,
        ExtraState::Event {
            params: vec![Parameter::new("power")],
        },
    );
    g.set_field(event, field::NAME, "shoot").unwrap();
    g.connect_input(holder, input::EVENTS, event).unwrap();

    let drive = g.add_block_with(
        BlockKind::MethodDef,
        ExtraState::Method(MethodState {
            params: vec![Parameter::new("speed")],
            return_type: None,
            visibility: Visibility::Outside,
        }),
    );
    g.set_field(drive, field::NAME, "drive").unwrap();
    let fire = g.add_block_with(BlockKind::MethodCall, call(CallTarget::FireEvent, "shoot", &["power"], Some(event)));
    g.connect_input(drive, input::STACK, fire).unwrap();
    let speed = variable(&mut g, "speed");
    g.connect_input(fire, "ARG0", speed).unwrap();
    g
}

fn robot_scope(drive_args: &[&str]) -> DeclarationScope {
    DeclarationScope::new().with_robot(Declarations {
        components: Vec::new(),
        events: vec![EventDecl {
            block_id: BlockId(11),
            name: "shoot".into(),
            args: vec![Parameter::new("power")],
        }],
        methods: vec![MethodDecl {
            block_id: BlockId(10),
            name: "drive".into(),
            python_name: "drive".into(),
            visibility: Visibility::Outside,
            return_type: None,
            args: drive_args.iter().map(|a| Parameter::new(*a)).collect(),
        }],
    })
}

/// Opmode "Score Left" handling the robot's `shoot` event by driving and
/// sleeping.
fn opmode_graph() -> BlockGraph {
    let mut g = BlockGraph::new();
    let details = g.add_block(BlockKind::OpModeDetails);
    g.set_field(details, field::TYPE, "Auto").unwrap();
    g.set_field(details, field::NAME, "Score Left").unwrap();

    let handler = g.add_block_with(
        BlockKind::EventHandler,
        call(CallTarget::Robot, "shoot", &["power"], Some(BlockId(11))),
    );
    let drive = g.add_block_with(BlockKind::MethodCall, call(CallTarget::Robot, "drive", &["speed"], Some(BlockId(10))));
    g.connect_input(handler, input::STACK, drive).unwrap();
    let power = variable(&mut g, "power");
    g.connect_input(drive, "ARG0", power).unwrap();

    let sleep = g.add_block_with(
        BlockKind::MethodCall,
        call(
            CallTarget::ModuleFunction { module: "time".into() },
            "sleep",
            &["seconds"],
            None,
        ),
    );
    g.connect_next(drive, sleep).unwrap();
    let half = number(&mut g, "0.5");
    g.connect_input(sleep, "ARG0", half).unwrap();
    g
}

// ---------------------------------------------------------------------------
// Module shapes
// ---------------------------------------------------------------------------

#[test]
fn robot_defines_hardware_and_methods() {
    let out = generate(
        ModuleType::Robot,
        "robot",
        &robot_graph(),
        &DeclarationScope::new(),
        &GenerateOptions::default(),
    )
    .unwrap();

    let expected = "\
# Generated by blockbot. Do not edit.

from wpilib_placeholders import ExpansionHubMotor, OpModeRobot


class Robot(OpModeRobot):
    def __init__(self):
        super().__init__()
        self.define_hardware()

    def define_hardware(self):
        self.left_motor = ExpansionHubMotor(1)

    def drive(self, speed):
        self.fire_event(\"shoot\", speed)
";
    assert_eq!(out.python, expected);
    assert!(out.diagnostics.is_empty());
    assert_eq!(out.declarations.methods.len(), 1);
    assert_eq!(out.declarations.events[0].name, "shoot");
}

#[test]
fn opmode_has_decorators_and_handlers() {
    let out = generate(
        ModuleType::OpMode,
        "score_left",
        &opmode_graph(),
        &robot_scope(&["speed"]),
        &GenerateOptions::default(),
    )
    .unwrap();

    let expected = "\
# Generated by blockbot. Do not edit.

import time
from blocks_base_classes import Auto, Name
from wpilib_placeholders import PeriodicOpMode


@Auto
@Name(\"Score Left\")
class ScoreLeft(PeriodicOpMode):
    def __init__(self, robot):
        super().__init__(robot)
        self.robot = robot
        self.register_event_handlers()

    def register_event_handlers(self):
        self.robot.register_event_handler(\"shoot\", self._handle_robot_shoot)

    def _handle_robot_shoot(self, power):
        self.robot.drive(power)
        time.sleep(0.5)
";
    assert_eq!(out.python, expected);
    assert!(out.diagnostics.is_empty());
    let details = out.op_mode.unwrap();
    assert_eq!(details.name, "Score Left");
    assert!(details.enabled);
}

#[test]
fn empty_mechanism() {
    let out = generate(
        ModuleType::Mechanism,
        "arm",
        &BlockGraph::new(),
        &DeclarationScope::new(),
        &GenerateOptions::default(),
    )
    .unwrap();
    insta::assert_snapshot!(out.python, @r#"
# Generated by blockbot. Do not edit.

from blocks_base_classes import Mechanism


class Arm(Mechanism):
    def __init__(self):
        super().__init__()
        self.define_hardware()

    def define_hardware(self):
        pass
"#);
}

#[test]
fn disabled_opmode_has_no_type_decorator() {
    let mut g = opmode_graph();
    let details = g.blocks_of_kind(BlockKind::OpModeDetails)[0];
    g.set_field(details, field::ENABLED, "FALSE").unwrap();
    g.set_field(details, field::GROUP, "Scoring").unwrap();
    let out = generate(
        ModuleType::OpMode,
        "score_left",
        &g,
        &robot_scope(&["speed"]),
        &GenerateOptions::default(),
    )
    .unwrap();
    assert!(!out.python.contains("@Auto"));
    assert!(out.python.contains("@Name(\"Score Left\")\n@Group(\"Scoring\")\nclass ScoreLeft"));
    assert!(out.python.contains("from blocks_base_classes import Group, Name\n"));
}

// ---------------------------------------------------------------------------
// Consistency diagnostics
// ---------------------------------------------------------------------------

#[test]
fn arity_mismatch_pads_and_reports() {
    let out = generate(
        ModuleType::OpMode,
        "score_left",
        &opmode_graph(),
        &robot_scope(&["speed", "heading"]),
        &GenerateOptions::default(),
    )
    .unwrap();
    assert!(out.python.contains("        self.robot.drive(power, None)\n"));
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].severity, Severity::Warning);
    assert_eq!(
        out.diagnostics[0].message,
        "call to 'drive' passes 1 arguments but the declaration takes 2"
    );
}

#[test]
fn missing_declaration_still_generates() {
    let mut g = opmode_graph();
    let handler = g.blocks_of_kind(BlockKind::EventHandler)[0];
    let jump = g.add_block_with(BlockKind::MethodCall, call(CallTarget::Robot, "jump", &[], None));
    let last = *g.statement_stack(handler, input::STACK).last().unwrap();
    g.connect_next(last, jump).unwrap();

    let out = generate(
        ModuleType::OpMode,
        "score_left",
        &g,
        &robot_scope(&["speed"]),
        &GenerateOptions::default(),
    )
    .unwrap();
    assert!(out.python.contains("        self.robot.jump()\n"));
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].block, jump);
    assert_eq!(out.diagnostics[0].message, "Cannot find a declaration named 'jump'");
}

#[test]
fn bad_number_falls_back_to_zero() {
    let mut g = opmode_graph();
    let half = g.blocks_of_kind(BlockKind::Number)[0];
    g.set_field(half, field::NUM, "half").unwrap();
    let out = generate(
        ModuleType::OpMode,
        "score_left",
        &g,
        &robot_scope(&["speed"]),
        &GenerateOptions::default(),
    )
    .unwrap();
    assert!(out.python.contains("time.sleep(0)"));
    assert_eq!(out.diagnostics[0].to_string(), format!("warning: block {half}: 'half' is not a number"));
}

// ---------------------------------------------------------------------------
// Options and determinism
// ---------------------------------------------------------------------------

#[test]
fn indent_and_header_options() {
    let options = GenerateOptions {
        indent: 2,
        header: false,
    };
    let out = generate(ModuleType::Robot, "robot", &robot_graph(), &DeclarationScope::new(), &options).unwrap();
    assert!(out.python.starts_with("from wpilib_placeholders"));
    assert!(out.python.contains("\n  def drive(self, speed):\n    self.fire_event"));

    for indent in [0, 9] {
        let err = generate(
            ModuleType::Robot,
            "robot",
            &robot_graph(),
            &DeclarationScope::new(),
            &GenerateOptions { indent, header: true },
        )
        .unwrap_err();
        assert!(matches!(err, CodegenError::InvalidOptions(_)));
    }
}

#[test]
fn reloaded_graph_generates_identical_text() {
    let g = opmode_graph();
    let scope = robot_scope(&["speed"]);
    let first = generate(ModuleType::OpMode, "score_left", &g, &scope, &GenerateOptions::default()).unwrap();
    let reloaded = BlockGraph::from_serialized(&g.to_serialized()).unwrap();
    let second = generate(ModuleType::OpMode, "score_left", &reloaded, &scope, &GenerateOptions::default()).unwrap();
    assert_eq!(first.python, second.python);
}

#[test]
fn unknown_module_type_fails() {
    let err = generate(
        ModuleType::Unknown,
        "x",
        &BlockGraph::new(),
        &DeclarationScope::new(),
        &GenerateOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CodegenError::UnsupportedModuleType(ModuleType::Unknown)));
}

proptest! {
    #[test]
    fn every_method_is_defined(names in proptest::collection::vec("[a-z][a-z0-9 ]{0,8}", 0..6)) {
        let mut g = BlockGraph::new();
        for name in &names {
            let id = g.add_block(BlockKind::MethodDef);
            g.set_field(id, field::NAME, name).unwrap();
        }
        let a = generate(ModuleType::Mechanism, "arm", &g, &DeclarationScope::new(), &GenerateOptions::default()).unwrap();
        let b = generate(ModuleType::Mechanism, "arm", &g, &DeclarationScope::new(), &GenerateOptions::default()).unwrap();
        prop_assert_eq!(&a.python, &b.python);
        for name in &names {
            let def = format!("    def {}(self):\n        pass\n", blockbot_codegen::naming::python_identifier(name));
            prop_assert!(a.python.contains(&def));
        }
    }
}
