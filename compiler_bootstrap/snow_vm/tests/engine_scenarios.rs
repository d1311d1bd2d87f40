//! End-to-end scenarios run directly against hand-assembled VM text,
//! exercising `Engine::run()` rather than just inspecting lowered text.

use rstest::rstest;
use snow_vm::{loader::parse_program, Engine, Value, VmConfig};

fn run(text: &str) -> Option<Value> {
    let program = parse_program(text);
    let mut engine = Engine::new(program, VmConfig::default());
    engine.run().unwrap()
}

#[test]
fn factorial_via_loop_returns_720_for_six() {
    let text = "\
PUSH_I32 6
CALL 3 1
HALT
PUSH_I32 1
STORE_I32 1
PUSH_I32 1
STORE_I32 2
LOAD_I32 2
LOAD_I32 0
CMP_IGT 19
LOAD_I32 1
LOAD_I32 2
MUL_I32
STORE_I32 1
LOAD_I32 2
PUSH_I32 1
ADD_I32
STORE_I32 2
JUMP 7
LOAD_I32 1
RET";
    assert_eq!(run(text), Some(Value::I32(720)));
}

#[test]
fn cross_module_constant_plus_one_yields_forty_three() {
    let text = "PUSH_I32 42\nPUSH_I32 1\nADD_I32\nHALT";
    assert_eq!(run(text), Some(Value::I32(43)));
}

#[test]
fn reference_addition_disambiguates_string_plus_int() {
    let text = "PUSH_R \"foo\"\nPUSH_I32 1\nADD_R\nHALT";
    assert_eq!(run(text), Some(Value::Str("foo1".to_string())));
}

#[test]
fn call_with_void_return_leaves_no_extra_stack_value() {
    let text = "\
CALL 2 0
HALT
RET";
    let program = parse_program(text);
    let mut engine = Engine::new(program, VmConfig::default());
    let result = engine.run().unwrap();
    assert_eq!(result, None);
}

#[test]
fn comparison_with_a_less_than_b_stores_one() {
    let text = "\
PUSH_I32 3
PUSH_I32 5
CMP_ILT 5
PUSH_I32 0
JUMP 6
PUSH_I32 1
HALT";
    assert_eq!(run(text), Some(Value::I32(1)));
}

#[test]
fn comparison_with_a_greater_than_b_stores_zero() {
    let text = "\
PUSH_I32 5
PUSH_I32 3
CMP_ILT 5
PUSH_I32 0
JUMP 6
PUSH_I32 1
HALT";
    assert_eq!(run(text), Some(Value::I32(0)));
}

#[test]
fn pop_on_empty_stack_is_stack_underflow() {
    let program = parse_program("POP\nHALT");
    let mut engine = Engine::new(program, VmConfig::default());
    assert!(matches!(engine.run(), Err(snow_vm::FaultKind::StackUnderflow)));
}

#[rstest]
#[case("B8", "5", "3", Value::B8(8))]
#[case("S16", "5", "3", Value::S16(8))]
#[case("I32", "5", "3", Value::I32(8))]
#[case("L64", "5", "3", Value::L64(8))]
#[case("F32", "2.5", "1.5", Value::F32(4.0))]
#[case("D64", "2.5", "1.5", Value::D64(4.0))]
fn add_opcode_family_is_consistent_across_every_width(
    #[case] suffix: &str,
    #[case] lhs: &str,
    #[case] rhs: &str,
    #[case] expected: Value,
) {
    let text = format!("PUSH_{suffix} {lhs}\nPUSH_{suffix} {rhs}\nADD_{suffix}\nHALT");
    assert_eq!(run(&text), Some(expected));
}

#[test]
fn call_stack_limit_triggers_stack_overflow() {
    // A function that immediately calls itself; the recursion must be
    // caught by the configured depth limit rather than overflowing the
    // host stack.
    let text = "CALL 0 0\nHALT";
    let program = parse_program(text);
    let mut config = VmConfig::default();
    config.call_stack_limit = 8;
    let mut engine = Engine::new(program, config);
    assert!(matches!(engine.run(), Err(snow_vm::FaultKind::StackOverflow(8))));
}
