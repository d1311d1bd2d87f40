//! End-to-end lowering scenarios built directly against `IRFunction`/
//! `IRProgram`, bypassing the AST builder so each test pins down exactly
//! the textual shape `lower_program` is expected to emit.

use pretty_assertions::assert_eq;
use rstest::rstest;
use snow_backend::lower_program;
use snow_common::{ConstantValue, Width};
use snow_ir::{BinOp, CmpOp, IRFunction, IRProgram, Instruction, Operand};
use test_case::test_case;

#[test]
fn constant_return_emits_const_then_halt() {
    let mut func = IRFunction::new("main");
    let r0 = func.new_register();
    func.set_register_type(r0, "i32");
    func.add_instruction(Instruction::LoadConst {
        dest: r0,
        value: ConstantValue::I32(0),
    });
    func.add_instruction(Instruction::Return(Some(Operand::Reg(r0))));

    let mut program = IRProgram::new();
    program.add_function(func);
    let text = lower_program(&program).unwrap();

    assert_eq!(text, "PUSH_I32 0\nSTORE_I32 0\nLOAD_I32 0\nHALT");
}

#[test_case(Width::B8, "B8"; "byte move")]
#[test_case(Width::S16, "S16"; "short move")]
#[test_case(Width::I32, "I32"; "int move")]
#[test_case(Width::L64, "L64"; "long move")]
#[test_case(Width::F32, "F32"; "float move")]
#[test_case(Width::D64, "D64"; "double move")]
fn plus_zero_peephole_emits_mov_for_every_width(width: Width, suffix: &str) {
    let mut func = IRFunction::new("_start");
    let p0 = func.new_register();
    func.add_parameter(p0);
    func.set_register_type(p0, "i32");
    let dest = func.new_register();
    let zero = match width {
        Width::B8 => ConstantValue::B8(0),
        Width::S16 => ConstantValue::S16(0),
        Width::I32 => ConstantValue::I32(0),
        Width::L64 => ConstantValue::L64(0),
        Width::F32 => ConstantValue::F32(0.0),
        Width::D64 => ConstantValue::D64(0.0),
        _ => unreachable!("peephole matrix only covers numeric widths"),
    };
    func.add_instruction(Instruction::BinaryOp {
        op: BinOp::Add,
        width,
        dest,
        lhs: Operand::Reg(p0),
        rhs: Operand::Const(zero),
    });
    func.add_instruction(Instruction::Return(Some(Operand::Reg(dest))));

    let mut program = IRProgram::new();
    program.add_function(func);
    let text = lower_program(&program).unwrap();

    assert!(text.contains("MOV 1 0"));
    assert!(!text.contains(&format!("ADD_{suffix}")));
}

#[test]
fn void_call_emits_no_store_after_call() {
    let mut caller = IRFunction::new("_start");
    caller.add_instruction(Instruction::Call {
        dest: None,
        target: "f".to_string(),
        args: Default::default(),
    });
    caller.add_instruction(Instruction::Return(None));

    let mut callee = IRFunction::new("f");
    callee.add_instruction(Instruction::Return(None));

    let mut program = IRProgram::new();
    program.add_function(caller);
    program.add_function(callee);
    let text = lower_program(&program).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert!(lines[0].starts_with("CALL "));
    assert!(!lines[1].starts_with("STORE"));
}

#[test]
fn comparison_lowering_matches_spec_sequence() {
    let mut func = IRFunction::new("_start");
    let a = func.new_register();
    let b = func.new_register();
    func.add_parameter(a);
    func.add_parameter(b);
    func.set_register_type(a, "i32");
    func.set_register_type(b, "i32");
    let dest = func.new_register();
    func.add_instruction(Instruction::BinaryOp {
        op: BinOp::Cmp(CmpOp::Lt),
        width: Width::I32,
        dest,
        lhs: Operand::Reg(a),
        rhs: Operand::Reg(b),
    });
    func.add_instruction(Instruction::Return(Some(Operand::Reg(dest))));

    let mut program = IRProgram::new();
    program.add_function(func);
    let text = lower_program(&program).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    // LOAD a, LOAD b, CMP_ILT -> true, PUSH_I32 0, JUMP -> end, PUSH_I32 1, STORE dest
    assert_eq!(lines[0], "LOAD_I32 0");
    assert_eq!(lines[1], "LOAD_I32 1");
    assert!(lines[2].starts_with("CMP_ILT "));
    assert_eq!(lines[3], "PUSH_I32 0");
    assert!(lines[4].starts_with("JUMP "));
    assert_eq!(lines[5], "PUSH_I32 1");
    assert_eq!(lines[6], "STORE_I32 2");

    let true_addr: usize = lines[2].rsplit(' ').next().unwrap().parse().unwrap();
    assert_eq!(true_addr, 5);
    let end_addr: usize = lines[4].rsplit(' ').next().unwrap().parse().unwrap();
    assert_eq!(end_addr, 6);
}

#[rstest]
#[case(CmpOp::Eq, "CMP_IEQ")]
#[case(CmpOp::Ne, "CMP_INE")]
#[case(CmpOp::Gt, "CMP_IGT")]
#[case(CmpOp::Le, "CMP_ILE")]
fn comparison_value_dance_uses_the_requested_opcode(#[case] cmp: CmpOp, #[case] expected_opcode: &str) {
    let mut func = IRFunction::new("_start");
    let a = func.new_register();
    let b = func.new_register();
    func.add_parameter(a);
    func.add_parameter(b);
    func.set_register_type(a, "i32");
    func.set_register_type(b, "i32");
    let dest = func.new_register();
    func.add_instruction(Instruction::BinaryOp {
        op: BinOp::Cmp(cmp),
        width: Width::I32,
        dest,
        lhs: Operand::Reg(a),
        rhs: Operand::Reg(b),
    });
    func.add_instruction(Instruction::Return(Some(Operand::Reg(dest))));

    let mut program = IRProgram::new();
    program.add_function(func);
    let text = lower_program(&program).unwrap();

    assert!(text.contains(expected_opcode));
}
