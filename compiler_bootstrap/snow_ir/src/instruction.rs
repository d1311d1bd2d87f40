use std::fmt;

use smallvec::SmallVec;
use snow_common::{ConstantValue, Width};

use crate::opcode::{binary_opcode_name, unary_opcode_name, BinOp, CmpOp, UnOp};
use crate::register::{Label, VReg};

/// An instruction operand: either a virtual register defined earlier in the
/// same function (or the parameter prefix) or an interned constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Reg(VReg),
    Const(ConstantValue),
}

impl Operand {
    pub fn width(&self, reg_type: impl FnOnce(VReg) -> Option<Width>) -> Option<Width> {
        match self {
            Operand::Reg(r) => reg_type(*r),
            Operand::Const(c) => Some(c.width()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{r}"),
            Operand::Const(c) => write!(f, "{c}"),
        }
    }
}

/// A single IR instruction. Every variant exposes an implicit opcode (via
/// its own fields), an optional destination register, and an ordered list
/// of operands, per §3's abstract instruction model.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    LoadConst {
        dest: VReg,
        value: ConstantValue,
    },
    BinaryOp {
        op: BinOp,
        width: Width,
        dest: VReg,
        lhs: Operand,
        rhs: Operand,
    },
    UnaryOp {
        op: UnOp,
        width: Width,
        dest: VReg,
        src: Operand,
    },
    Call {
        dest: Option<VReg>,
        target: String,
        args: SmallVec<[Operand; 4]>,
    },
    Label(Label),
    Jump(Label),
    CompareJump {
        op: CmpOp,
        width: Width,
        lhs: Operand,
        rhs: Operand,
        target: Label,
    },
    Return(Option<Operand>),
}

impl Instruction {
    /// The destination register this instruction defines, if any. Used by
    /// the SSA-uniqueness check and by the backend's slot allocator.
    pub fn dest(&self) -> Option<VReg> {
        match self {
            Instruction::LoadConst { dest, .. } => Some(*dest),
            Instruction::BinaryOp { dest, .. } => Some(*dest),
            Instruction::UnaryOp { dest, .. } => Some(*dest),
            Instruction::Call { dest, .. } => *dest,
            _ => None,
        }
    }

    /// All register operands this instruction reads, in left-to-right
    /// order. Used by the allocator and by validation.
    pub fn operand_registers(&self) -> SmallVec<[VReg; 4]> {
        let mut out = SmallVec::new();
        let mut push = |op: &Operand| {
            if let Operand::Reg(r) = op {
                out.push(*r);
            }
        };
        match self {
            Instruction::BinaryOp { lhs, rhs, .. } => {
                push(lhs);
                push(rhs);
            }
            Instruction::UnaryOp { src, .. } => push(src),
            Instruction::Call { args, .. } => args.iter().for_each(|a| push(a)),
            Instruction::CompareJump { lhs, rhs, .. } => {
                push(lhs);
                push(rhs);
            }
            Instruction::Return(Some(v)) => push(v),
            _ => {}
        }
        out
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::LoadConst { dest, value } => write!(f, "{dest} = CONST {value}"),
            Instruction::BinaryOp {
                op,
                width,
                dest,
                lhs,
                rhs,
            } => write!(f, "{dest} = {} {lhs}, {rhs}", binary_opcode_name(*op, *width)),
            Instruction::UnaryOp {
                op,
                width,
                dest,
                src,
            } => write!(f, "{dest} = {} {src}", unary_opcode_name(*op, *width)),
            Instruction::Call { dest, target, args } => {
                let arglist = args
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                match dest {
                    Some(d) if arglist.is_empty() => write!(f, "{d} = CALL {target}"),
                    Some(d) => write!(f, "{d} = CALL {target}, {arglist}"),
                    None if arglist.is_empty() => write!(f, "CALL {target}"),
                    None => write!(f, "CALL {target}, {arglist}"),
                }
            }
            Instruction::Label(l) => write!(f, "LABEL {l}:"),
            Instruction::Jump(l) => write!(f, "JUMP {l}"),
            Instruction::CompareJump {
                op,
                width,
                lhs,
                rhs,
                target,
            } => write!(
                f,
                "IF-CMP-{}{} {lhs}, {rhs} GOTO {target}",
                width.tag(),
                op.code()
            ),
            Instruction::Return(None) => write!(f, "RET"),
            Instruction::Return(Some(v)) => write!(f, "RET {v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_spec_example() {
        let inst = Instruction::BinaryOp {
            op: BinOp::Add,
            width: Width::L64,
            dest: VReg(3),
            lhs: Operand::Reg(VReg(0)),
            rhs: Operand::Reg(VReg(1)),
        };
        assert_eq!(inst.to_string(), "%3 = ADD_L64 %0, %1");
    }

    #[test]
    fn display_const() {
        let inst = Instruction::LoadConst {
            dest: VReg(2),
            value: ConstantValue::I32(6),
        };
        assert_eq!(inst.to_string(), "%2 = CONST 6");
    }

    #[test]
    fn operand_registers_collects_reads_not_writes() {
        let inst = Instruction::BinaryOp {
            op: BinOp::Add,
            width: Width::I32,
            dest: VReg(2),
            lhs: Operand::Reg(VReg(0)),
            rhs: Operand::Const(ConstantValue::I32(0)),
        };
        assert_eq!(inst.operand_registers().as_slice(), &[VReg(0)]);
        assert_eq!(inst.dest(), Some(VReg(2)));
    }
}
