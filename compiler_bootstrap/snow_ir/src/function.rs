use std::fmt;

use indexmap::IndexMap;

use crate::instruction::Instruction;
use crate::register::VReg;

/// A single IR function: a name, an ordered parameter list (pre-assigned
/// registers `0..k-1`), a sequential instruction body, a register counter,
/// and a register-to-source-type map the backend uses to pick load/store
/// widths. Mutated only during building; read-only once handed to the
/// backend.
#[derive(Debug, Clone)]
pub struct IRFunction {
    pub name: String,
    pub params: Vec<VReg>,
    pub body: Vec<Instruction>,
    next_register: u32,
    register_types: IndexMap<VReg, String>,
}

impl IRFunction {
    pub fn new(name: impl Into<String>) -> Self {
        IRFunction {
            name: name.into(),
            params: Vec::new(),
            body: Vec::new(),
            next_register: 0,
            register_types: IndexMap::new(),
        }
    }

    /// Returns a fresh virtual register; the counter increases monotonically
    /// and is never reused, preserving SSA identity.
    pub fn new_register(&mut self) -> VReg {
        let id = self.next_register;
        self.next_register += 1;
        VReg(id)
    }

    /// Appends `vr` to the parameter list in declaration order. Callers are
    /// expected to have obtained `vr` from `new_register` immediately before
    /// so that parameter registers land on ids `0..k-1`.
    pub fn add_parameter(&mut self, vr: VReg) {
        self.params.push(vr);
    }

    pub fn add_instruction(&mut self, inst: Instruction) {
        self.body.push(inst);
    }

    /// Attaches a source-language type hint to `vr`. Setting an empty name
    /// removes the hint (used for void-typed registers).
    pub fn set_register_type(&mut self, vr: VReg, type_name: impl Into<String>) {
        let type_name = type_name.into();
        if type_name.is_empty() {
            self.register_types.shift_remove(&vr);
        } else {
            self.register_types.insert(vr, type_name);
        }
    }

    pub fn register_type(&self, vr: VReg) -> Option<&str> {
        self.register_types.get(&vr).map(String::as_str)
    }

    pub fn register_count(&self) -> u32 {
        self.next_register
    }

    /// Every virtual register appearing as a destination must appear so in
    /// exactly one instruction; parameters count as their own unique
    /// definition. Returns the first register violating that, if any.
    pub fn find_ssa_violation(&self) -> Option<VReg> {
        let mut seen: IndexMap<VReg, u32> = IndexMap::new();
        for &p in &self.params {
            *seen.entry(p).or_insert(0) += 1;
        }
        for inst in &self.body {
            if let Some(d) = inst.dest() {
                *seen.entry(d).or_insert(0) += 1;
            }
        }
        seen.into_iter().find(|(_, count)| *count > 1).map(|(r, _)| r)
    }
}

impl fmt::Display for IRFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "func {}({params}) {{", self.name)?;
        for inst in &self.body {
            writeln!(f, "  {inst}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::BinOp;
    use crate::Operand;
    use snow_common::{ConstantValue, Width};

    #[test]
    fn new_register_is_monotonic_and_parameters_precede_body() {
        let mut func = IRFunction::new("fact");
        let p0 = func.new_register();
        func.add_parameter(p0);
        assert_eq!(p0, VReg(0));
        let r1 = func.new_register();
        assert_eq!(r1, VReg(1));
        assert_eq!(func.register_count(), 2);
    }

    #[test]
    fn display_matches_spec_textual_form() {
        use pretty_assertions::assert_eq;
        let mut func = IRFunction::new("name");
        let p0 = func.new_register();
        let p1 = func.new_register();
        func.add_parameter(p0);
        func.add_parameter(p1);
        let r2 = func.new_register();
        func.add_instruction(Instruction::LoadConst {
            dest: r2,
            value: ConstantValue::I32(6),
        });
        let r3 = func.new_register();
        func.add_instruction(Instruction::BinaryOp {
            op: BinOp::Add,
            width: Width::L64,
            dest: r3,
            lhs: Operand::Reg(p0),
            rhs: Operand::Reg(p1),
        });
        func.add_instruction(Instruction::Return(Some(Operand::Reg(r3))));

        let expected = "func name(%0, %1) {\n  %2 = CONST 6\n  %3 = ADD_L64 %0, %1\n  RET %3\n}";
        assert_eq!(func.to_string(), expected);
    }

    #[test]
    fn detects_double_definition() {
        let mut func = IRFunction::new("bad");
        let r0 = func.new_register();
        func.add_instruction(Instruction::LoadConst {
            dest: r0,
            value: ConstantValue::I32(1),
        });
        func.add_instruction(Instruction::LoadConst {
            dest: r0,
            value: ConstantValue::I32(2),
        });
        assert_eq!(func.find_ssa_violation(), Some(r0));
    }
}
