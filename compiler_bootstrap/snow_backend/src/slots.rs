use indexmap::IndexMap;
use snow_ir::{IRFunction, VReg};

/// Assigns every virtual register in `func` a flat local-variable slot
/// number. Parameters claim slots `0..k-1` in declaration order (mirroring
/// how the VM's call frame already lays out argument locals), then every
/// remaining register is assigned the next free slot the first time it
/// appears as an instruction destination, in program order. This is a
/// linear scan, not a liveness-based allocator: registers are never
/// reused, trading slot-count compactness for a direct, easy-to-audit
/// mapping from SSA name to storage location.
pub fn allocate_slots(func: &IRFunction) -> IndexMap<VReg, u32> {
    let mut slots = IndexMap::new();
    let mut next = 0u32;

    for &p in &func.params {
        slots.entry(p).or_insert_with(|| {
            let s = next;
            next += 1;
            s
        });
    }

    for inst in &func.body {
        if let Some(dest) = inst.dest() {
            slots.entry(dest).or_insert_with(|| {
                let s = next;
                next += 1;
                s
            });
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use snow_common::ConstantValue;
    use snow_ir::Instruction;

    #[test]
    fn parameters_claim_the_lowest_slots() {
        let mut func = IRFunction::new("f");
        let p0 = func.new_register();
        let p1 = func.new_register();
        func.add_parameter(p0);
        func.add_parameter(p1);
        let r2 = func.new_register();
        func.add_instruction(Instruction::LoadConst {
            dest: r2,
            value: ConstantValue::I32(1),
        });
        let slots = allocate_slots(&func);
        assert_eq!(slots.get(&p0), Some(&0));
        assert_eq!(slots.get(&p1), Some(&1));
        assert_eq!(slots.get(&r2), Some(&2));
    }
}
