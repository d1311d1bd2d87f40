//! Reverses `snow_ir::opcode`'s mnemonic-generation conventions back into a
//! dispatchable shape. The decoder only ever looks at the first
//! whitespace-delimited token of a line as the opcode; everything after it
//! is handed to the instruction's own operand grammar unparsed, since
//! `PUSH_R`'s literal can itself contain whitespace (quoted strings, array
//! elements).

use snow_common::Width;

use crate::error::FaultKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Push(Width),
    Load(Width),
    Store(Width),
    Binary(&'static str, Width),
    Unary(&'static str, Width),
    Compare(&'static str, Width),
    Convert(Width, Width),
    Mov,
    Jump,
    Call,
    Ret,
    Halt,
    Syscall,
    Pop,
    Dup,
    Swap,
}

/// Splits `line` into its opcode token and the raw, unparsed remainder.
pub fn split_opcode(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.split_once(char::is_whitespace) {
        Some((op, rest)) => Some((op, rest.trim_start())),
        None => Some((trimmed, "")),
    }
}

fn width_from_suffix(s: &str) -> Option<Width> {
    match s {
        "B8" => Some(Width::B8),
        "S16" => Some(Width::S16),
        "I32" => Some(Width::I32),
        "L64" => Some(Width::L64),
        "F32" => Some(Width::F32),
        "D64" => Some(Width::D64),
        "R" => Some(Width::Ref),
        _ => None,
    }
}

fn width_from_tag(c: char) -> Option<Width> {
    match c {
        'B' => Some(Width::B8),
        'S' => Some(Width::S16),
        'I' => Some(Width::I32),
        'L' => Some(Width::L64),
        'F' => Some(Width::F32),
        'D' => Some(Width::D64),
        'R' => Some(Width::Ref),
        _ => None,
    }
}

const BINARY_MNEMONICS: [&str; 8] = ["ADD", "SUB", "MUL", "DIV", "MOD", "AND", "OR", "XOR"];
const UNARY_MNEMONICS: [&str; 2] = ["NEG", "INC"];
const CMP_CODES: [&str; 6] = ["EQ", "NE", "GT", "GE", "LT", "LE"];

pub fn classify(opcode: &str) -> Result<OpKind, FaultKind> {
    match opcode {
        "MOV" => return Ok(OpKind::Mov),
        "JUMP" => return Ok(OpKind::Jump),
        "CALL" => return Ok(OpKind::Call),
        "RET" => return Ok(OpKind::Ret),
        "HALT" => return Ok(OpKind::Halt),
        "SYSCALL" => return Ok(OpKind::Syscall),
        "POP" => return Ok(OpKind::Pop),
        "DUP" => return Ok(OpKind::Dup),
        "SWAP" => return Ok(OpKind::Swap),
        _ => {}
    }

    if let Some(suffix) = opcode.strip_prefix("PUSH_") {
        let w = width_from_suffix(suffix).ok_or_else(|| unknown(opcode))?;
        return Ok(OpKind::Push(w));
    }
    if let Some(suffix) = opcode.strip_prefix("LOAD_") {
        let w = width_from_suffix(suffix).ok_or_else(|| unknown(opcode))?;
        return Ok(OpKind::Load(w));
    }
    if let Some(suffix) = opcode.strip_prefix("STORE_") {
        let w = width_from_suffix(suffix).ok_or_else(|| unknown(opcode))?;
        return Ok(OpKind::Store(w));
    }

    if let Some(rest) = opcode.strip_prefix("CMP_") {
        let mut chars = rest.chars();
        let tag = chars.next().ok_or_else(|| unknown(opcode))?;
        let code: String = chars.collect();
        let width = width_from_tag(tag).ok_or_else(|| unknown(opcode))?;
        let matched = CMP_CODES.iter().find(|c| **c == code).ok_or_else(|| unknown(opcode))?;
        return Ok(OpKind::Compare(matched, width));
    }

    for mnemonic in BINARY_MNEMONICS {
        if let Some(suffix) = opcode.strip_prefix(mnemonic).and_then(|s| s.strip_prefix('_')) {
            let w = width_from_suffix(suffix).ok_or_else(|| unknown(opcode))?;
            return Ok(OpKind::Binary(mnemonic, w));
        }
    }
    for mnemonic in UNARY_MNEMONICS {
        if let Some(suffix) = opcode.strip_prefix(mnemonic).and_then(|s| s.strip_prefix('_')) {
            let w = width_from_suffix(suffix).ok_or_else(|| unknown(opcode))?;
            return Ok(OpKind::Unary(mnemonic, w));
        }
    }

    // `<Src>2<Dst>` conversions, e.g. "I2L".
    if opcode.len() == 3 {
        let mut chars = opcode.chars();
        let from = chars.next().unwrap();
        let mid = chars.next().unwrap();
        let to = chars.next().unwrap();
        if mid == '2' {
            if let (Some(from), Some(to)) = (width_from_tag(from), width_from_tag(to)) {
                return Ok(OpKind::Convert(from, to));
            }
        }
    }

    Err(unknown(opcode))
}

fn unknown(opcode: &str) -> FaultKind {
    FaultKind::UnknownOpcode(opcode.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn splits_opcode_from_operands() {
        assert_eq!(split_opcode("MOV 1 0"), Some(("MOV", "1 0")));
        assert_eq!(split_opcode("HALT"), Some(("HALT", "")));
    }

    #[test_case("PUSH_B8", OpKind::Push(Width::B8); "push byte")]
    #[test_case("PUSH_I32", OpKind::Push(Width::I32); "push int")]
    #[test_case("LOAD_L64", OpKind::Load(Width::L64); "load long")]
    #[test_case("STORE_F32", OpKind::Store(Width::F32); "store float")]
    #[test_case("STORE_R", OpKind::Store(Width::Ref); "store ref")]
    fn classifies_push_load_store(opcode: &str, expected: OpKind) {
        assert_eq!(classify(opcode).unwrap(), expected);
    }

    #[test]
    fn classifies_binary_and_unary() {
        assert_eq!(classify("ADD_I32").unwrap(), OpKind::Binary("ADD", Width::I32));
        assert_eq!(classify("NEG_D64").unwrap(), OpKind::Unary("NEG", Width::D64));
    }

    #[test]
    fn classifies_comparison() {
        assert_eq!(classify("CMP_ILT").unwrap(), OpKind::Compare("LT", Width::I32));
        assert_eq!(classify("CMP_REQ").unwrap(), OpKind::Compare("EQ", Width::Ref));
    }

    #[test]
    fn classifies_conversion() {
        assert_eq!(classify("I2L").unwrap(), OpKind::Convert(Width::I32, Width::L64));
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        assert!(matches!(classify("NOPE"), Err(FaultKind::UnknownOpcode(_))));
    }

    #[test]
    fn flow_and_system_opcodes() {
        assert_eq!(classify("JUMP").unwrap(), OpKind::Jump);
        assert_eq!(classify("CALL").unwrap(), OpKind::Call);
        assert_eq!(classify("RET").unwrap(), OpKind::Ret);
        assert_eq!(classify("HALT").unwrap(), OpKind::Halt);
        assert_eq!(classify("SYSCALL").unwrap(), OpKind::Syscall);
    }
}
