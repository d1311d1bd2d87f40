use serde::{Deserialize, Serialize};
use std::fmt;

/// Element width/kind for IR constants, register-type annotations and VM
/// slot tags. Ordered for numeric promotion: `D > F > L > I > S > B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Width {
    B8,
    S16,
    I32,
    L64,
    F32,
    D64,
    Bool,
    Str,
    Ref,
    List,
}

impl Width {
    /// Single-letter slot-type tag used by the backend and VM (`I/L/S/B/F/D/R`).
    pub fn tag(self) -> char {
        match self {
            Width::B8 => 'B',
            Width::S16 => 'S',
            Width::I32 => 'I',
            Width::L64 => 'L',
            Width::F32 => 'F',
            Width::D64 => 'D',
            Width::Bool => 'I', // booleans travel as ints on the operand stack
            Width::Str | Width::Ref | Width::List => 'R',
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Width::B8 | Width::S16 | Width::I32 | Width::L64 | Width::F32 | Width::D64
        )
    }

    /// Rank in the `D > F > L > I > S > B` promotion order. Only meaningful
    /// for numeric widths.
    fn numeric_rank(self) -> u8 {
        match self {
            Width::B8 => 0,
            Width::S16 => 1,
            Width::I32 => 2,
            Width::L64 => 3,
            Width::F32 => 4,
            Width::D64 => 5,
            _ => u8::MAX,
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Widen two numeric widths to their common promoted type, following
/// `D > F > L > I > S > B`. Reference-typed operands (`Str`/`Ref`/`List`)
/// promote to `Width::Ref` — the reference-addition path never goes through
/// numeric promotion.
pub fn widen(a: Width, b: Width) -> Width {
    if !a.is_numeric() || !b.is_numeric() {
        return Width::Ref;
    }
    if a.numeric_rank() >= b.numeric_rank() {
        a
    } else {
        b
    }
}

/// A tagged IR constant. Carries its own `Width` so downstream emission
/// preserves integer width and float-vs-double distinction exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    B8(i8),
    S16(i16),
    I32(i32),
    L64(i64),
    F32(f32),
    D64(f64),
    Bool(bool),
    Str(String),
    List(Vec<ConstantValue>),
}

impl ConstantValue {
    pub fn width(&self) -> Width {
        match self {
            ConstantValue::B8(_) => Width::B8,
            ConstantValue::S16(_) => Width::S16,
            ConstantValue::I32(_) => Width::I32,
            ConstantValue::L64(_) => Width::L64,
            ConstantValue::F32(_) => Width::F32,
            ConstantValue::D64(_) => Width::D64,
            ConstantValue::Bool(_) => Width::Bool,
            ConstantValue::Str(_) => Width::Str,
            ConstantValue::List(_) => Width::List,
        }
    }

    /// `true` when this constant is the numeric zero of its own width —
    /// the trigger condition for the backend's `ADD 0 -> MOV` peephole.
    pub fn is_numeric_zero(&self) -> bool {
        match self {
            ConstantValue::B8(v) => *v == 0,
            ConstantValue::S16(v) => *v == 0,
            ConstantValue::I32(v) => *v == 0,
            ConstantValue::L64(v) => *v == 0,
            ConstantValue::F32(v) => *v == 0.0,
            ConstantValue::D64(v) => *v == 0.0,
            _ => false,
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::B8(v) => write!(f, "{v}b"),
            ConstantValue::S16(v) => write!(f, "{v}s"),
            ConstantValue::I32(v) => write!(f, "{v}"),
            ConstantValue::L64(v) => write!(f, "{v}L"),
            ConstantValue::F32(v) => write!(f, "{v}f"),
            ConstantValue::D64(v) => write!(f, "{v}"),
            ConstantValue::Bool(v) => write!(f, "{v}"),
            ConstantValue::Str(v) => write!(f, "{v:?}"),
            ConstantValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Width::I32, Width::L64, Width::L64; "int widens to long")]
    #[test_case(Width::D64, Width::F32, Width::D64; "double beats float")]
    #[test_case(Width::B8, Width::S16, Width::S16; "byte widens to short")]
    #[test_case(Width::L64, Width::L64, Width::L64; "identical widths are stable")]
    #[test_case(Width::S16, Width::B8, Width::S16; "order of arguments does not matter")]
    fn widen_follows_documented_order(a: Width, b: Width, expected: Width) {
        assert_eq!(widen(a, b), expected);
    }

    #[test]
    fn widen_of_reference_is_ref() {
        assert_eq!(widen(Width::Str, Width::I32), Width::Ref);
        assert_eq!(widen(Width::I32, Width::Str), Width::Ref);
    }

    #[test]
    fn zero_detection_is_per_numeric_width() {
        assert!(ConstantValue::I32(0).is_numeric_zero());
        assert!(ConstantValue::D64(0.0).is_numeric_zero());
        assert!(!ConstantValue::I32(1).is_numeric_zero());
        assert!(!ConstantValue::Bool(false).is_numeric_zero());
    }

    #[test]
    fn display_renders_each_suffixed_form() {
        use pretty_assertions::assert_eq;
        let rendered = format!(
            "{}\n{}\n{}\n{}",
            ConstantValue::L64(7),
            ConstantValue::F32(1.5),
            ConstantValue::B8(-2),
            ConstantValue::List(vec![ConstantValue::I32(1), ConstantValue::I32(2)]),
        );
        assert_eq!(rendered, "7L\n1.5f\n-2b\n[1, 2]");
    }
}
