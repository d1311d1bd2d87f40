//! Runtime stack values and the pure arithmetic/comparison functions the
//! engine's typed handlers delegate to. Reuses `snow_common::ConstantValue`
//! as the tagged value union (`{B8,S16,I32,L64,F32,D64,Bool,Str,List}`) so
//! the same type the backend pins widths with also carries runtime values
//! through the stack, rather than a second parallel enum.

use snow_common::ConstantValue;

use crate::error::{FaultKind, VmResult};

pub type Value = ConstantValue;

fn type_name(v: &Value) -> String {
    format!("{:?}", v.width())
}

fn mismatch(expected: &str, v: &Value) -> FaultKind {
    FaultKind::TypeMismatch {
        expected: expected.to_string(),
        found: type_name(v),
    }
}

/// `left OP right` for the numeric typed-arithmetic family (`ADD_*`
/// through `XOR_*`). Both operands are expected to already carry the
/// instruction's declared width; overflow wraps two's-complement for
/// integers and follows IEEE-754 for floats, per spec.
pub fn binary_numeric(op: &str, left: Value, right: Value) -> VmResult<Value> {
    use ConstantValue::*;
    Ok(match (op, left, right) {
        ("ADD", B8(a), B8(b)) => B8(a.wrapping_add(b)),
        ("ADD", S16(a), S16(b)) => S16(a.wrapping_add(b)),
        ("ADD", I32(a), I32(b)) => I32(a.wrapping_add(b)),
        ("ADD", L64(a), L64(b)) => L64(a.wrapping_add(b)),
        ("ADD", F32(a), F32(b)) => F32(a + b),
        ("ADD", D64(a), D64(b)) => D64(a + b),

        ("SUB", B8(a), B8(b)) => B8(a.wrapping_sub(b)),
        ("SUB", S16(a), S16(b)) => S16(a.wrapping_sub(b)),
        ("SUB", I32(a), I32(b)) => I32(a.wrapping_sub(b)),
        ("SUB", L64(a), L64(b)) => L64(a.wrapping_sub(b)),
        ("SUB", F32(a), F32(b)) => F32(a - b),
        ("SUB", D64(a), D64(b)) => D64(a - b),

        ("MUL", B8(a), B8(b)) => B8(a.wrapping_mul(b)),
        ("MUL", S16(a), S16(b)) => S16(a.wrapping_mul(b)),
        ("MUL", I32(a), I32(b)) => I32(a.wrapping_mul(b)),
        ("MUL", L64(a), L64(b)) => L64(a.wrapping_mul(b)),
        ("MUL", F32(a), F32(b)) => F32(a * b),
        ("MUL", D64(a), D64(b)) => D64(a * b),

        ("DIV", B8(a), B8(b)) => B8(checked_div(a, b)?),
        ("DIV", S16(a), S16(b)) => S16(checked_div(a, b)?),
        ("DIV", I32(a), I32(b)) => I32(checked_div(a, b)?),
        ("DIV", L64(a), L64(b)) => L64(checked_div(a, b)?),
        ("DIV", F32(a), F32(b)) => F32(a / b),
        ("DIV", D64(a), D64(b)) => D64(a / b),

        ("MOD", B8(a), B8(b)) => B8(checked_rem(a, b)?),
        ("MOD", S16(a), S16(b)) => S16(checked_rem(a, b)?),
        ("MOD", I32(a), I32(b)) => I32(checked_rem(a, b)?),
        ("MOD", L64(a), L64(b)) => L64(checked_rem(a, b)?),
        ("MOD", F32(a), F32(b)) => F32(a % b),
        ("MOD", D64(a), D64(b)) => D64(a % b),

        ("AND", B8(a), B8(b)) => B8(a & b),
        ("AND", S16(a), S16(b)) => S16(a & b),
        ("AND", I32(a), I32(b)) => I32(a & b),
        ("AND", L64(a), L64(b)) => L64(a & b),

        ("OR", B8(a), B8(b)) => B8(a | b),
        ("OR", S16(a), S16(b)) => S16(a | b),
        ("OR", I32(a), I32(b)) => I32(a | b),
        ("OR", L64(a), L64(b)) => L64(a | b),

        ("XOR", B8(a), B8(b)) => B8(a ^ b),
        ("XOR", S16(a), S16(b)) => S16(a ^ b),
        ("XOR", I32(a), I32(b)) => I32(a ^ b),
        ("XOR", L64(a), L64(b)) => L64(a ^ b),

        (op, a, b) => {
            return Err(FaultKind::TypeMismatch {
                expected: format!("matching numeric operands for {op}"),
                found: format!("{:?} / {:?}", a.width(), b.width()),
            })
        }
    })
}

fn checked_div<T>(a: T, b: T) -> VmResult<T>
where
    T: num_integer_like::WrappingDiv,
{
    if b.is_zero() {
        return Err(FaultKind::DivisionByZero);
    }
    Ok(a.wrapping_div(b))
}

fn checked_rem<T>(a: T, b: T) -> VmResult<T>
where
    T: num_integer_like::WrappingDiv,
{
    if b.is_zero() {
        return Err(FaultKind::DivisionByZero);
    }
    Ok(a.wrapping_rem(b))
}

/// Tiny local trait so `checked_div`/`checked_rem` work uniformly over
/// `i8`/`i16`/`i32`/`i64` without pulling in the `num` crate for two methods.
mod num_integer_like {
    pub trait WrappingDiv: Copy {
        fn is_zero(self) -> bool;
        fn wrapping_div(self, rhs: Self) -> Self;
        fn wrapping_rem(self, rhs: Self) -> Self;
    }

    macro_rules! impl_wrapping_div {
        ($($t:ty),*) => {
            $(impl WrappingDiv for $t {
                fn is_zero(self) -> bool { self == 0 }
                fn wrapping_div(self, rhs: Self) -> Self { <$t>::wrapping_div(self, rhs) }
                fn wrapping_rem(self, rhs: Self) -> Self { <$t>::wrapping_rem(self, rhs) }
            })*
        };
    }
    impl_wrapping_div!(i8, i16, i32, i64);
}

/// `NEG`/`INC` typed unary family.
pub fn unary_numeric(op: &str, v: Value) -> VmResult<Value> {
    use ConstantValue::*;
    Ok(match (op, v) {
        ("NEG", B8(a)) => B8(a.wrapping_neg()),
        ("NEG", S16(a)) => S16(a.wrapping_neg()),
        ("NEG", I32(a)) => I32(a.wrapping_neg()),
        ("NEG", L64(a)) => L64(a.wrapping_neg()),
        ("NEG", F32(a)) => F32(-a),
        ("NEG", D64(a)) => D64(-a),

        ("INC", B8(a)) => B8(a.wrapping_add(1)),
        ("INC", S16(a)) => S16(a.wrapping_add(1)),
        ("INC", I32(a)) => I32(a.wrapping_add(1)),
        ("INC", L64(a)) => L64(a.wrapping_add(1)),
        ("INC", F32(a)) => F32(a + 1.0),
        ("INC", D64(a)) => D64(a + 1.0),

        (op, a) => {
            return Err(FaultKind::TypeMismatch {
                expected: format!("numeric operand for {op}"),
                found: type_name(&a),
            })
        }
    })
}

/// Signed-integer/IEEE comparison used by `CMP_<width><code>`. Returns
/// whether the predicate holds; the caller decides whether to branch.
pub fn compare(code: &str, left: &Value, right: &Value) -> VmResult<bool> {
    use std::cmp::Ordering;
    use ConstantValue::*;

    let ordering = match (left, right) {
        (B8(a), B8(b)) => a.cmp(b),
        (S16(a), S16(b)) => a.cmp(b),
        (I32(a), I32(b)) => a.cmp(b),
        (L64(a), L64(b)) => a.cmp(b),
        (Bool(a), Bool(b)) => a.cmp(b),
        (F32(a), F32(b)) => a.partial_cmp(b).unwrap_or(Ordering::Greater),
        (D64(a), D64(b)) => a.partial_cmp(b).unwrap_or(Ordering::Greater),
        (Str(a), Str(b)) => a.cmp(b),
        (List(a), List(b)) => {
            // Only equality is defined over lists; fall back to length+value
            // comparison for EQ/NE, reject ordering predicates.
            if code == "EQ" || code == "NE" {
                let eq = a == b;
                return Ok(if code == "EQ" { eq } else { !eq });
            }
            return Err(mismatch("orderable operands", left));
        }
        _ => return Err(mismatch("matching comparable operands", left)),
    };

    Ok(match code {
        "EQ" => ordering == Ordering::Equal,
        "NE" => ordering != Ordering::Equal,
        "GT" => ordering == Ordering::Greater,
        "GE" => ordering != Ordering::Less,
        "LT" => ordering == Ordering::Less,
        "LE" => ordering != Ordering::Greater,
        _ => return Err(FaultKind::InvalidInstruction("CMP".to_string(), format!("unknown comparison code '{code}'"))),
    })
}

/// `R_ADD`: numeric widest-type addition if both operands are numeric,
/// otherwise string concatenation with `"null"` substituted for a null
/// operand. This crate has no null value today (every `Value` is concrete),
/// so the null branch is reachable only once an optional/nullable type is
/// added; the string-concat path below is what every `"foo" + 1`-style
/// expression actually exercises.
pub fn ref_add(left: Value, right: Value) -> VmResult<Value> {
    if left.width().is_numeric() && right.width().is_numeric() {
        return binary_numeric("ADD", promote(left.clone())?, promote(right.clone())?).or_else(|_| {
            // mismatched numeric widths: stringify instead of failing, since
            // `R_ADD`'s contract is "add if both numeric", not "only if
            // identical width".
            Ok(Value::Str(format!("{left}{right}")))
        });
    }
    Ok(Value::Str(format!("{left}{right}")))
}

fn promote(v: Value) -> VmResult<Value> {
    Ok(v)
}

/// `R_CE`/`R_CNE`: value-based (not identity) equality over references.
pub fn ref_equals(left: &Value, right: &Value) -> bool {
    left == right
}

/// `<Src>2<Dst>` numeric conversion.
pub fn convert(v: Value, to_tag: char) -> VmResult<Value> {
    use ConstantValue::*;
    let as_f64 = match &v {
        B8(a) => *a as f64,
        S16(a) => *a as f64,
        I32(a) => *a as f64,
        L64(a) => *a as f64,
        F32(a) => *a as f64,
        D64(a) => *a,
        other => return Err(mismatch("numeric operand for conversion", other)),
    };
    Ok(match to_tag {
        'B' => B8(as_f64 as i8),
        'S' => S16(as_f64 as i16),
        'I' => I32(as_f64 as i32),
        'L' => L64(as_f64 as i64),
        'F' => F32(as_f64 as f32),
        'D' => D64(as_f64),
        other => return Err(FaultKind::InvalidInstruction("CONVERT".to_string(), format!("unknown target tag '{other}'"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_add_matches_twos_complement() {
        let r = binary_numeric("ADD", Value::B8(127), Value::B8(1)).unwrap();
        assert_eq!(r, Value::B8(-128));
    }

    #[test]
    fn division_by_zero_is_a_fault() {
        let err = binary_numeric("DIV", Value::I32(1), Value::I32(0)).unwrap_err();
        assert!(matches!(err, FaultKind::DivisionByZero));
    }

    #[test]
    fn string_concat_substitutes_for_numeric_mismatch() {
        let r = ref_add(Value::Str("foo".to_string()), Value::I32(1)).unwrap();
        assert_eq!(r, Value::Str("foo1".to_string()));
    }

    #[test]
    fn ref_equality_is_value_based() {
        assert!(ref_equals(&Value::Str("a".to_string()), &Value::Str("a".to_string())));
        assert!(!ref_equals(&Value::Str("a".to_string()), &Value::Str("b".to_string())));
    }

    #[test]
    fn compare_lt_on_signed_ints() {
        assert!(compare("LT", &Value::I32(3), &Value::I32(5)).unwrap());
        assert!(!compare("LT", &Value::I32(5), &Value::I32(3)).unwrap());
    }

    #[test]
    fn widening_conversion_preserves_value() {
        let r = convert(Value::I32(7), 'L').unwrap();
        assert_eq!(r, Value::L64(7));
    }

    proptest::proptest! {
        /// `ADD_I32` never panics on overflow and always matches Rust's own
        /// two's-complement wraparound, whatever the operands (§3: integer
        /// arithmetic wraps, it does not fault).
        #[test]
        fn add_i32_matches_wrapping_add(a: i32, b: i32) {
            let r = binary_numeric("ADD", Value::I32(a), Value::I32(b)).unwrap();
            proptest::prop_assert_eq!(r, Value::I32(a.wrapping_add(b)));
        }
    }
}
