//! Operator semantics over runtime values
//!
//! Every operator first checks its operands against an allow-list of kinds,
//! then coerces them. Arithmetic promotes to real when either side looks real.

use super::error::{InterpResult, RuntimeError};
use super::value::{Kind, Value};
use crate::ast::{BinOp, UnOp};
use std::fmt::Display;

/// Kinds accepted by arithmetic, comparison, negation and as sequence indices
pub const SCALAR_KINDS: &[Kind] = &[Kind::Int, Kind::Real, Kind::Text, Kind::Bool, Kind::Null];

/// Kinds accepted by `and`, `or` and `not`
pub const LOGICAL_KINDS: &[Kind] = &[
    Kind::Int,
    Kind::Real,
    Kind::Text,
    Kind::Bool,
    Kind::Null,
    Kind::Array,
    Kind::Object,
];

/// Kinds that support `v[i]`
pub const INDEXABLE_KINDS: &[Kind] = &[Kind::Text, Kind::Array, Kind::Object];

/// Fail with `OperatorNotDefined` unless `value`'s kind is in `allowed`
pub fn gate(op: impl Display, allowed: &[Kind], value: &Value) -> InterpResult<()> {
    let kind = value.kind();
    if allowed.contains(&kind) {
        Ok(())
    } else {
        Err(RuntimeError::operator_not_defined(op, kind))
    }
}

fn gate_both(op: BinOp, allowed: &[Kind], left: &Value, right: &Value) -> InterpResult<()> {
    gate(op, allowed, left)?;
    gate(op, allowed, right)
}

/// Apply a binary operator to two already evaluated operands
pub fn binary(op: BinOp, left: &Value, right: &Value) -> InterpResult<Value> {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            arithmetic(op, left, right)
        }
        BinOp::Concat => Ok(Value::Text(left.to_text() + &right.to_text())),
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
            compare(op, left, right)
        }
        BinOp::And | BinOp::Or => {
            gate_both(op, LOGICAL_KINDS, left, right)?;
            let (a, b) = (left.to_bool()?, right.to_bool()?);
            Ok(Value::Bool(if op == BinOp::And { a && b } else { a || b }))
        }
    }
}

/// Apply a unary operator to an already evaluated operand
pub fn unary(op: UnOp, operand: &Value) -> InterpResult<Value> {
    match op {
        UnOp::Neg => {
            gate(op, SCALAR_KINDS, operand)?;
            if operand.is_real() {
                Ok(Value::Real(-operand.to_real()?))
            } else {
                Ok(Value::Int(operand.to_int()?.wrapping_neg()))
            }
        }
        UnOp::Not => {
            gate(op, LOGICAL_KINDS, operand)?;
            Ok(Value::Bool(!operand.to_bool()?))
        }
    }
}

fn arithmetic(op: BinOp, left: &Value, right: &Value) -> InterpResult<Value> {
    gate_both(op, SCALAR_KINDS, left, right)?;

    if matches!(op, BinOp::Div | BinOp::Mod) && right.to_real()? == 0.0 {
        return Err(RuntimeError::DivisionByZero);
    }

    if left.is_real() || right.is_real() {
        let (a, b) = (left.to_real()?, right.to_real()?);
        let result = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            _ => a % b,
        };
        Ok(Value::Real(result))
    } else {
        let (a, b) = (left.to_int()?, right.to_int()?);
        let result = match op {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Div => a.wrapping_div(b),
            _ => a.wrapping_rem(b),
        };
        Ok(Value::Int(result))
    }
}

fn compare(op: BinOp, left: &Value, right: &Value) -> InterpResult<Value> {
    gate_both(op, SCALAR_KINDS, left, right)?;

    let result = match (left, right) {
        (Value::Text(a), Value::Text(b)) => ordering_matches(op, a.as_str(), b.as_str()),
        _ => ordering_matches(op, left.to_real()?, right.to_real()?),
    };
    Ok(Value::Bool(result))
}

fn ordering_matches<T: PartialOrd>(op: BinOp, a: T, b: T) -> bool {
    match op {
        BinOp::Eq => a == b,
        BinOp::Ne => a != b,
        BinOp::Lt => a < b,
        BinOp::Gt => a > b,
        BinOp::Le => a <= b,
        _ => a >= b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn add(a: Value, b: Value) -> Value {
        binary(BinOp::Add, &a, &b).unwrap()
    }

    #[test]
    fn test_int_arithmetic() {
        assert_eq!(add(Value::Int(8), Value::Int(9)), Value::Int(17));
        assert_eq!(
            binary(BinOp::Sub, &Value::Int(3), &Value::Int(10)).unwrap(),
            Value::Int(-7)
        );
        assert_eq!(
            binary(BinOp::Div, &Value::Int(-7), &Value::Int(2)).unwrap(),
            Value::Int(-3)
        );
        assert_eq!(
            binary(BinOp::Mod, &Value::Int(-7), &Value::Int(2)).unwrap(),
            Value::Int(-1)
        );
    }

    #[test]
    fn test_int_arithmetic_wraps() {
        assert_eq!(add(Value::Int(i64::MAX), Value::Int(1)), Value::Int(i64::MIN));
        assert_eq!(
            binary(BinOp::Div, &Value::Int(i64::MIN), &Value::Int(-1)).unwrap(),
            Value::Int(i64::MIN)
        );
    }

    #[test]
    fn test_promotion_to_real() {
        assert_eq!(add(Value::Int(8), Value::Real(1.7)), Value::Real(9.7));
        assert_eq!(add(Value::Int(8), Value::text("9")), Value::Int(17));
        assert_eq!(add(Value::Int(8), Value::text("1.7")), Value::Real(9.7));
        assert_eq!(add(Value::Bool(true), Value::Null), Value::Int(1));
        assert_eq!(
            binary(BinOp::Div, &Value::Int(7), &Value::Real(2.0)).unwrap(),
            Value::Real(3.5)
        );
    }

    #[test]
    fn test_real_remainder_follows_dividend() {
        assert_eq!(
            binary(BinOp::Mod, &Value::Real(-7.5), &Value::Int(2)).unwrap(),
            Value::Real(-1.5)
        );
    }

    #[test]
    fn test_division_by_zero() {
        for (op, divisor) in [
            (BinOp::Div, Value::Int(0)),
            (BinOp::Mod, Value::Bool(false)),
            (BinOp::Div, Value::Null),
            (BinOp::Div, Value::text("0.0")),
            (BinOp::Mod, Value::Real(0.0)),
        ] {
            assert!(matches!(
                binary(op, &Value::Int(243), &divisor),
                Err(RuntimeError::DivisionByZero)
            ));
        }
    }

    #[test]
    fn test_gate_precedes_division_check() {
        let err = binary(BinOp::Div, &Value::array(vec![]), &Value::Int(0)).unwrap_err();
        assert_eq!(err.to_string(), "operator / is not defined for type array");
    }

    #[test]
    fn test_arithmetic_rejects_containers() {
        let err = binary(BinOp::Add, &Value::Int(1), &Value::object(IndexMap::new())).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::OperatorNotDefined { ref op, kind: Kind::Object } if op == "+"
        ));
        let f = Value::function(|_| Ok(Value::Null));
        assert!(binary(BinOp::Mul, &f, &Value::Int(1)).is_err());
    }

    #[test]
    fn test_concat() {
        let arr = Value::array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            binary(BinOp::Concat, &Value::text("a"), &arr).unwrap(),
            Value::text("a[1,2]")
        );
        assert_eq!(
            binary(BinOp::Concat, &Value::Int(1), &Value::Real(2.5)).unwrap(),
            Value::text("12.5")
        );
    }

    #[test]
    fn test_compare_text_as_strings() {
        let cmp = |op, a: &str, b: &str| binary(op, &Value::text(a), &Value::text(b)).unwrap();
        assert_eq!(cmp(BinOp::Lt, "abc", "abd"), Value::Bool(true));
        assert_eq!(cmp(BinOp::Lt, "10", "9"), Value::Bool(true));
        assert_eq!(cmp(BinOp::Eq, "x", "x"), Value::Bool(true));
    }

    #[test]
    fn test_compare_numerically_otherwise() {
        let cmp = |op, a: Value, b: Value| binary(op, &a, &b).unwrap();
        assert_eq!(cmp(BinOp::Lt, Value::text("10"), Value::Int(9)), Value::Bool(false));
        assert_eq!(cmp(BinOp::Eq, Value::Int(1), Value::Real(1.0)), Value::Bool(true));
        assert_eq!(cmp(BinOp::Ge, Value::Bool(true), Value::Int(1)), Value::Bool(true));
        assert_eq!(cmp(BinOp::Ne, Value::Int(2), Value::Int(3)), Value::Bool(true));
    }

    #[test]
    fn test_null_equals_zero_and_false() {
        let eq = |a: Value| binary(BinOp::Eq, &a, &Value::Null).unwrap();
        assert_eq!(eq(Value::Int(0)), Value::Bool(true));
        assert_eq!(eq(Value::Bool(false)), Value::Bool(true));
        assert_eq!(eq(Value::Int(1)), Value::Bool(false));
    }

    #[test]
    fn test_compare_rejects_arrays() {
        let arr = Value::array(vec![]);
        let err = binary(BinOp::Eq, &arr, &arr).unwrap_err();
        assert_eq!(err.to_string(), "operator == is not defined for type array");
    }

    #[test]
    fn test_logical() {
        let arr = Value::array(vec![Value::Int(1)]);
        assert_eq!(
            binary(BinOp::And, &arr, &Value::text("")).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            binary(BinOp::Or, &Value::Null, &Value::object(IndexMap::new())).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            binary(BinOp::Or, &Value::Int(0), &Value::Real(0.1)).unwrap(),
            Value::Bool(true)
        );
        let f = Value::function(|_| Ok(Value::Null));
        let err = binary(BinOp::And, &Value::Bool(true), &f).unwrap_err();
        assert_eq!(err.to_string(), "operator and is not defined for type function");
    }

    #[test]
    fn test_negation() {
        assert_eq!(unary(UnOp::Neg, &Value::Int(5)).unwrap(), Value::Int(-5));
        assert_eq!(unary(UnOp::Neg, &Value::text("2.5")).unwrap(), Value::Real(-2.5));
        assert_eq!(unary(UnOp::Neg, &Value::Bool(true)).unwrap(), Value::Int(-1));
        assert_eq!(
            unary(UnOp::Neg, &Value::Int(i64::MIN)).unwrap(),
            Value::Int(i64::MIN)
        );
        let err = unary(UnOp::Neg, &Value::array(vec![])).unwrap_err();
        assert_eq!(err.to_string(), "operator unary - is not defined for type array");
    }

    #[test]
    fn test_not() {
        assert_eq!(unary(UnOp::Not, &Value::Null).unwrap(), Value::Bool(true));
        assert_eq!(
            unary(UnOp::Not, &Value::array(vec![])).unwrap(),
            Value::Bool(true)
        );
        assert!(unary(UnOp::Not, &Value::function(|_| Ok(Value::Null))).is_err());
    }

    #[test]
    fn test_gate_with_custom_label() {
        assert!(gate("[<index>]", INDEXABLE_KINDS, &Value::text("a")).is_ok());
        let err = gate("[<index>]", INDEXABLE_KINDS, &Value::Int(1)).unwrap_err();
        assert_eq!(err.to_string(), "operator [<index>] is not defined for type int");
    }
}
