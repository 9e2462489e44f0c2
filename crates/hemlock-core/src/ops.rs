//! Binary and unary operator semantics over the promotion lattice.
//!
//! Short-circuit `&&`/`||` are handled by the evaluator before this
//! module is reached; everything else funnels through [`binary_op`].

use crate::context::{throw_msg, Control, Exec};
use crate::types::{kind_of, TypeKind};
use crate::value::Value;
use hemlock_parser::ast::{BinaryOp, UnaryOp};

/// Apply a binary operator to two evaluated operands.
pub fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> Exec<Value> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(left.equals(right))),
        BinaryOp::Ne => return Ok(Value::Bool(!left.equals(right))),
        BinaryOp::And | BinaryOp::Or => {
            return Err(Control::Panic(
                "short-circuit operator reached binary_op".to_string(),
            ))
        }
        _ => {}
    }

    // String concatenation and ordering.
    if let (Value::Str(a), Value::Str(b)) = (left, right) {
        match op {
            BinaryOp::Add => {
                let joined = format!("{}{}", a.lock().data, b.lock().data);
                return Ok(Value::str(joined));
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let (sa, sb) = (a.lock().data.clone(), b.lock().data.clone());
                return Ok(Value::Bool(compare_ordered(
                    op,
                    sa.as_bytes().cmp(sb.as_bytes()),
                )));
            }
            _ => {}
        }
    }
    // `string + x` renders the right operand; `x + string` mirrors it.
    if matches!(op, BinaryOp::Add) {
        if let Value::Str(a) = left {
            return Ok(Value::str(format!("{}{}", a.lock().data, right.render())));
        }
        if let Value::Str(b) = right {
            return Ok(Value::str(format!("{}{}", left.render(), b.lock().data)));
        }
    }

    if !left.is_numeric() || !right.is_numeric() {
        return throw_msg(format!(
            "invalid operands for `{}`: {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ));
    }

    let join = TypeKind::join(kind_of(left), kind_of(right));

    match op {
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = if join.is_float() {
                left.as_f64()
                    .partial_cmp(&right.as_f64())
                    .unwrap_or(std::cmp::Ordering::Less)
            } else {
                left.as_i64().cmp(&right.as_i64())
            };
            Ok(Value::Bool(compare_ordered(op, ordering)))
        }

        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            if join.is_float() {
                let (a, b) = (left.as_f64(), right.as_f64());
                let result = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Mod => a % b,
                    _ => unreachable!(),
                };
                Ok(store_float(join, result))
            } else {
                let (a, b) = (left.as_i64(), right.as_i64());
                let result = match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::Div => {
                        if b == 0 {
                            return throw_msg("division by zero");
                        }
                        a.wrapping_div(b)
                    }
                    BinaryOp::Mod => {
                        if b == 0 {
                            return throw_msg("modulo by zero");
                        }
                        a.wrapping_rem(b)
                    }
                    _ => unreachable!(),
                };
                Ok(store_int(join, result))
            }
        }

        BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::Shl
        | BinaryOp::Shr => {
            if join.is_float() {
                return throw_msg(format!(
                    "bitwise operation `{}` on non-integer",
                    op.symbol()
                ));
            }
            let (a, b) = (left.as_i64(), right.as_i64());
            let result = match op {
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                BinaryOp::Shl => a.wrapping_shl(b as u32),
                BinaryOp::Shr => a.wrapping_shr(b as u32),
                _ => unreachable!(),
            };
            Ok(store_int(join, result))
        }

        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::And | BinaryOp::Or => unreachable!(),
    }
}

/// Apply a unary operator to an evaluated operand.
pub fn unary_op(op: UnaryOp, value: &Value) -> Exec<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
        UnaryOp::Neg => {
            if !value.is_numeric() {
                return throw_msg(format!("cannot negate {}", value.type_name()));
            }
            let kind = kind_of(value);
            if kind.is_float() {
                Ok(store_float(kind, -value.as_f64()))
            } else {
                Ok(store_int(kind, value.as_i64().wrapping_neg()))
            }
        }
        UnaryOp::BitNot => {
            if !value.is_integer() {
                return throw_msg(format!(
                    "bitwise operation `~` on {}",
                    value.type_name()
                ));
            }
            Ok(store_int(kind_of(value), !value.as_i64()))
        }
    }
}

fn compare_ordered(op: BinaryOp, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        BinaryOp::Lt => ordering == Less,
        BinaryOp::Le => ordering != Greater,
        BinaryOp::Gt => ordering == Greater,
        BinaryOp::Ge => ordering != Less,
        _ => false,
    }
}

/// Integer results of kind at or below i32 are stored as i32, larger
/// kinds as i64.
fn store_int(join: TypeKind, result: i64) -> Value {
    let rank = join.numeric_rank().unwrap_or(0);
    if rank <= TypeKind::I32.numeric_rank().unwrap() {
        Value::I32(result as i32)
    } else {
        Value::I64(result)
    }
}

/// Float results mirror the join: f32 or f64.
fn store_float(join: TypeKind, result: f64) -> Value {
    match join {
        TypeKind::F32 => Value::F32(result as f32),
        _ => Value::F64(result),
    }
}
