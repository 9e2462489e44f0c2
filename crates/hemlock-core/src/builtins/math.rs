//! Math builtins.

use super::want_args;
use crate::context::{throw_msg, Context, Exec};
use crate::ops;
use crate::value::Value;
use hemlock_parser::ast::BinaryOp;
use rand::Rng;

pub fn abs(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("abs", args, 1)?;
    let v = &args[0];
    if !v.is_numeric() {
        return throw_msg(format!("abs of {}", v.type_name()));
    }
    if v.is_float() {
        Ok(Value::F64(v.as_f64().abs()))
    } else {
        Ok(Value::int(v.as_i64().wrapping_abs()))
    }
}

pub fn min(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("min", args, 2)?;
    pick(&args[0], &args[1], BinaryOp::Le)
}

pub fn max(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("max", args, 2)?;
    pick(&args[0], &args[1], BinaryOp::Ge)
}

fn pick(a: &Value, b: &Value, keep_left: BinaryOp) -> Exec<Value> {
    match ops::binary_op(keep_left, a, b)? {
        Value::Bool(true) => Ok(a.clone()),
        _ => Ok(b.clone()),
    }
}

pub fn floor(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("floor", args, 1)?;
    float_arg("floor", &args[0]).map(|f| Value::F64(f.floor()))
}

pub fn ceil(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("ceil", args, 1)?;
    float_arg("ceil", &args[0]).map(|f| Value::F64(f.ceil()))
}

pub fn sqrt(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("sqrt", args, 1)?;
    float_arg("sqrt", &args[0]).map(|f| Value::F64(f.sqrt()))
}

pub fn pow(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("pow", args, 2)?;
    let base = float_arg("pow", &args[0])?;
    let exp = float_arg("pow", &args[1])?;
    Ok(Value::F64(base.powf(exp)))
}

fn float_arg(what: &str, v: &Value) -> Exec<f64> {
    if v.is_numeric() {
        Ok(v.as_f64())
    } else {
        throw_msg(format!("{} of {}", what, v.type_name()))
    }
}

/// `random()`: uniform f64 in [0, 1). Each task thread gets its own
/// generator.
pub fn random(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("random", args, 0)?;
    Ok(Value::F64(rand::thread_rng().gen::<f64>()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Output;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn ctx() -> Context {
        let out: Output = Arc::new(Mutex::new(std::io::sink()));
        Context::new(out)
    }

    #[test]
    fn abs_preserves_numeric_class() {
        assert!(matches!(
            abs(&mut ctx(), &[Value::int(-3)]).unwrap(),
            Value::I32(3)
        ));
        assert!(matches!(
            abs(&mut ctx(), &[Value::F64(-2.5)]).unwrap(),
            Value::F64(f) if f == 2.5
        ));
    }

    #[test]
    fn min_max_promote() {
        let v = min(&mut ctx(), &[Value::int(2), Value::F64(1.5)]).unwrap();
        assert!(matches!(v, Value::F64(f) if f == 1.5));
        let v = max(&mut ctx(), &[Value::int(2), Value::F64(1.5)]).unwrap();
        assert!(matches!(v, Value::I32(2)));
    }

    #[test]
    fn random_is_in_unit_interval() {
        for _ in 0..100 {
            if let Value::F64(f) = random(&mut ctx(), &[]).unwrap() {
                assert!((0.0..1.0).contains(&f));
            } else {
                panic!("expected f64");
            }
        }
    }
}
