//! Object methods. Field reads and writes go through member syntax in
//! the evaluator; the method table carries `serialize`.

use super::want_args;
use crate::context::{throw_msg, Context, Exec};
use crate::json;
use crate::value::Value;

pub fn call(ctx: &mut Context, receiver: &Value, name: &str, args: Vec<Value>) -> Exec<Value> {
    let _ = ctx;
    match name {
        "serialize" => {
            want_args("object.serialize", &args, 0)?;
            match json::stringify(receiver) {
                Ok(s) => Ok(Value::str(s)),
                Err(e) => throw_msg(format!("serialize error: {}", e)),
            }
        }
        other => throw_msg(format!("object has no method `{}`", other)),
    }
}
