//! Output builtins.

use crate::context::{Context, Exec};
use crate::value::Value;

/// `print(v...)`: render each argument, space-separated, newline
/// terminated.
pub fn print(ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    let rendered: Vec<String> = args.iter().map(Value::render).collect();
    ctx.write_line(&rendered.join(" "));
    Ok(Value::Null)
}
