//! Built-in functions installed into every root namespace

use super::error::{InterpResult, RuntimeError};
use super::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

/// Destination for `print` and `println`
pub type OutputRef = Rc<RefCell<dyn Write>>;

/// Output sink writing to the process's stdout
pub fn stdout() -> OutputRef {
    Rc::new(RefCell::new(io::stdout()))
}

/// The built-in library, with `print`/`println` writing to `out`
pub fn builtins(out: OutputRef) -> HashMap<String, Value> {
    let mut table = HashMap::new();
    table.insert("len".to_string(), Value::function(builtin_len));
    table.insert("append".to_string(), Value::function(builtin_append));

    let sink = Rc::clone(&out);
    table.insert(
        "print".to_string(),
        Value::function(move |args| builtin_print(&sink, args)),
    );
    table.insert(
        "println".to_string(),
        Value::function(move |args| builtin_println(&out, args)),
    );
    table
}

/// len(v) -> int
fn builtin_len(args: &[Value]) -> InterpResult<Value> {
    let target = args.first().ok_or(RuntimeError::BuiltinArity("len"))?;
    Ok(Value::Int(target.len()?))
}

/// append(array, values...) -> new array
fn builtin_append(args: &[Value]) -> InterpResult<Value> {
    let (target, rest) = args
        .split_first()
        .ok_or(RuntimeError::BuiltinArity("append"))?;
    target.append(rest)
}

fn builtin_print(out: &OutputRef, args: &[Value]) -> InterpResult<Value> {
    let mut out = out.borrow_mut();
    for arg in args {
        write!(out, "{arg}")?;
    }
    out.flush()?;
    Ok(Value::Null)
}

fn builtin_println(out: &OutputRef, args: &[Value]) -> InterpResult<Value> {
    let line: Vec<String> = args.iter().map(Value::to_text).collect();
    let mut out = out.borrow_mut();
    writeln!(out, "{}", line.join(" "))?;
    out.flush()?;
    Ok(Value::Null)
}
