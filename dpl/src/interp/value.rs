//! Runtime values for the interpreter
//!
//! Arrays and objects are reference types: cloning a [`Value`] clones the handle,
//! so every alias observes element assignment. Everything else is copied.

use super::error::{InterpResult, RuntimeError};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared array storage
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Shared object storage, iterated in insertion order
pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;

/// Callable stored in a function value (closures and host built-ins alike)
pub type FunctionRef = Rc<dyn Fn(&[Value]) -> InterpResult<Value>>;

/// Sequence produced by single-recipient iteration
pub type ValueIter = Box<dyn Iterator<Item = Value>>;

/// Sequence produced by two-recipient iteration
pub type PairIter = Box<dyn Iterator<Item = (Value, Value)>>;

/// Runtime value
#[derive(Clone)]
pub enum Value {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Null,
    Array(ArrayRef),
    Object(ObjectRef),
    Function(FunctionRef),
}

/// The kind of a value, used by operator gating and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int,
    Real,
    Text,
    Bool,
    Null,
    Array,
    Object,
    Function,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Int => "int",
            Kind::Real => "real",
            Kind::Text => "text",
            Kind::Bool => "bool",
            Kind::Null => "null",
            Kind::Array => "array",
            Kind::Object => "object",
            Kind::Function => "function",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Build an array value owning fresh storage
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    /// Build an object value owning fresh storage
    pub fn object(entries: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(entries)))
    }

    /// Wrap a host callable
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> InterpResult<Value> + 'static,
    {
        Value::Function(Rc::new(f))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Int(_) => Kind::Int,
            Value::Real(_) => Kind::Real,
            Value::Text(_) => Kind::Text,
            Value::Bool(_) => Kind::Bool,
            Value::Null => Kind::Null,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
            Value::Function(_) => Kind::Function,
        }
    }

    pub fn to_int(&self) -> InterpResult<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Real(x) => Ok(*x as i64),
            Value::Text(s) => Ok(text_to_int(s)),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Null => Ok(0),
            other => Err(RuntimeError::conversion(other.kind(), "int")),
        }
    }

    pub fn to_real(&self) -> InterpResult<f64> {
        match self {
            Value::Int(n) => Ok(*n as f64),
            Value::Real(x) => Ok(*x),
            Value::Text(s) => Ok(text_to_real(s)),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Null => Ok(0.0),
            other => Err(RuntimeError::conversion(other.kind(), "real")),
        }
    }

    /// Canonical text form. Total: every value has one.
    pub fn to_text(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Real(x) => format_real(*x),
            Value::Text(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(items) => {
                let parts: Vec<String> = items.borrow().iter().map(Value::to_text).collect();
                format!("[{}]", parts.join(","))
            }
            Value::Object(entries) => {
                let parts: Vec<String> = entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{k}:{}", v.to_text()))
                    .collect();
                format!("{{{}}}", parts.join(","))
            }
            Value::Function(_) => Kind::Function.name().to_string(),
        }
    }

    pub fn to_bool(&self) -> InterpResult<bool> {
        match self {
            Value::Int(n) => Ok(*n != 0),
            Value::Real(x) => Ok(*x != 0.0),
            Value::Text(s) => Ok(!s.is_empty()),
            Value::Bool(b) => Ok(*b),
            Value::Null => Ok(false),
            Value::Array(items) => Ok(!items.borrow().is_empty()),
            Value::Object(entries) => Ok(!entries.borrow().is_empty()),
            Value::Function(_) => Err(RuntimeError::conversion(Kind::Function, "bool")),
        }
    }

    /// True for reals and for text whose leading number has a decimal point
    pub fn is_real(&self) -> bool {
        match self {
            Value::Real(_) => true,
            Value::Text(s) => text_is_real(s),
            _ => false,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    /// Element read: `self[index]`
    pub fn el_by_index(&self, index: &Value) -> InterpResult<Value> {
        match self {
            Value::Text(s) => {
                let i = index.to_int()?;
                usize::try_from(i)
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::Text(c.to_string()))
                    .ok_or(RuntimeError::IndexOutOfRange)
            }
            Value::Array(items) => {
                let i = index.to_int()?;
                let items = items.borrow();
                usize::try_from(i)
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .ok_or(RuntimeError::IndexOutOfRange)
            }
            Value::Object(entries) => Ok(entries
                .borrow()
                .get(&index.to_text())
                .cloned()
                .unwrap_or(Value::Null)),
            other => Err(RuntimeError::NoIndexSupport(other.kind())),
        }
    }

    /// Element assignment in place: `self[index] = value`
    pub fn set_el_by_index(&self, index: &Value, value: Value) -> InterpResult<()> {
        match self {
            Value::Array(items) => {
                let i = index.to_int()?;
                let mut items = items.borrow_mut();
                let slot = usize::try_from(i)
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or(RuntimeError::IndexOutOfRange)?;
                *slot = value;
                Ok(())
            }
            Value::Object(entries) => {
                // The key may render this very object
                let key = index.to_text();
                entries.borrow_mut().insert(key, value);
                Ok(())
            }
            other => Err(RuntimeError::NoIndexMutationSupport(other.kind())),
        }
    }

    /// Single-recipient iteration: numbers count up from zero, text and arrays
    /// yield their indices, objects yield their keys.
    pub fn iter(&self) -> InterpResult<ValueIter> {
        match self {
            Value::Int(n) => Ok(count_to(*n)),
            Value::Real(_) => Ok(count_to(self.to_int()?)),
            Value::Text(_) | Value::Array(_) => Ok(count_to(self.len()?)),
            Value::Object(entries) => {
                let keys: Vec<Value> = entries
                    .borrow()
                    .keys()
                    .map(|k| Value::Text(k.clone()))
                    .collect();
                Ok(Box::new(keys.into_iter()))
            }
            other => Err(RuntimeError::NoIterSupport(other.kind())),
        }
    }

    /// Two-recipient iteration: (index, element) or (key, value).
    ///
    /// Elements are read when each pair is produced, so assignments made by the
    /// loop body to later positions are observed.
    pub fn iter2(&self) -> InterpResult<PairIter> {
        match self {
            Value::Text(s) => {
                let chars: Vec<(Value, Value)> = s
                    .chars()
                    .enumerate()
                    .map(|(i, c)| (Value::Int(i as i64), Value::Text(c.to_string())))
                    .collect();
                Ok(Box::new(chars.into_iter()))
            }
            Value::Array(items) => {
                let items = Rc::clone(items);
                let len = items.borrow().len();
                Ok(Box::new((0..len).map(move |i| {
                    let item = items.borrow().get(i).cloned().unwrap_or(Value::Null);
                    (Value::Int(i as i64), item)
                })))
            }
            Value::Object(entries) => {
                let entries = Rc::clone(entries);
                let keys: Vec<String> = entries.borrow().keys().cloned().collect();
                Ok(Box::new(keys.into_iter().map(move |k| {
                    let value = entries.borrow().get(&k).cloned().unwrap_or(Value::Null);
                    (Value::Text(k), value)
                })))
            }
            other => Err(RuntimeError::NoIterSupport2(other.kind())),
        }
    }

    pub fn call(&self, args: &[Value]) -> InterpResult<Value> {
        match self {
            Value::Function(f) => f(args),
            other => Err(RuntimeError::NoCallSupport(other.kind())),
        }
    }

    pub fn len(&self) -> InterpResult<i64> {
        let len = match self {
            Value::Text(s) => s.chars().count(),
            Value::Array(items) => items.borrow().len(),
            Value::Object(entries) => entries.borrow().len(),
            other => return Err(RuntimeError::NoLenSupport(other.kind())),
        };
        Ok(len as i64)
    }

    /// Returns a new array holding the old elements followed by `values`.
    /// The receiver is left untouched.
    pub fn append(&self, values: &[Value]) -> InterpResult<Value> {
        match self {
            Value::Array(items) => {
                let mut copy = items.borrow().clone();
                copy.extend_from_slice(values);
                Ok(Value::array(copy))
            }
            other => Err(RuntimeError::NoAppendSupport(other.kind())),
        }
    }
}

fn count_to(n: i64) -> ValueIter {
    Box::new((0..n).map(Value::Int))
}

fn format_real(x: f64) -> String {
    if x.is_infinite() {
        if x > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        // NaN already prints as "NaN"
        x.to_string()
    }
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Leading `[+-]?digits` (and `.digits` when `fraction`) after whitespace
fn numeric_prefix(text: &str, fraction: bool) -> &str {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    end += count_digits(&bytes[end..]);
    if fraction && bytes.get(end) == Some(&b'.') {
        end += 1 + count_digits(&bytes[end + 1..]);
    }
    &trimmed[..end]
}

fn text_to_int(text: &str) -> i64 {
    let prefix = numeric_prefix(text, false);
    if !prefix.bytes().any(|b| b.is_ascii_digit()) {
        return 0;
    }
    prefix.parse().unwrap_or(if prefix.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn text_to_real(text: &str) -> f64 {
    numeric_prefix(text, true).parse().unwrap_or(0.0)
}

fn text_is_real(text: &str) -> bool {
    let trimmed = text.trim_start();
    let unsigned = trimmed
        .strip_prefix(|c: char| c == '+' || c == '-')
        .unwrap_or(trimmed)
        .as_bytes();
    let digits = count_digits(unsigned);
    let rest = &unsigned[digits..];
    if digits > 0 {
        rest.first() == Some(&b'.')
    } else {
        rest.first() == Some(&b'.') && rest.get(1).is_some_and(u8::is_ascii_digit)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Real(x) => write!(f, "Real({x:?})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Null => write!(f, "Null"),
            Value::Array(items) => f.debug_tuple("Array").field(&*items.borrow()).finish(),
            Value::Object(entries) => f.debug_tuple("Object").field(&*entries.borrow()).finish(),
            Value::Function(_) => write!(f, "Function(..)"),
        }
    }
}

/// Structural equality for host code and tests; functions compare by identity.
/// The language's `==` operator has its own coercing rules (see `ops`).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Function(a), Value::Function(b)) => {
                std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
            }
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Real(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
