//! Conversion between host JSON data and runtime values

use super::error::{InterpResult, RuntimeError};
use super::value::{Kind, Value};
use serde_json::{Map, Number};

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    /// Convert to JSON. Non-finite reals become `null`; functions cannot be converted.
    pub fn to_json(&self) -> InterpResult<serde_json::Value> {
        Ok(match self {
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Real(x) => Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Null => serde_json::Value::Null,
            Value::Array(items) => serde_json::Value::Array(
                items
                    .borrow()
                    .iter()
                    .map(Value::to_json)
                    .collect::<InterpResult<_>>()?,
            ),
            Value::Object(entries) => {
                let mut map = Map::new();
                for (k, v) in entries.borrow().iter() {
                    map.insert(k.clone(), v.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            Value::Function(_) => return Err(RuntimeError::conversion(Kind::Function, "json")),
        })
    }
}
