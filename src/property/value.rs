//! Property value types.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::property::object::PropertyObject;

/// The closed set of property value types:
/// `Bool, Int, Float, String, List, Dict, Ratio, Object, Function,
/// Procedure, Struct, Enumeration`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    List,
    Dict,
    Ratio,
    Object,
    Function,
    Procedure,
    Struct,
    Enumeration,
}

/// A rational number, used for `Ratio`-typed properties and the device
/// domain's tick resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: i64,
    pub denominator: i64,
}

impl Ratio {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self { numerator, denominator }
    }
}

/// A callable value. `Function` returns a value; `Procedure` does not - the
/// distinction is preserved for callers that need to know whether to expect
/// a return, but both are invoked the same way from Rust.
#[derive(Clone)]
pub struct Callable {
    pub is_function: bool,
    inner: Arc<dyn Fn(&[PropertyValue]) -> crate::error::DaqResult<PropertyValue> + Send + Sync>,
}

impl Callable {
    pub fn new_function(
        f: impl Fn(&[PropertyValue]) -> crate::error::DaqResult<PropertyValue> + Send + Sync + 'static,
    ) -> Self {
        Self { is_function: true, inner: Arc::new(f) }
    }

    pub fn new_procedure(
        f: impl Fn(&[PropertyValue]) -> crate::error::DaqResult<PropertyValue> + Send + Sync + 'static,
    ) -> Self {
        Self { is_function: false, inner: Arc::new(f) }
    }

    pub fn call(&self, args: &[PropertyValue]) -> crate::error::DaqResult<PropertyValue> {
        (self.inner)(args)
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.is_function { "Function(..)" } else { "Procedure(..)" })
    }
}

/// A runtime property value. Container variants (`List`/`Dict`/`Struct`)
/// are cloned on every write so that a stored value never aliases the
/// caller's copy.
#[derive(Clone, Debug)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Dict(HashMap<String, PropertyValue>),
    Ratio(Ratio),
    Object(Arc<PropertyObject>),
    Callable(Callable),
    Struct { type_name: String, fields: HashMap<String, PropertyValue> },
    Enumeration { type_name: String, variant: String },
}

impl PropertyValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Bool(_) => ValueType::Bool,
            PropertyValue::Int(_) => ValueType::Int,
            PropertyValue::Float(_) => ValueType::Float,
            PropertyValue::String(_) => ValueType::String,
            PropertyValue::List(_) => ValueType::List,
            PropertyValue::Dict(_) => ValueType::Dict,
            PropertyValue::Ratio(_) => ValueType::Ratio,
            PropertyValue::Object(_) => ValueType::Object,
            PropertyValue::Callable(c) if c.is_function => ValueType::Function,
            PropertyValue::Callable(_) => ValueType::Procedure,
            PropertyValue::Struct { .. } => ValueType::Struct,
            PropertyValue::Enumeration { .. } => ValueType::Enumeration,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<PropertyObject>> {
        match self {
            PropertyValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// JSON encoding used by `serialize`/`update`. Callables have no
    /// serialized form and are dropped.
    pub fn to_json(&self) -> Json {
        match self {
            PropertyValue::Bool(b) => Json::Bool(*b),
            PropertyValue::Int(i) => Json::from(*i),
            PropertyValue::Float(f) => Json::from(*f),
            PropertyValue::String(s) => Json::String(s.clone()),
            PropertyValue::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            PropertyValue::Dict(map) => {
                Json::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
            PropertyValue::Ratio(r) => serde_json::json!({"numerator": r.numerator, "denominator": r.denominator}),
            PropertyValue::Object(obj) => obj.serialize(),
            PropertyValue::Callable(_) => Json::Null,
            PropertyValue::Struct { type_name, fields } => {
                let mut map = serde_json::Map::new();
                map.insert("__type".to_string(), Json::String(type_name.clone()));
                for (k, v) in fields {
                    map.insert(k.clone(), v.to_json());
                }
                Json::Object(map)
            }
            PropertyValue::Enumeration { type_name, variant } => {
                serde_json::json!({"__enum": type_name, "value": variant})
            }
        }
    }

    /// Best-effort reconstruction from JSON for scalar and container types;
    /// `Object`/`Function`/`Procedure` values cannot be rebuilt from JSON
    /// alone and must be supplied by the property's own default/metadata.
    pub fn from_json_scalar(value: &Json, expected: ValueType) -> Option<Self> {
        match (expected, value) {
            (ValueType::Bool, Json::Bool(b)) => Some(PropertyValue::Bool(*b)),
            (ValueType::Int, Json::Number(n)) => n.as_i64().map(PropertyValue::Int),
            (ValueType::Float, Json::Number(n)) => n.as_f64().map(PropertyValue::Float),
            (ValueType::String, Json::String(s)) => Some(PropertyValue::String(s.clone())),
            (ValueType::List, Json::Array(items)) => Some(PropertyValue::List(
                items
                    .iter()
                    .filter_map(|v| Self::infer_from_json(v))
                    .collect(),
            )),
            (ValueType::Dict, Json::Object(map)) => Some(PropertyValue::Dict(
                map.iter()
                    .filter_map(|(k, v)| Self::infer_from_json(v).map(|pv| (k.clone(), pv)))
                    .collect(),
            )),
            (ValueType::Ratio, Json::Object(map)) => Some(PropertyValue::Ratio(Ratio::new(
                map.get("numerator")?.as_i64()?,
                map.get("denominator")?.as_i64()?,
            ))),
            _ => None,
        }
    }

    fn infer_from_json(value: &Json) -> Option<Self> {
        match value {
            Json::Bool(b) => Some(PropertyValue::Bool(*b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(PropertyValue::Int(i))
                } else {
                    n.as_f64().map(PropertyValue::Float)
                }
            }
            Json::String(s) => Some(PropertyValue::String(s.clone())),
            Json::Array(items) => Some(PropertyValue::List(
                items.iter().filter_map(Self::infer_from_json).collect(),
            )),
            Json::Object(map) => Some(PropertyValue::Dict(
                map.iter()
                    .filter_map(|(k, v)| Self::infer_from_json(v).map(|pv| (k.clone(), pv)))
                    .collect(),
            )),
            Json::Null => None,
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        use PropertyValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (String(a), String(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Ratio(a), Ratio(b)) => a == b,
            (Struct { type_name: at, fields: af }, Struct { type_name: bt, fields: bf }) => {
                at == bt && af.iter().all(|(k, v)| bf.get(k) == Some(v)) && af.len() == bf.len()
            }
            (Enumeration { type_name: at, variant: av }, Enumeration { type_name: bt, variant: bv }) => {
                at == bt && av == bv
            }
            (Dict(a), Dict(b)) => a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v)),
            _ => false,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trips_scalars() {
        let v = PropertyValue::Int(42);
        assert_eq!(v.to_json(), Json::from(42));
        let back = PropertyValue::from_json_scalar(&v.to_json(), ValueType::Int).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn list_equality_ignores_vec_identity() {
        let a = PropertyValue::List(vec![PropertyValue::Int(1), PropertyValue::Int(2)]);
        let b = PropertyValue::List(vec![PropertyValue::Int(1), PropertyValue::Int(2)]);
        assert_eq!(a, b);
    }
}
