//! Value model

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A typed, nullable, unknown-capable unit of data.
///
/// Objects and maps share the [`Value::Map`] representation; the governing
/// [`Type`](crate::Type) decides which rules apply. Sets are kept sorted and
/// de-duplicated (see [`Value::set`]) so that equality ignores member order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Null,
    /// Placeholder for a value only known after apply
    Unknown,
    Bool(bool),
    Number(BigDecimal),
    String(String),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

pub(crate) static NULL: Value = Value::Null;

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn number(n: impl Into<BigDecimal>) -> Self {
        Value::Number(n.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(items)
    }

    /// Build a set, sorting and de-duplicating its members.
    pub fn set(mut items: Vec<Value>) -> Self {
        items.sort();
        items.dedup();
        Value::Set(items)
    }

    /// Build an object value from `(attribute, value)` pairs.
    pub fn object<K, I>(attributes: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Build a map value from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::object(entries)
    }

    pub fn empty_map() -> Self {
        Value::Map(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn is_known(&self) -> bool {
        !self.is_unknown()
    }

    /// True when no unknown appears anywhere in the value.
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Value::Unknown => false,
            Value::List(items) | Value::Set(items) => items.iter().all(Value::is_wholly_known),
            Value::Map(entries) => entries.values().all(Value::is_wholly_known),
            _ => true,
        }
    }

    /// Attribute lookup on an object value. Absent attributes read as null.
    pub fn get_attr(&self, name: &str) -> &Value {
        match self {
            Value::Map(attrs) => attrs.get(name).unwrap_or(&NULL),
            _ => &NULL,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&BigDecimal> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Members of a list or set
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Short human name of the value's kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Unknown => "unknown",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(BigDecimal::from(n))
    }
}

impl From<BigDecimal> for Value {
    fn from(n: BigDecimal) -> Self {
        Value::Number(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_set_ignores_order_and_duplicates() {
        let a = Value::set(vec!["b".into(), "a".into(), "b".into()]);
        let b = Value::set(vec!["a".into(), "b".into()]);
        assert_eq!(a, b);
        assert_eq!(a.elements().map(|e| e.len()), Some(2));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let a = Value::Number(BigDecimal::from_str("1.50").unwrap());
        let b = Value::Number(BigDecimal::from_str("1.5").unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_wholly_known() {
        let v = Value::object([("a", Value::list(vec![Value::Unknown]))]);
        assert!(v.is_known());
        assert!(!v.is_wholly_known());
        assert!(Value::object([("a", Value::from(1))]).is_wholly_known());
    }

    #[test]
    fn test_get_attr_absent_is_null() {
        let v = Value::object([("name", Value::from("x"))]);
        assert_eq!(v.get_attr("name"), &Value::from("x"));
        assert!(v.get_attr("missing").is_null());
    }
}
