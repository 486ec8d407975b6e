//! Type model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The shape a [`Value`](crate::Value) must conform to.
///
/// Types are never written by hand in provider code; they are derived from a
/// [`Block`](crate::Block) through `implied_type()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Bool,
    Number,
    String,
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>),
    Object(BTreeMap<String, Type>),
}

impl Type {
    pub fn list(element: Type) -> Self {
        Type::List(Box::new(element))
    }

    pub fn set(element: Type) -> Self {
        Type::Set(Box::new(element))
    }

    pub fn map(element: Type) -> Self {
        Type::Map(Box::new(element))
    }

    pub fn object<K, I>(attributes: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Type)>,
    {
        Type::Object(
            attributes
                .into_iter()
                .map(|(k, t)| (k.into(), t))
                .collect(),
        )
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Bool | Type::Number | Type::String)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Type::Object(_))
    }

    /// Element type of a list, set or map
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::List(t) | Type::Set(t) | Type::Map(t) => Some(t),
            _ => None,
        }
    }

    /// Attribute type of an object
    pub fn attribute_type(&self, name: &str) -> Option<&Type> {
        match self {
            Type::Object(attrs) => attrs.get(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::List(t) => write!(f, "list of {}", t),
            Type::Set(t) => write!(f, "set of {}", t),
            Type::Map(t) => write!(f, "map of {}", t),
            Type::Object(_) => write!(f, "object"),
        }
    }
}
