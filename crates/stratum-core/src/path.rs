//! Attribute paths into a value tree

use crate::error::{CoreError, Result};
use crate::value::{NULL, Value};
use serde::{Deserialize, Serialize};

/// One step of a [`Path`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStep {
    /// Object attribute
    Attr(String),
    /// List element
    Index(usize),
    /// Map entry
    Key(String),
    /// Set member, addressed by its own value
    Element(Value),
}

/// A location inside a value, from the root object downwards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path(Vec<PathStep>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn last(&self) -> Option<&PathStep> {
        self.0.last()
    }

    /// A copy of this path extended by `step`
    pub fn child(&self, step: PathStep) -> Self {
        let mut steps = Vec::with_capacity(self.0.len() + 1);
        steps.extend_from_slice(&self.0);
        steps.push(step);
        Self(steps)
    }

    pub fn attr(&self, name: impl Into<String>) -> Self {
        self.child(PathStep::Attr(name.into()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.child(PathStep::Index(index))
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(PathStep::Key(key.into()))
    }

    pub fn element(&self, value: Value) -> Self {
        self.child(PathStep::Element(value))
    }

    /// Follow the path into `value`.
    ///
    /// Fails when an intermediate value is null or unknown, when an index or
    /// key does not exist, and on set members, which cannot be addressed
    /// positionally. Absent object attributes resolve to null.
    pub fn apply<'a>(&self, value: &'a Value) -> Result<&'a Value> {
        let mut current = value;
        for (i, step) in self.0.iter().enumerate() {
            let at = Path(self.0[..i].to_vec());
            match current {
                Value::Null => {
                    return Err(CoreError::invalid_path(&at, "attempt to traverse a null value"));
                }
                Value::Unknown => {
                    return Err(CoreError::invalid_path(
                        &at,
                        "attempt to traverse an unknown value",
                    ));
                }
                _ => {}
            }
            current = match (step, current) {
                (PathStep::Attr(name), Value::Map(attrs)) => attrs.get(name).unwrap_or(&NULL),
                (PathStep::Key(key), Value::Map(entries)) => entries
                    .get(key)
                    .ok_or_else(|| CoreError::invalid_path(&at, format!("no entry for key {key:?}")))?,
                (PathStep::Index(idx), Value::List(items)) => items.get(*idx).ok_or_else(|| {
                    CoreError::invalid_path(&at, format!("index {idx} out of range"))
                })?,
                (PathStep::Element(_), Value::Set(_)) => {
                    return Err(CoreError::invalid_path(&at, "set members cannot be indexed"));
                }
                (step, value) => {
                    return Err(CoreError::invalid_path(
                        &at,
                        format!("cannot apply {step:?} to a {}", value.kind()),
                    ));
                }
            };
        }
        Ok(current)
    }
}

impl From<Vec<PathStep>> for Path {
    fn from(steps: Vec<PathStep>) -> Self {
        Self(steps)
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "root");
        }
        for step in &self.0 {
            match step {
                PathStep::Attr(name) => write!(f, ".{}", name)?,
                PathStep::Index(i) => write!(f, "[{}]", i)?,
                PathStep::Key(k) => write!(f, "[{:?}]", k)?,
                PathStep::Element(v) => write!(f, "[{}]", v.kind())?,
            }
        }
        Ok(())
    }
}
