//! Structural value transforms
//!
//! A depth-first, post-order walk of a value alongside its type. Known,
//! non-null containers have their children visited (and rebuilt) before the
//! visitor sees the container itself; null and unknown values are handed to
//! the visitor without descending.

use crate::error::{CoreError, Result};
use crate::path::Path;
use crate::types::Type;
use crate::value::Value;
use std::collections::BTreeMap;

/// Walk `value` as an instance of `ty`, replacing every node with the
/// visitor's result.
///
/// The visitor receives the path of the node, its type and the (already
/// transformed) node, and returns either the node unchanged or a replacement.
pub fn transform<F>(value: Value, ty: &Type, mut visit: F) -> Result<Value>
where
    F: FnMut(&Path, &Type, Value) -> Result<Value>,
{
    walk(&Path::root(), ty, value, &mut visit)
}

fn walk<F>(path: &Path, ty: &Type, value: Value, visit: &mut F) -> Result<Value>
where
    F: FnMut(&Path, &Type, Value) -> Result<Value>,
{
    let rebuilt = match (value, ty) {
        (value @ (Value::Null | Value::Unknown), _) => value,
        (value @ Value::Bool(_), Type::Bool)
        | (value @ Value::Number(_), Type::Number)
        | (value @ Value::String(_), Type::String) => value,
        (Value::List(items), Type::List(element)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                out.push(walk(&path.index(i), element, item, visit)?);
            }
            Value::List(out)
        }
        (Value::Set(items), Type::Set(element)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let child = path.element(item.clone());
                out.push(walk(&child, element, item, visit)?);
            }
            Value::set(out)
        }
        (Value::Map(entries), Type::Map(element)) => {
            let mut out = BTreeMap::new();
            for (key, item) in entries {
                let child = path.key(key.as_str());
                out.insert(key, walk(&child, element, item, visit)?);
            }
            Value::Map(out)
        }
        (Value::Map(attrs), Type::Object(attr_types)) => {
            let mut out = BTreeMap::new();
            for (name, item) in attrs {
                let attr_ty = attr_types.get(&name).ok_or_else(|| {
                    CoreError::UnsupportedAttribute {
                        path: path.clone(),
                        name: name.clone(),
                    }
                })?;
                let child = path.attr(name.as_str());
                out.insert(name, walk(&child, attr_ty, item, visit)?);
            }
            Value::Map(out)
        }
        (value, ty) => {
            return Err(CoreError::type_mismatch(
                path,
                format!("{} required, found {}", ty, value.kind()),
            ));
        }
    };
    visit(path, ty, rebuilt)
}
