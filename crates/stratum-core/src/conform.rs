//! Strict type conformance
//!
//! This is the check a wire encoder performs before a value leaves the
//! process: no conversions, no undeclared attributes. Null and unknown
//! conform to every type. Object attributes absent from the value are
//! treated as null.

use crate::error::{CoreError, Result};
use crate::path::Path;
use crate::types::Type;
use crate::value::Value;

/// Check that `value` is an instance of `ty`.
pub fn conform(value: &Value, ty: &Type) -> Result<()> {
    conform_at(&Path::root(), value, ty)
}

fn conform_at(path: &Path, value: &Value, ty: &Type) -> Result<()> {
    match (value, ty) {
        (Value::Null | Value::Unknown, _) => Ok(()),
        (Value::Bool(_), Type::Bool)
        | (Value::Number(_), Type::Number)
        | (Value::String(_), Type::String) => Ok(()),
        (Value::List(items), Type::List(element)) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| conform_at(&path.index(i), item, element)),
        (Value::Set(items), Type::Set(element)) => items
            .iter()
            .try_for_each(|item| conform_at(&path.element(item.clone()), item, element)),
        (Value::Map(entries), Type::Map(element)) => entries
            .iter()
            .try_for_each(|(key, item)| conform_at(&path.key(key.as_str()), item, element)),
        (Value::Map(attrs), Type::Object(attr_types)) => {
            for (name, item) in attrs {
                let attr_ty = attr_types
                    .get(name)
                    .ok_or_else(|| CoreError::UnsupportedAttribute {
                        path: path.clone(),
                        name: name.clone(),
                    })?;
                conform_at(&path.attr(name.as_str()), item, attr_ty)?;
            }
            Ok(())
        }
        (value, ty) => Err(CoreError::type_mismatch(
            path,
            format!("{} required, found {}", ty, value.kind()),
        )),
    }
}
