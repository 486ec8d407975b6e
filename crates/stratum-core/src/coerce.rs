//! Coercion of values to a schema's shape
//!
//! Coercion is lenient: attributes absent from the input are filled with
//! null, missing nested collections become empty, and primitive values are
//! converted where the conversion is lossless. Undeclared attributes and
//! impossible conversions are still errors.

use crate::error::{CoreError, Result};
use crate::path::Path;
use crate::schema::{Block, NestingMode};
use crate::types::Type;
use crate::value::{NULL, Value};
use bigdecimal::BigDecimal;
use std::collections::BTreeMap;
use std::str::FromStr;

impl Block {
    /// Adjust `value` to conform to this block's implied type.
    ///
    /// Coercing a value that already conforms returns an equal value.
    pub fn coerce_value(&self, value: &Value) -> Result<Value> {
        self.coerce_at(&Path::root(), value)
    }

    fn coerce_at(&self, path: &Path, value: &Value) -> Result<Value> {
        let attrs = match value {
            Value::Null => return Ok(Value::Null),
            Value::Unknown => return Ok(Value::Unknown),
            Value::Map(attrs) => attrs,
            other => {
                return Err(CoreError::type_mismatch(
                    path,
                    format!("an object is required, found {}", other.kind()),
                ));
            }
        };

        if let Some(name) = attrs
            .keys()
            .find(|k| !self.attributes.contains_key(*k) && !self.block_types.contains_key(*k))
        {
            return Err(CoreError::UnsupportedAttribute {
                path: path.clone(),
                name: name.clone(),
            });
        }

        let mut out = BTreeMap::new();
        for (name, attr) in &self.attributes {
            let raw = attrs.get(name).unwrap_or(&NULL);
            out.insert(name.clone(), convert_at(&path.attr(name.as_str()), raw, &attr.ty)?);
        }

        for (name, nested) in &self.block_types {
            let child = path.attr(name.as_str());
            let raw = attrs.get(name).unwrap_or(&NULL);
            let coerced = match (nested.nesting, raw) {
                (_, Value::Unknown) => Value::Unknown,
                (NestingMode::Single, Value::Null) => Value::Null,
                (NestingMode::Single, v) => nested.block.coerce_at(&child, v)?,
                (NestingMode::List, Value::Null) => Value::List(Vec::new()),
                (NestingMode::Set, Value::Null) => Value::Set(Vec::new()),
                (NestingMode::Map, Value::Null) => Value::empty_map(),
                (NestingMode::List, Value::List(items) | Value::Set(items)) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        out.push(nested.block.coerce_at(&child.index(i), item)?);
                    }
                    Value::List(out)
                }
                (NestingMode::Set, Value::List(items) | Value::Set(items)) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(nested.block.coerce_at(&child.element(item.clone()), item)?);
                    }
                    Value::set(out)
                }
                (NestingMode::Map, Value::Map(entries)) => {
                    let mut out = BTreeMap::new();
                    for (key, item) in entries {
                        out.insert(
                            key.clone(),
                            nested.block.coerce_at(&child.key(key.as_str()), item)?,
                        );
                    }
                    Value::Map(out)
                }
                (nesting, other) => {
                    return Err(CoreError::type_mismatch(
                        &child,
                        format!("a {} block is required, found {}", nesting, other.kind()),
                    ));
                }
            };

            if let Some(count) = coerced.elements().map(|e| e.len()).or_else(|| {
                coerced.as_map().filter(|_| nested.nesting == NestingMode::Map).map(|m| m.len())
            }) {
                if count < nested.min_items {
                    return Err(CoreError::type_mismatch(
                        &child,
                        format!("insufficient items: at least {} required", nested.min_items),
                    ));
                }
                if nested.max_items.is_some_and(|max| count > max) {
                    return Err(CoreError::type_mismatch(
                        &child,
                        format!("too many items: at most {} allowed", nested.max_items.unwrap_or(0)),
                    ));
                }
            }
            out.insert(name.clone(), coerced);
        }

        Ok(Value::Map(out))
    }
}

/// Convert `value` to `ty`, applying lossless primitive conversions.
pub fn convert(value: &Value, ty: &Type) -> Result<Value> {
    convert_at(&Path::root(), value, ty)
}

pub(crate) fn convert_at(path: &Path, value: &Value, ty: &Type) -> Result<Value> {
    match (value, ty) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::Unknown, _) => Ok(Value::Unknown),

        (Value::String(_), Type::String)
        | (Value::Number(_), Type::Number)
        | (Value::Bool(_), Type::Bool) => Ok(value.clone()),
        (Value::Number(n), Type::String) => Ok(Value::String(n.to_string())),
        (Value::Bool(b), Type::String) => Ok(Value::String(b.to_string())),
        (Value::String(s), Type::Number) => BigDecimal::from_str(s.trim())
            .map(Value::Number)
            .map_err(|_| CoreError::type_mismatch(path, format!("a number is required, found {s:?}"))),
        (Value::String(s), Type::Bool) => match s.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(CoreError::type_mismatch(
                path,
                format!("a bool is required, found {s:?}"),
            )),
        },

        (Value::List(items) | Value::Set(items), Type::List(element)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(convert_at(&path.index(i), item, element)?);
            }
            Ok(Value::List(out))
        }
        (Value::List(items) | Value::Set(items), Type::Set(element)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(convert_at(&path.element(item.clone()), item, element)?);
            }
            Ok(Value::set(out))
        }
        (Value::Map(entries), Type::Map(element)) => {
            let mut out = BTreeMap::new();
            for (key, item) in entries {
                out.insert(key.clone(), convert_at(&path.key(key.as_str()), item, element)?);
            }
            Ok(Value::Map(out))
        }
        (Value::Map(attrs), Type::Object(attr_types)) => {
            if let Some(name) = attrs.keys().find(|k| !attr_types.contains_key(*k)) {
                return Err(CoreError::UnsupportedAttribute {
                    path: path.clone(),
                    name: name.clone(),
                });
            }
            let mut out = BTreeMap::new();
            for (name, attr_ty) in attr_types {
                let raw = attrs.get(name).unwrap_or(&NULL);
                out.insert(name.clone(), convert_at(&path.attr(name.as_str()), raw, attr_ty)?);
            }
            Ok(Value::Map(out))
        }

        (value, ty) => Err(CoreError::type_mismatch(
            path,
            format!("{} required, found {}", ty, value.kind()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, NestedBlock};

    fn block() -> Block {
        Block::new()
            .with_attribute("id", Attribute::computed(Type::String))
            .with_attribute("name", Attribute::required(Type::String))
            .with_attribute("count", Attribute::optional(Type::Number))
            .with_block(
                "rule",
                NestedBlock::new(
                    NestingMode::List,
                    Block::new().with_attribute("port", Attribute::required(Type::Number)),
                ),
            )
            .with_block(
                "lifecycle",
                NestedBlock::new(
                    NestingMode::Single,
                    Block::new().with_attribute("keep", Attribute::optional(Type::Bool)),
                ),
            )
    }

    #[test]
    fn test_fills_absent_attributes() {
        let out = block()
            .coerce_value(&Value::object([("name", Value::from("web"))]))
            .unwrap();
        assert!(out.get_attr("id").is_null());
        assert!(out.get_attr("count").is_null());
        assert_eq!(out.get_attr("rule"), &Value::List(vec![]));
        assert!(out.get_attr("lifecycle").is_null());
    }

    #[test]
    fn test_converts_primitives() {
        let out = block()
            .coerce_value(&Value::object([
                ("name", Value::from(5)),
                ("count", Value::from("12")),
                (
                    "rule",
                    Value::list(vec![Value::object([("port", Value::from("443"))])]),
                ),
            ]))
            .unwrap();
        assert_eq!(out.get_attr("name"), &Value::from("5"));
        assert_eq!(out.get_attr("count"), &Value::from(12));
        let rule = &out.get_attr("rule").elements().unwrap()[0];
        assert_eq!(rule.get_attr("port"), &Value::from(443));
    }

    #[test]
    fn test_idempotent_on_conforming_value() {
        let v = block()
            .coerce_value(&Value::object([
                ("name", Value::from("web")),
                ("id", Value::Unknown),
                ("lifecycle", Value::object([("keep", Value::from(true))])),
            ]))
            .unwrap();
        assert_eq!(block().coerce_value(&v).unwrap(), v);
    }

    #[test]
    fn test_rejects_undeclared_and_bad_conversions() {
        let err = block()
            .coerce_value(&Value::object([("bogus", Value::from("x"))]))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedAttribute { .. }));

        let err = block()
            .coerce_value(&Value::object([("count", Value::from("many"))]))
            .unwrap_err();
        assert!(err.to_string().contains("a number is required"));

        assert!(block().coerce_value(&Value::from("flat")).is_err());
    }

    #[test]
    fn test_item_bounds() {
        let block = Block::new().with_block(
            "rule",
            NestedBlock::new(NestingMode::List, Block::new()).with_items(1, Some(1)),
        );
        assert!(block.coerce_value(&Value::empty_map()).is_err());
        let two = Value::object([(
            "rule",
            Value::list(vec![Value::empty_map(), Value::empty_map()]),
        )]);
        assert!(block.coerce_value(&two).is_err());
    }

    #[test]
    fn test_null_and_unknown_pass_through() {
        assert_eq!(block().coerce_value(&Value::Null).unwrap(), Value::Null);
        assert_eq!(block().coerce_value(&Value::Unknown).unwrap(), Value::Unknown);
    }
}
