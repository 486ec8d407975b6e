//! Legacy flatmap state encoding
//!
//! Flatmap stores a whole object as a single-level map of dotted keys to
//! strings:
//!
//! ```text
//! name            = "web"
//! ports.#         = "2"        list/set count
//! ports.0         = "80"
//! tags.%          = "1"        map count
//! tags.env        = "prod"
//! disk.0.size     = "20"       nested block inside a list
//! ```
//!
//! Absent keys decode to null and the [`UNKNOWN_VALUE`] sentinel decodes to
//! unknown.

use crate::error::{CoreError, Result};
use crate::types::Type;
use crate::value::Value;
use bigdecimal::BigDecimal;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Placeholder written for values not known until apply
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// Decode a flatmap into a value of object type `ty`.
pub fn from_flatmap(map: &BTreeMap<String, String>, ty: &Type) -> Result<Value> {
    let Type::Object(attrs) = ty else {
        return Err(CoreError::Flatmap {
            key: String::new(),
            message: format!("an object type is required at the root, found {}", ty),
        });
    };
    decode_object(map, "", attrs)
}

/// Encode an object value as a flatmap. Unknown values become the sentinel,
/// nulls are omitted.
pub fn to_flatmap(value: &Value, ty: &Type) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    match (value, ty) {
        (Value::Null, _) => {}
        (Value::Map(_), Type::Object(_)) => encode(&mut out, "", value, ty)?,
        (other, _) => {
            return Err(CoreError::Flatmap {
                key: String::new(),
                message: format!("an object is required at the root, found {}", other.kind()),
            });
        }
    }
    Ok(out)
}

fn decode_object(
    map: &BTreeMap<String, String>,
    prefix: &str,
    attrs: &BTreeMap<String, Type>,
) -> Result<Value> {
    let mut out = BTreeMap::new();
    for (name, attr_ty) in attrs {
        let key = format!("{prefix}{name}");
        out.insert(name.clone(), decode_value(map, &key, attr_ty)?);
    }
    Ok(Value::Map(out))
}

fn decode_value(map: &BTreeMap<String, String>, key: &str, ty: &Type) -> Result<Value> {
    match ty {
        Type::Bool | Type::Number | Type::String => decode_primitive(map, key, ty),
        Type::Object(attrs) => {
            if map.get(key).is_some_and(|v| v == UNKNOWN_VALUE) {
                return Ok(Value::Unknown);
            }
            let prefix = format!("{key}.");
            if !map.keys().any(|k| k.starts_with(&prefix)) {
                return Ok(Value::Null);
            }
            decode_object(map, &prefix, attrs)
        }
        Type::List(element) => {
            let Some(count) = decode_count(map, key, "#")? else {
                return Ok(container_absent(map, key));
            };
            let Some(count) = count else {
                return Ok(Value::Unknown);
            };
            let mut items = Vec::with_capacity(count);
            for i in 0..count {
                items.push(decode_element(map, &format!("{key}.{i}"), element)?);
            }
            Ok(Value::List(items))
        }
        Type::Set(element) => {
            let Some(count) = decode_count(map, key, "#")? else {
                return Ok(container_absent(map, key));
            };
            let Some(count) = count else {
                return Ok(Value::Unknown);
            };
            let prefix = format!("{key}.");
            let mut items = Vec::new();
            for member in member_keys(map, &prefix, "#", element) {
                items.push(decode_element(map, &format!("{prefix}{member}"), element)?);
            }
            if items.len() != count {
                return Err(CoreError::Flatmap {
                    key: format!("{key}.#"),
                    message: format!("count {} does not match {} members", count, items.len()),
                });
            }
            Ok(Value::set(items))
        }
        Type::Map(element) => {
            let Some(count) = decode_count(map, key, "%")? else {
                return Ok(container_absent(map, key));
            };
            let Some(count) = count else {
                return Ok(Value::Unknown);
            };
            let prefix = format!("{key}.");
            let mut entries = BTreeMap::new();
            for member in member_keys(map, &prefix, "%", element) {
                let value = decode_element(map, &format!("{prefix}{member}"), element)?;
                entries.insert(member, value);
            }
            if entries.len() != count {
                return Err(CoreError::Flatmap {
                    key: format!("{key}.%"),
                    message: format!("count {} does not match {} entries", count, entries.len()),
                });
            }
            Ok(Value::Map(entries))
        }
    }
}

/// Collection members are never null objects: their presence is recorded by
/// the parent's count.
fn decode_element(map: &BTreeMap<String, String>, key: &str, ty: &Type) -> Result<Value> {
    match ty {
        Type::Object(attrs) => decode_object(map, &format!("{key}."), attrs),
        _ => decode_value(map, key, ty),
    }
}

fn container_absent(map: &BTreeMap<String, String>, key: &str) -> Value {
    if map.get(key).is_some_and(|v| v == UNKNOWN_VALUE) {
        Value::Unknown
    } else {
        Value::Null
    }
}

/// `Ok(None)` when the count key is absent, `Ok(Some(None))` when unknown.
fn decode_count(
    map: &BTreeMap<String, String>,
    key: &str,
    marker: &str,
) -> Result<Option<Option<usize>>> {
    let count_key = format!("{key}.{marker}");
    let Some(raw) = map.get(&count_key) else {
        return Ok(None);
    };
    if raw == UNKNOWN_VALUE {
        return Ok(Some(None));
    }
    raw.parse::<usize>()
        .map(|n| Some(Some(n)))
        .map_err(|_| CoreError::Flatmap {
            key: count_key,
            message: format!("invalid count {raw:?}"),
        })
}

/// Distinct member names directly under `prefix`. Primitive members keep the
/// full remainder of the key, so map keys may contain dots.
fn member_keys(
    map: &BTreeMap<String, String>,
    prefix: &str,
    marker: &str,
    element: &Type,
) -> BTreeSet<String> {
    map.keys()
        .filter_map(|k| k.strip_prefix(prefix))
        .filter(|rest| *rest != marker)
        .map(|rest| {
            if element.is_primitive() {
                rest.to_string()
            } else {
                rest.split('.').next().unwrap_or(rest).to_string()
            }
        })
        .collect()
}

fn decode_primitive(map: &BTreeMap<String, String>, key: &str, ty: &Type) -> Result<Value> {
    let Some(raw) = map.get(key) else {
        return Ok(Value::Null);
    };
    if raw == UNKNOWN_VALUE {
        return Ok(Value::Unknown);
    }
    let bad = |what: &str| CoreError::Flatmap {
        key: key.to_string(),
        message: format!("{raw:?} is not a valid {what}"),
    };
    match ty {
        Type::String => Ok(Value::String(raw.clone())),
        Type::Number => BigDecimal::from_str(raw)
            .map(Value::Number)
            .map_err(|_| bad("number")),
        Type::Bool => match raw.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(bad("bool")),
        },
        _ => Err(bad("primitive")),
    }
}

fn encode(out: &mut BTreeMap<String, String>, key: &str, value: &Value, ty: &Type) -> Result<()> {
    let mismatch = || CoreError::Flatmap {
        key: key.to_string(),
        message: format!("{} required, found {}", ty, value.kind()),
    };
    match (value, ty) {
        (Value::Null, _) => {}
        (Value::Unknown, Type::List(_) | Type::Set(_)) => {
            out.insert(format!("{key}.#"), UNKNOWN_VALUE.to_string());
        }
        (Value::Unknown, Type::Map(_)) => {
            out.insert(format!("{key}.%"), UNKNOWN_VALUE.to_string());
        }
        (Value::Unknown, _) => {
            out.insert(key.to_string(), UNKNOWN_VALUE.to_string());
        }
        (Value::String(s), Type::String) => {
            out.insert(key.to_string(), s.clone());
        }
        (Value::Number(n), Type::Number) => {
            out.insert(key.to_string(), n.to_string());
        }
        (Value::Bool(b), Type::Bool) => {
            out.insert(key.to_string(), b.to_string());
        }
        (Value::List(items) | Value::Set(items), Type::List(element) | Type::Set(element)) => {
            if matches!(value, Value::List(_)) != matches!(ty, Type::List(_)) {
                return Err(mismatch());
            }
            out.insert(format!("{key}.#"), items.len().to_string());
            for (i, item) in items.iter().enumerate() {
                encode(out, &format!("{key}.{i}"), item, element)?;
            }
        }
        (Value::Map(entries), Type::Map(element)) => {
            if entries.contains_key("%") {
                return Err(CoreError::Flatmap {
                    key: format!("{key}.%"),
                    message: "map key \"%\" collides with the entry count".to_string(),
                });
            }
            out.insert(format!("{key}.%"), entries.len().to_string());
            for (k, item) in entries {
                encode(out, &format!("{key}.{k}"), item, element)?;
            }
        }
        (Value::Map(attrs), Type::Object(attr_types)) => {
            let prefix = if key.is_empty() {
                String::new()
            } else {
                format!("{key}.")
            };
            for (name, item) in attrs {
                let attr_ty = attr_types.get(name).ok_or_else(|| CoreError::Flatmap {
                    key: format!("{prefix}{name}"),
                    message: "unsupported attribute".to_string(),
                })?;
                encode(out, &format!("{prefix}{name}"), item, attr_ty)?;
            }
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}
