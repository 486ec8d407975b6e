//! Structured JSON state encoding
//!
//! Decoding is driven by the target type: absent object keys become null,
//! undeclared keys are rejected and numbers are read as exact decimals.
//! Unknown values have no JSON form and cannot be encoded.

use crate::error::{CoreError, Result};
use crate::path::Path;
use crate::types::Type;
use crate::value::{NULL, Value};
use bigdecimal::BigDecimal;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Decode JSON bytes as a value of type `ty`.
pub fn from_json(bytes: &[u8], ty: &Type) -> Result<Value> {
    let raw: Json = serde_json::from_slice(bytes).map_err(|e| CoreError::Json(e.to_string()))?;
    decode(&Path::root(), &raw, ty)
}

/// Encode a wholly known value of type `ty` as JSON bytes.
pub fn to_json(value: &Value, ty: &Type) -> Result<Vec<u8>> {
    let json = encode(&Path::root(), value, ty)?;
    serde_json::to_vec(&json).map_err(|e| CoreError::Json(e.to_string()))
}

fn decode(path: &Path, raw: &Json, ty: &Type) -> Result<Value> {
    let mismatch = |expected: &str| {
        CoreError::type_mismatch(path, format!("{expected} required in JSON state"))
    };
    match (raw, ty) {
        (Json::Null, _) => Ok(Value::Null),
        (Json::Bool(b), Type::Bool) => Ok(Value::Bool(*b)),
        (Json::Number(n), Type::Number) => BigDecimal::from_str(&n.to_string())
            .map(Value::Number)
            .map_err(|_| mismatch("number")),
        (Json::String(s), Type::String) => Ok(Value::String(s.clone())),
        (Json::Array(items), Type::List(element)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(decode(&path.index(i), item, element)?);
            }
            Ok(Value::List(out))
        }
        (Json::Array(items), Type::Set(element)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(decode(&path.index(i), item, element)?);
            }
            Ok(Value::set(out))
        }
        (Json::Object(entries), Type::Map(element)) => {
            let mut out = BTreeMap::new();
            for (key, item) in entries {
                out.insert(key.clone(), decode(&path.key(key.as_str()), item, element)?);
            }
            Ok(Value::Map(out))
        }
        (Json::Object(entries), Type::Object(attr_types)) => {
            if let Some(name) = entries.keys().find(|k| !attr_types.contains_key(*k)) {
                return Err(CoreError::UnsupportedAttribute {
                    path: path.clone(),
                    name: name.clone(),
                });
            }
            let mut out = BTreeMap::new();
            for (name, attr_ty) in attr_types {
                let value = match entries.get(name) {
                    Some(item) => decode(&path.attr(name.as_str()), item, attr_ty)?,
                    None => Value::Null,
                };
                out.insert(name.clone(), value);
            }
            Ok(Value::Map(out))
        }
        (_, ty) => Err(mismatch(&ty.to_string())),
    }
}

fn encode(path: &Path, value: &Value, ty: &Type) -> Result<Json> {
    match (value, ty) {
        (Value::Null, _) => Ok(Json::Null),
        (Value::Unknown, _) => Err(CoreError::type_mismatch(
            path,
            "value is not known and cannot be written to JSON state",
        )),
        (Value::Bool(b), Type::Bool) => Ok(Json::Bool(*b)),
        (Value::Number(n), Type::Number) => serde_json::Number::from_str(&n.to_string())
            .map(Json::Number)
            .map_err(|e| CoreError::Json(e.to_string())),
        (Value::String(s), Type::String) => Ok(Json::String(s.clone())),
        (Value::List(items), Type::List(element)) | (Value::Set(items), Type::Set(element)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(encode(&path.index(i), item, element)?);
            }
            Ok(Json::Array(out))
        }
        (Value::Map(entries), Type::Map(element)) => {
            let mut out = serde_json::Map::new();
            for (key, item) in entries {
                out.insert(key.clone(), encode(&path.key(key.as_str()), item, element)?);
            }
            Ok(Json::Object(out))
        }
        (Value::Map(attrs), Type::Object(attr_types)) => {
            let mut out = serde_json::Map::new();
            for (name, attr_ty) in attr_types {
                let item = attrs.get(name).unwrap_or(&NULL);
                out.insert(name.clone(), encode(&path.attr(name.as_str()), item, attr_ty)?);
            }
            if let Some(name) = attrs.keys().find(|k| !attr_types.contains_key(*k)) {
                return Err(CoreError::UnsupportedAttribute {
                    path: path.clone(),
                    name: name.clone(),
                });
            }
            Ok(Json::Object(out))
        }
        (value, ty) => Err(CoreError::type_mismatch(
            path,
            format!("{} required, found {}", ty, value.kind()),
        )),
    }
}
