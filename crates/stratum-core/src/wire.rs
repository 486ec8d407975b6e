//! Wire form of a value
//!
//! [`DynamicValue`] is what crosses the process boundary. Encoding is only
//! possible for values that [`conform`](crate::conform) to the expected type,
//! which is how type bugs in a caller surface before a backend is contacted.

use crate::conform::conform;
use crate::error::{CoreError, Result};
use crate::types::Type;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A schema-checked, self-describing encoding of a [`Value`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicValue {
    bytes: Vec<u8>,
}

impl DynamicValue {
    pub fn encode(value: &Value, ty: &Type) -> Result<Self> {
        conform(value, ty)?;
        let bytes = serde_json::to_vec(value).map_err(|e| CoreError::Wire(e.to_string()))?;
        Ok(Self { bytes })
    }

    pub fn decode(&self, ty: &Type) -> Result<Value> {
        let value: Value =
            serde_json::from_slice(&self.bytes).map_err(|e| CoreError::Wire(e.to_string()))?;
        conform(&value, ty)?;
        Ok(value)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
