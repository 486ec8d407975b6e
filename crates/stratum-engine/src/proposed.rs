//! Proposed new state
//!
//! What the engine asks the provider to plan: the configuration, with
//! computed attributes that the configuration leaves unset carried over from
//! the prior state.

use stratum_core::{Block, Result, Value, transform};

pub fn proposed_new_state(block: &Block, prior: &Value, config: &Value) -> Result<Value> {
    if config.is_null() {
        return Ok(Value::Null);
    }
    let config = block.coerce_value(config)?;
    if prior.is_null() || prior.is_unknown() {
        return Ok(config);
    }
    transform(config, &block.implied_type(), |path, _, v| {
        if !v.is_null() {
            return Ok(v);
        }
        match block.attribute_by_path(path) {
            Some(attr) if attr.computed => Ok(path.apply(prior).cloned().unwrap_or(v)),
            _ => Ok(v),
        }
    })
}
