//! State upgrade pipeline
//!
//! Persisted state is decoded from whichever legacy encoding it was written
//! in, then coerced to the current schema. A state written by a newer schema
//! than the provider knows is refused rather than silently truncated.

use crate::protocol::{RawState, UpgradeResourceStateRequest, UpgradeResourceStateResponse};
use stratum_core::flatmap::from_flatmap;
use stratum_core::json::from_json;
use stratum_core::{Category, Diagnostic, Result, Schema, Value};
use tracing::debug;

/// Upgrade `req.raw_state` to `schema`.
pub fn upgrade_state(schema: &Schema, req: &UpgradeResourceStateRequest) -> UpgradeResourceStateResponse {
    let mut resp = UpgradeResourceStateResponse::default();

    if req.version > schema.version {
        resp.diagnostics.push(
            Diagnostic::error(format!(
                "State of {:?} was written by schema version {}, newer than the provider's version {}",
                req.type_name, req.version, schema.version
            ))
            .with_category(Category::UpgradeFailure),
        );
        return resp;
    }

    debug!(
        type_name = %req.type_name,
        format = req.raw_state.format(),
        from_version = req.version,
        to_version = schema.version,
        "upgrading resource state"
    );

    match decode(schema, &req.raw_state) {
        Ok(state) => resp.upgraded_state = state,
        Err(err) => resp
            .diagnostics
            .push(Diagnostic::from(err).with_category(Category::UpgradeFailure)),
    }
    resp
}

fn decode(schema: &Schema, raw: &RawState) -> Result<Value> {
    let ty = schema.implied_type();
    let decoded = match raw {
        RawState::Flatmap(map) => from_flatmap(map, &ty)?,
        RawState::Json(bytes) if bytes.is_empty() => return Ok(Value::Null),
        RawState::Json(bytes) => from_json(bytes, &ty)?,
    };
    schema.block.coerce_value(&decoded)
}
