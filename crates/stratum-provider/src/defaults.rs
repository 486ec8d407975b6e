//! Default plan and apply policy
//!
//! Providers without their own diff logic fall back to these. Both keep two
//! guarantees: a destroy never produces a non-null value, and apply never
//! returns an unknown value for a non-destroy change.

use crate::protocol::{
    ApplyResourceChangeRequest, ApplyResourceChangeResponse, PlanResourceChangeRequest,
    PlanResourceChangeResponse,
};
use stratum_core::{BigDecimal, Block, Diagnostic, Result, Schema, Type, Value, transform};

/// Default PlanResourceChange.
///
/// Accepts the proposed state, marking unset computed attributes, and
/// optional+computed attributes that were removed from configuration, as
/// unknown.
pub fn plan(schema: &Schema, req: &PlanResourceChangeRequest) -> PlanResourceChangeResponse {
    let mut resp = PlanResourceChangeResponse {
        planned_private: req.prior_private.clone(),
        ..Default::default()
    };
    if req.proposed_new_state.is_null() {
        return resp;
    }
    match planned_state(&schema.block, &req.proposed_new_state, &req.config) {
        Ok(planned) => resp.planned_state = planned,
        Err(err) => {
            resp.planned_private.clear();
            resp.diagnostics.push(Diagnostic::from(err));
        }
    }
    resp
}

/// The structural part of the default plan.
pub fn planned_state(block: &Block, proposed: &Value, config: &Value) -> Result<Value> {
    let proposed = block.coerce_value(proposed)?;
    transform(proposed, &block.implied_type(), |path, _, v| {
        if v.is_unknown() {
            return Ok(v);
        }
        let Some(attr) = block.attribute_by_path(path) else {
            return Ok(v);
        };
        // Paths that cannot be followed into the config are left as proposed.
        let Ok(config_value) = path.apply(config) else {
            return Ok(v);
        };
        if attr.is_computed_only() && v.is_null() {
            return Ok(Value::Unknown);
        }
        if attr.computed && attr.optional && !v.is_null() && config_value.is_null() {
            return Ok(Value::Unknown);
        }
        Ok(v)
    })
}

/// Default ApplyResourceChange.
///
/// Replaces every unknown left in the plan with the zero value of its type.
pub fn apply(schema: &Schema, req: &ApplyResourceChangeRequest) -> ApplyResourceChangeResponse {
    let mut resp = ApplyResourceChangeResponse::default();
    if req.planned_state.is_null() {
        return resp;
    }
    match applied_state(&schema.implied_type(), &req.planned_state) {
        Ok(state) => {
            resp.new_state = state;
            resp.private = req.planned_private.clone();
        }
        Err(err) => resp.diagnostics.push(Diagnostic::from(err)),
    }
    resp
}

/// The structural part of the default apply.
pub fn applied_state(ty: &Type, planned: &Value) -> Result<Value> {
    transform(planned.clone(), ty, |_, ty, v| {
        if v.is_unknown() {
            Ok(zero_value(ty))
        } else {
            Ok(v)
        }
    })
}

/// Zero value of a type. Sets become the empty set; objects have no zero
/// and become null.
pub fn zero_value(ty: &Type) -> Value {
    match ty {
        Type::String => Value::String(String::new()),
        Type::Number => Value::Number(BigDecimal::from(0)),
        Type::Bool => Value::Bool(false),
        Type::Map(_) => Value::empty_map(),
        Type::List(_) => Value::List(Vec::new()),
        Type::Set(_) => Value::Set(Vec::new()),
        Type::Object(_) => Value::Null,
    }
}
