//! In-memory provider test double
//!
//! [`MockProvider`] answers every operation with the default policy, a canned
//! response or a callback, records each call, and enforces the configure
//! gate exactly as a real provider must. Each test builds its own instance.
//!
//! ```no_run
//! use stratum_provider::mock::MockProvider;
//! use stratum_provider::protocol::*;
//!
//! let mock = MockProvider::new(GetProviderSchemaResponse::new())
//!     .with_read_resource_fn(|req| ReadResourceResponse {
//!         new_state: req.prior_state.clone(),
//!         ..Default::default()
//!     });
//! ```

use crate::defaults;
use crate::error::{ProviderError, Result};
use crate::lifecycle::{Lifecycle, Operation};
use crate::protocol::*;
use crate::provider::Provider;
use crate::upgrade::upgrade_state;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use stratum_core::json::from_json;
use stratum_core::{Category, Diagnostic, Diagnostics, DynamicValue, Schema, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

type Callback<Req, Resp> = Arc<dyn Fn(&Req) -> Resp + Send + Sync>;

/// How the mock answers one operation
pub enum Responder<Req, Resp> {
    /// Built-in behaviour
    Default,
    /// Always return this response
    Canned(Resp),
    /// Compute the response from the request
    Func(Callback<Req, Resp>),
}

impl<Req, Resp> Default for Responder<Req, Resp> {
    fn default() -> Self {
        Responder::Default
    }
}

/// Call bookkeeping for one operation
#[derive(Debug, Clone)]
pub struct CallRecord<Req> {
    pub count: usize,
    pub last_request: Option<Req>,
}

impl<Req> Default for CallRecord<Req> {
    fn default() -> Self {
        Self {
            count: 0,
            last_request: None,
        }
    }
}

impl<Req: Clone> CallRecord<Req> {
    fn record(&mut self, req: &Req) {
        self.count += 1;
        self.last_request = Some(req.clone());
    }

    pub fn called(&self) -> bool {
        self.count > 0
    }
}

/// Snapshot of every call the mock has received
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    pub get_provider_schema: CallRecord<()>,
    pub validate_provider_config: CallRecord<ValidateProviderConfigRequest>,
    pub validate_resource_config: CallRecord<ValidateResourceConfigRequest>,
    pub validate_data_resource_config: CallRecord<ValidateDataResourceConfigRequest>,
    pub configure_provider: CallRecord<ConfigureProviderRequest>,
    pub upgrade_resource_state: CallRecord<UpgradeResourceStateRequest>,
    pub read_resource: CallRecord<ReadResourceRequest>,
    pub plan_resource_change: CallRecord<PlanResourceChangeRequest>,
    pub apply_resource_change: CallRecord<ApplyResourceChangeRequest>,
    pub import_resource_state: CallRecord<ImportResourceStateRequest>,
    pub move_resource_state: CallRecord<MoveResourceStateRequest>,
    pub read_data_source: CallRecord<ReadDataSourceRequest>,
    pub plan_action: CallRecord<PlanActionRequest>,
    pub apply_action: CallRecord<ApplyActionRequest>,
    pub call_function: CallRecord<CallFunctionRequest>,
    pub close: CallRecord<()>,
}

#[derive(Default)]
struct Responders {
    validate_provider_config: Responder<ValidateProviderConfigRequest, ValidateProviderConfigResponse>,
    validate_resource_config: Responder<ValidateResourceConfigRequest, ValidateResourceConfigResponse>,
    validate_data_resource_config:
        Responder<ValidateDataResourceConfigRequest, ValidateDataResourceConfigResponse>,
    configure_provider: Responder<ConfigureProviderRequest, ConfigureProviderResponse>,
    upgrade_resource_state: Responder<UpgradeResourceStateRequest, UpgradeResourceStateResponse>,
    read_resource: Responder<ReadResourceRequest, ReadResourceResponse>,
    plan_resource_change: Responder<PlanResourceChangeRequest, PlanResourceChangeResponse>,
    apply_resource_change: Responder<ApplyResourceChangeRequest, ApplyResourceChangeResponse>,
    import_resource_state: Responder<ImportResourceStateRequest, ImportResourceStateResponse>,
    move_resource_state: Responder<MoveResourceStateRequest, MoveResourceStateResponse>,
    read_data_source: Responder<ReadDataSourceRequest, ReadDataSourceResponse>,
    plan_action: Responder<PlanActionRequest, PlanActionResponse>,
    apply_action: Responder<ApplyActionRequest, ApplyActionResponse>,
    call_function: Responder<CallFunctionRequest, CallFunctionResponse>,
}

struct MockState {
    schema: GetProviderSchemaResponse,
    lifecycle: Lifecycle,
    calls: CallLog,
    responders: Responders,
}

/// Reference provider used to pin down the provider contract in tests
pub struct MockProvider {
    state: Mutex<MockState>,
    stop_calls: AtomicUsize,
    stop_signal: Arc<AtomicBool>,
    stop_error: Option<ProviderError>,
    close_error: Option<ProviderError>,
}

macro_rules! responder_builders {
    ($($field:ident: $req:ty => $resp:ty, $with_fn:ident, $with_response:ident;)*) => {
        $(
            pub fn $with_fn(
                mut self,
                f: impl Fn(&$req) -> $resp + Send + Sync + 'static,
            ) -> Self {
                self.state.get_mut().responders.$field = Responder::Func(Arc::new(f));
                self
            }

            pub fn $with_response(mut self, response: $resp) -> Self {
                self.state.get_mut().responders.$field = Responder::Canned(response);
                self
            }
        )*
    };
}

impl MockProvider {
    pub fn new(schema: GetProviderSchemaResponse) -> Self {
        Self {
            state: Mutex::new(MockState {
                schema,
                lifecycle: Lifecycle::default(),
                calls: CallLog::default(),
                responders: Responders::default(),
            }),
            stop_calls: AtomicUsize::new(0),
            stop_signal: Arc::new(AtomicBool::new(false)),
            stop_error: None,
            close_error: None,
        }
    }

    responder_builders! {
        validate_provider_config: ValidateProviderConfigRequest => ValidateProviderConfigResponse,
            with_validate_provider_config_fn, with_validate_provider_config_response;
        validate_resource_config: ValidateResourceConfigRequest => ValidateResourceConfigResponse,
            with_validate_resource_config_fn, with_validate_resource_config_response;
        validate_data_resource_config: ValidateDataResourceConfigRequest => ValidateDataResourceConfigResponse,
            with_validate_data_resource_config_fn, with_validate_data_resource_config_response;
        configure_provider: ConfigureProviderRequest => ConfigureProviderResponse,
            with_configure_provider_fn, with_configure_provider_response;
        upgrade_resource_state: UpgradeResourceStateRequest => UpgradeResourceStateResponse,
            with_upgrade_resource_state_fn, with_upgrade_resource_state_response;
        read_resource: ReadResourceRequest => ReadResourceResponse,
            with_read_resource_fn, with_read_resource_response;
        plan_resource_change: PlanResourceChangeRequest => PlanResourceChangeResponse,
            with_plan_resource_change_fn, with_plan_resource_change_response;
        apply_resource_change: ApplyResourceChangeRequest => ApplyResourceChangeResponse,
            with_apply_resource_change_fn, with_apply_resource_change_response;
        import_resource_state: ImportResourceStateRequest => ImportResourceStateResponse,
            with_import_resource_state_fn, with_import_resource_state_response;
        move_resource_state: MoveResourceStateRequest => MoveResourceStateResponse,
            with_move_resource_state_fn, with_move_resource_state_response;
        read_data_source: ReadDataSourceRequest => ReadDataSourceResponse,
            with_read_data_source_fn, with_read_data_source_response;
        plan_action: PlanActionRequest => PlanActionResponse,
            with_plan_action_fn, with_plan_action_response;
        apply_action: ApplyActionRequest => ApplyActionResponse,
            with_apply_action_fn, with_apply_action_response;
        call_function: CallFunctionRequest => CallFunctionResponse,
            with_call_function_fn, with_call_function_response;
    }

    /// Make `stop` fail with `error`.
    pub fn with_stop_error(mut self, error: ProviderError) -> Self {
        self.stop_error = Some(error);
        self
    }

    /// Make `close` fail with `error`.
    pub fn with_close_error(mut self, error: ProviderError) -> Self {
        self.close_error = Some(error);
        self
    }

    /// Snapshot of the call log. Waits for any in-flight operation.
    pub async fn calls(&self) -> CallLog {
        self.state.lock().await.calls.clone()
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        self.state.lock().await.lifecycle
    }

    pub fn stop_called(&self) -> bool {
        self.stop_calls() > 0
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Flag raised by `stop`. Callbacks poll it to cancel cooperatively.
    /// ConfigureProvider lowers it again.
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_signal)
    }
}

fn no_schema(type_name: &str) -> Diagnostic {
    Diagnostic::error(format!("no schema found for {:?}", type_name))
        .with_category(Category::SchemaMismatch)
}

/// Lifecycle gate plus schema lookup shared by the instance-level operations.
fn gated_schema<'a>(
    state: &'a MockState,
    operation: Operation,
    type_name: &str,
    lookup: impl Fn(&'a GetProviderSchemaResponse, &str) -> Option<&'a Schema>,
) -> std::result::Result<&'a Schema, Diagnostic> {
    state.lifecycle.check(operation, type_name)?;
    lookup(&state.schema, type_name).ok_or_else(|| no_schema(type_name))
}

/// Strict encoding check against the implied type of `schema`.
fn check_encoding(schema: &Schema, config: &Value) -> Diagnostics {
    match DynamicValue::encode(config, &schema.implied_type()) {
        Ok(_) => Diagnostics::new(),
        Err(err) => Diagnostic::from(err).into(),
    }
}

/// Coerce a state value the provider hands back. Null stays null.
fn coerce_state(schema: &Schema, value: Value, diagnostics: &mut Diagnostics) -> Value {
    if value.is_null() {
        return value;
    }
    match schema.block.coerce_value(&value) {
        Ok(coerced) => coerced,
        Err(err) => {
            diagnostics.push(Diagnostic::from(err));
            Value::Null
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn get_provider_schema(&self) -> GetProviderSchemaResponse {
        let mut state = self.state.lock().await;
        state.calls.get_provider_schema.record(&());
        state.schema.clone()
    }

    async fn validate_provider_config(
        &self,
        req: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut state = self.state.lock().await;
        state.calls.validate_provider_config.record(&req);
        match &state.responders.validate_provider_config {
            Responder::Func(f) => f(&req),
            Responder::Canned(resp) => resp.clone(),
            Responder::Default => ValidateProviderConfigResponse {
                prepared_config: req.config,
                diagnostics: Diagnostics::new(),
            },
        }
    }

    async fn validate_resource_config(
        &self,
        req: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut state = self.state.lock().await;
        state.calls.validate_resource_config.record(&req);
        let Some(schema) = state.schema.resource_schema(&req.type_name) else {
            return ValidateResourceConfigResponse {
                diagnostics: no_schema(&req.type_name).into(),
            };
        };
        let mut diagnostics = check_encoding(schema, &req.config);
        match &state.responders.validate_resource_config {
            Responder::Func(f) => diagnostics.append(f(&req).diagnostics),
            Responder::Canned(resp) => diagnostics.append(resp.diagnostics.clone()),
            Responder::Default => {}
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn validate_data_resource_config(
        &self,
        req: ValidateDataResourceConfigRequest,
    ) -> ValidateDataResourceConfigResponse {
        let mut state = self.state.lock().await;
        state.calls.validate_data_resource_config.record(&req);
        let Some(schema) = state.schema.data_source_schema(&req.type_name) else {
            return ValidateDataResourceConfigResponse {
                diagnostics: no_schema(&req.type_name).into(),
            };
        };
        let mut diagnostics = check_encoding(schema, &req.config);
        match &state.responders.validate_data_resource_config {
            Responder::Func(f) => diagnostics.append(f(&req).diagnostics),
            Responder::Canned(resp) => diagnostics.append(resp.diagnostics.clone()),
            Responder::Default => {}
        }
        ValidateDataResourceConfigResponse { diagnostics }
    }

    async fn configure_provider(&self, req: ConfigureProviderRequest) -> ConfigureProviderResponse {
        let mut state = self.state.lock().await;
        state.calls.configure_provider.record(&req);
        if state.lifecycle == Lifecycle::Closed {
            return ConfigureProviderResponse {
                diagnostics: Diagnostic::error("Provider closed before ConfigureProvider")
                    .with_category(Category::OrderingViolation)
                    .into(),
            };
        }
        // The gate opens on the attempt, not on success.
        state.lifecycle.configure();
        self.stop_signal.store(false, Ordering::SeqCst);
        debug!(client_version = %req.client_version, "mock provider configured");
        match &state.responders.configure_provider {
            Responder::Func(f) => f(&req),
            Responder::Canned(resp) => resp.clone(),
            Responder::Default => ConfigureProviderResponse::default(),
        }
    }

    async fn upgrade_resource_state(
        &self,
        req: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse {
        let mut state = self.state.lock().await;
        state.calls.upgrade_resource_state.record(&req);
        let Some(schema) = state.schema.resource_schema(&req.type_name) else {
            return UpgradeResourceStateResponse {
                diagnostics: no_schema(&req.type_name).into(),
                ..Default::default()
            };
        };
        match &state.responders.upgrade_resource_state {
            Responder::Func(f) => f(&req),
            Responder::Canned(resp) => resp.clone(),
            Responder::Default => upgrade_state(schema, &req),
        }
    }

    async fn read_resource(&self, req: ReadResourceRequest) -> ReadResourceResponse {
        let mut state = self.state.lock().await;
        state.calls.read_resource.record(&req);
        let schema = match gated_schema(&state, Operation::ReadResource, &req.type_name, |s, t| {
            s.resource_schema(t)
        }) {
            Ok(schema) => schema,
            Err(diag) => {
                return ReadResourceResponse {
                    diagnostics: diag.into(),
                    ..Default::default()
                };
            }
        };
        match &state.responders.read_resource {
            Responder::Func(f) => f(&req),
            Responder::Canned(resp) => {
                let mut resp = resp.clone();
                resp.new_state = coerce_state(schema, resp.new_state, &mut resp.diagnostics);
                resp
            }
            Responder::Default => ReadResourceResponse {
                new_state: req.prior_state,
                private: req.private,
                diagnostics: Diagnostics::new(),
            },
        }
    }

    async fn plan_resource_change(
        &self,
        req: PlanResourceChangeRequest,
    ) -> PlanResourceChangeResponse {
        let mut state = self.state.lock().await;
        state.calls.plan_resource_change.record(&req);
        if let Err(diag) = state
            .lifecycle
            .check(Operation::PlanResourceChange, &req.type_name)
        {
            return PlanResourceChangeResponse {
                diagnostics: diag.into(),
                ..Default::default()
            };
        }
        match &state.responders.plan_resource_change {
            Responder::Func(f) => return f(&req),
            Responder::Canned(resp) => return resp.clone(),
            Responder::Default => {}
        }
        // Destroy plans hold for every type, registered or not.
        if req.proposed_new_state.is_null() {
            return PlanResourceChangeResponse {
                planned_state: Value::Null,
                planned_private: req.prior_private,
                ..Default::default()
            };
        }
        match state.schema.resource_schema(&req.type_name) {
            Some(schema) => defaults::plan(schema, &req),
            None => PlanResourceChangeResponse {
                diagnostics: no_schema(&req.type_name).into(),
                ..Default::default()
            },
        }
    }

    async fn apply_resource_change(
        &self,
        req: ApplyResourceChangeRequest,
    ) -> ApplyResourceChangeResponse {
        let mut state = self.state.lock().await;
        state.calls.apply_resource_change.record(&req);
        let schema = match gated_schema(
            &state,
            Operation::ApplyResourceChange,
            &req.type_name,
            |s, t| s.resource_schema(t),
        ) {
            Ok(schema) => schema,
            Err(diag) => {
                return ApplyResourceChangeResponse {
                    diagnostics: diag.into(),
                    ..Default::default()
                };
            }
        };
        match &state.responders.apply_resource_change {
            Responder::Func(f) => f(&req),
            Responder::Canned(resp) => resp.clone(),
            Responder::Default => defaults::apply(schema, &req),
        }
    }

    async fn import_resource_state(
        &self,
        req: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut state = self.state.lock().await;
        state.calls.import_resource_state.record(&req);
        if let Err(diag) = gated_schema(
            &state,
            Operation::ImportResourceState,
            &req.type_name,
            |s, t| s.resource_schema(t),
        ) {
            return ImportResourceStateResponse {
                diagnostics: diag.into(),
                ..Default::default()
            };
        }
        match &state.responders.import_resource_state {
            Responder::Func(f) => f(&req),
            Responder::Canned(resp) => {
                let mut resp = resp.clone();
                // each imported object is coerced against its own type
                for imported in &mut resp.imported_resources {
                    let value = std::mem::take(&mut imported.state);
                    imported.state = match state.schema.resource_schema(&imported.type_name) {
                        Some(schema) => coerce_state(schema, value, &mut resp.diagnostics),
                        None => {
                            resp.diagnostics.push(no_schema(&imported.type_name));
                            Value::Null
                        }
                    };
                }
                resp
            }
            Responder::Default => ImportResourceStateResponse::default(),
        }
    }

    async fn move_resource_state(
        &self,
        req: MoveResourceStateRequest,
    ) -> MoveResourceStateResponse {
        let mut state = self.state.lock().await;
        state.calls.move_resource_state.record(&req);
        let Some(schema) = state.schema.resource_schema(&req.target_type_name) else {
            return MoveResourceStateResponse {
                diagnostics: no_schema(&req.target_type_name).into(),
                ..Default::default()
            };
        };
        match &state.responders.move_resource_state {
            Responder::Func(f) => f(&req),
            Responder::Canned(resp) => resp.clone(),
            Responder::Default => {
                let mut resp = MoveResourceStateResponse {
                    target_private: req.source_private.clone(),
                    ..Default::default()
                };
                match from_json(&req.source_state_json, &schema.implied_type()) {
                    Ok(value) => {
                        resp.target_state = coerce_state(schema, value, &mut resp.diagnostics)
                    }
                    Err(err) => resp.diagnostics.push(Diagnostic::from(err)),
                }
                resp
            }
        }
    }

    async fn read_data_source(&self, req: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut state = self.state.lock().await;
        state.calls.read_data_source.record(&req);
        let schema = match gated_schema(&state, Operation::ReadDataSource, &req.type_name, |s, t| {
            s.data_source_schema(t)
        }) {
            Ok(schema) => schema,
            Err(diag) => {
                return ReadDataSourceResponse {
                    diagnostics: diag.into(),
                    ..Default::default()
                };
            }
        };
        match &state.responders.read_data_source {
            Responder::Func(f) => f(&req),
            Responder::Canned(resp) => {
                let mut resp = resp.clone();
                resp.state = coerce_state(schema, resp.state, &mut resp.diagnostics);
                resp
            }
            Responder::Default => {
                let mut diagnostics = Diagnostics::new();
                let value = coerce_state(schema, req.config, &mut diagnostics);
                ReadDataSourceResponse {
                    state: value,
                    diagnostics,
                }
            }
        }
    }

    async fn plan_action(&self, req: PlanActionRequest) -> PlanActionResponse {
        let mut state = self.state.lock().await;
        state.calls.plan_action.record(&req);
        let schema = match gated_schema(&state, Operation::PlanAction, &req.action_type, |s, t| {
            s.actions.get(t)
        }) {
            Ok(schema) => schema,
            Err(diag) => {
                return PlanActionResponse {
                    diagnostics: diag.into(),
                };
            }
        };
        match &state.responders.plan_action {
            Responder::Func(f) => f(&req),
            Responder::Canned(resp) => resp.clone(),
            Responder::Default => PlanActionResponse {
                diagnostics: check_encoding(schema, &req.config),
            },
        }
    }

    async fn apply_action(&self, req: ApplyActionRequest) -> ApplyActionResponse {
        let mut state = self.state.lock().await;
        state.calls.apply_action.record(&req);
        if let Err(diag) = gated_schema(&state, Operation::ApplyAction, &req.action_type, |s, t| {
            s.actions.get(t)
        }) {
            return ApplyActionResponse {
                diagnostics: diag.into(),
            };
        }
        match &state.responders.apply_action {
            Responder::Func(f) => f(&req),
            Responder::Canned(resp) => resp.clone(),
            Responder::Default => ApplyActionResponse::default(),
        }
    }

    async fn call_function(&self, req: CallFunctionRequest) -> CallFunctionResponse {
        let mut state = self.state.lock().await;
        state.calls.call_function.record(&req);
        let Some(spec) = state.schema.functions.get(&req.function_name) else {
            return CallFunctionResponse {
                result: Value::Null,
                error: Some(FunctionError {
                    text: format!("no function named {:?}", req.function_name),
                    argument: None,
                }),
            };
        };
        let arity = spec.parameters.len();
        let too_many = spec.variadic.is_none() && req.arguments.len() > arity;
        if req.arguments.len() < arity || too_many {
            return CallFunctionResponse {
                result: Value::Null,
                error: Some(FunctionError {
                    text: format!(
                        "{} expects {} argument(s), got {}",
                        req.function_name,
                        arity,
                        req.arguments.len()
                    ),
                    argument: too_many.then_some(arity),
                }),
            };
        }
        match &state.responders.call_function {
            Responder::Func(f) => f(&req),
            Responder::Canned(resp) => resp.clone(),
            Responder::Default => CallFunctionResponse::default(),
        }
    }

    async fn stop(&self) -> Result<()> {
        // Never takes the state lock: stop must get through while another
        // operation holds it.
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stop_signal.store(true, Ordering::SeqCst);
        match &self.stop_error {
            Some(err) => {
                warn!(error = %err, "mock provider refused to stop");
                Err(err.clone())
            }
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.close.record(&());
        state.lifecycle.close();
        match &self.close_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
