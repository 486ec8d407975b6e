//! Reconciliation engine
//!
//! Drives a [`Provider`] through the per-instance pipeline:
//!
//! ```text
//! ValidateResourceConfig → [UpgradeResourceState] → [ReadResource]
//!     → PlanResourceChange → [ApplyResourceChange]
//! ```
//!
//! Instances run concurrently up to the configured parallelism. Changes to
//! the same address are serialised so that one instance's plan and apply
//! never interleave with another change to it.
//!
//! A plan naming `requires_replace` attributes is carried out as a destroy
//! followed by a fresh plan and apply of the create.

use crate::action::{ActionType, PlannedChange};
use crate::error::Result;
use crate::instance::{
    InstanceAddress, InstanceChange, InstanceOutcome, InstanceState, InstanceStatus, PriorState,
};
use crate::proposed::proposed_new_state;
use crate::report::RunReport;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use stratum_config::EngineConfig;
use stratum_core::{Block, Category, Diagnostic, Diagnostics, Value};
use stratum_provider::*;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};

pub struct Engine<P: Provider> {
    provider: Arc<P>,
    config: EngineConfig,
    schema: OnceCell<GetProviderSchemaResponse>,
    cached_schema: Option<GetProviderSchemaResponse>,
    instance_locks: Mutex<HashMap<InstanceAddress, Arc<Mutex<()>>>>,
}

fn provider_error(summary: impl Into<String>) -> Diagnostic {
    Diagnostic::error(summary).with_category(Category::Provider)
}

impl<P: Provider> Engine<P> {
    pub fn new(provider: Arc<P>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            config,
            schema: OnceCell::new(),
            cached_schema: None,
            instance_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Offer a schema kept from an earlier session. It is used in place of
    /// GetProviderSchema only when its capabilities say the call is optional.
    pub fn with_cached_schema(mut self, schema: GetProviderSchemaResponse) -> Self {
        self.cached_schema = Some(schema);
        self
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The provider's schemas, fetched once and checked on first use.
    pub async fn schema(&self) -> &GetProviderSchemaResponse {
        self.schema
            .get_or_init(|| async {
                let mut schema = match &self.cached_schema {
                    Some(cached) if cached.capabilities.get_provider_schema_optional => {
                        debug!("using cached provider schema");
                        cached.clone()
                    }
                    _ => self.provider.get_provider_schema().await,
                };
                let published = schema
                    .resource_types
                    .iter()
                    .chain(&schema.data_sources)
                    .chain(&schema.actions);
                let mut invalid = Diagnostics::new();
                for (type_name, s) in published {
                    if let Err(err) = s.block.validate() {
                        invalid.push(
                            Diagnostic::from(err)
                                .with_detail(format!("in the schema of {:?}", type_name)),
                        );
                    }
                }
                schema.diagnostics.append(invalid);
                debug!(
                    resource_types = schema.resource_types.len(),
                    data_sources = schema.data_sources.len(),
                    "provider schema loaded"
                );
                schema
            })
            .await
    }

    /// Validate the provider configuration, then configure the provider with
    /// the prepared result.
    #[instrument(skip_all)]
    pub async fn configure(&self, config: Value) -> Diagnostics {
        let mut diagnostics = self.schema().await.diagnostics.clone();
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let validated = self
            .provider
            .validate_provider_config(ValidateProviderConfigRequest { config })
            .await;
        diagnostics.append(validated.diagnostics);
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let configured = self
            .provider
            .configure_provider(ConfigureProviderRequest {
                client_version: self.config.client_version.clone(),
                config: validated.prepared_config,
            })
            .await;
        diagnostics.append(configured.diagnostics);
        if !diagnostics.has_errors() {
            info!("provider configured");
        }
        diagnostics
    }

    /// Reconcile every change and report the outcome of each.
    pub async fn run(&self, changes: Vec<InstanceChange>) -> RunReport {
        let started_at = Utc::now();
        let halted = AtomicBool::new(false);
        info!(instances = changes.len(), parallelism = self.config.parallelism, "run started");

        let mut outcomes: Vec<(usize, InstanceOutcome)> =
            stream::iter(changes.into_iter().enumerate().map(|(i, change)| {
                let halted = &halted;
                async move { (i, self.run_instance(change, halted).await) }
            }))
            .buffer_unordered(self.config.parallelism)
            .collect()
            .await;
        outcomes.sort_by_key(|(i, _)| *i);

        let report = RunReport {
            outcomes: outcomes.into_iter().map(|(_, o)| o).collect(),
            started_at,
            finished_at: Utc::now(),
        };
        info!(summary = %report.summary(), success = report.is_success(), "run finished");
        report
    }

    async fn instance_lock(&self, address: &InstanceAddress) -> Arc<Mutex<()>> {
        let mut locks = self.instance_locks.lock().await;
        Arc::clone(locks.entry(address.clone()).or_default())
    }

    /// Drop the address's lock once no other change holds or waits on it.
    async fn release_instance_lock(&self, address: &InstanceAddress, lock: Arc<Mutex<()>>) {
        let mut locks = self.instance_locks.lock().await;
        // the map's copy plus ours
        if Arc::strong_count(&lock) == 2 {
            locks.remove(address);
        }
    }

    /// Addresses that currently have a lock entry.
    pub async fn locked_addresses(&self) -> usize {
        self.instance_locks.lock().await.len()
    }

    async fn run_instance(&self, change: InstanceChange, halted: &AtomicBool) -> InstanceOutcome {
        let address = change.address.clone();
        let lock = self.instance_lock(&address).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.run_locked(change, halted).await
        };
        self.release_instance_lock(&address, lock).await;
        outcome
    }

    async fn run_locked(&self, change: InstanceChange, halted: &AtomicBool) -> InstanceOutcome {
        if halted.load(Ordering::SeqCst) {
            warn!(address = %change.address, "skipped after an ordering violation");
            return InstanceOutcome::skipped(
                change.address,
                Diagnostic::warning("Not started: the run halted after an ordering violation")
                    .with_category(Category::OrderingViolation)
                    .into(),
            );
        }

        let outcome = self.reconcile(change).await;
        if self.config.halt_on_ordering_violation
            && outcome.diagnostics.errors().any(|d| d.category == Category::OrderingViolation)
        {
            warn!(address = %outcome.address, "ordering violation, halting run");
            halted.store(true, Ordering::SeqCst);
        }
        outcome
    }

    #[instrument(skip_all, fields(address = %change.address))]
    async fn reconcile(&self, change: InstanceChange) -> InstanceOutcome {
        let InstanceChange {
            address,
            prior,
            private,
            config,
        } = change;
        let type_name = address.type_name.clone();
        let mut outcome = InstanceOutcome::new(address.clone());

        let Some(schema) = self.schema().await.resource_schema(&type_name) else {
            outcome.diagnostics.push(
                Diagnostic::error(format!("no schema found for {:?}", type_name))
                    .with_category(Category::SchemaMismatch),
            );
            return outcome.failed();
        };

        if !config.is_null() {
            let validated = self
                .provider
                .validate_resource_config(ValidateResourceConfigRequest {
                    type_name: type_name.clone(),
                    config: config.clone(),
                })
                .await;
            if outcome.absorb(validated.diagnostics) {
                return outcome.failed();
            }
        }

        let mut prior_state = match prior {
            PriorState::Absent => Value::Null,
            PriorState::Current(value) => value,
            PriorState::Raw { state, version } => {
                debug!(format = state.format(), version, "upgrading stored state");
                let upgraded = self
                    .provider
                    .upgrade_resource_state(UpgradeResourceStateRequest {
                        type_name: type_name.clone(),
                        version,
                        raw_state: state,
                    })
                    .await;
                if outcome.absorb(upgraded.diagnostics) {
                    return outcome.failed();
                }
                upgraded.upgraded_state
            }
        };
        let mut private = private;

        if self.config.refresh && !prior_state.is_null() {
            let read = self
                .provider
                .read_resource(ReadResourceRequest {
                    type_name: type_name.clone(),
                    prior_state,
                    private,
                })
                .await;
            if outcome.absorb(read.diagnostics) {
                return outcome.failed();
            }
            if read.new_state.is_null() {
                info!("instance no longer exists");
            }
            prior_state = read.new_state;
            private = read.private;
        }

        let proposed = match proposed_new_state(&schema.block, &prior_state, &config) {
            Ok(proposed) => proposed,
            Err(err) => {
                outcome.diagnostics.push(Diagnostic::from(err));
                return outcome.failed();
            }
        };

        let capabilities = &self.schema().await.capabilities;
        let implied_destroy =
            proposed.is_null() && (prior_state.is_null() || !capabilities.plan_destroy);
        let planned = if implied_destroy {
            PlanResourceChangeResponse {
                planned_state: Value::Null,
                planned_private: private,
                ..Default::default()
            }
        } else {
            let Some(planned) = self
                .plan(&mut outcome, &type_name, &prior_state, proposed, &config, private)
                .await
            else {
                return outcome.failed();
            };
            planned
        };

        let action_type =
            ActionType::classify(&prior_state, &planned.planned_state, &planned.requires_replace);
        debug!(%action_type, "planned");
        outcome.change = Some(PlannedChange {
            address,
            action_type,
            prior_state: prior_state.clone(),
            planned_state: planned.planned_state.clone(),
            planned_private: planned.planned_private.clone(),
            requires_replace: planned.requires_replace,
        });

        if action_type == ActionType::NoOp {
            outcome.status = InstanceStatus::Unchanged;
            return outcome;
        }
        if self.config.plan_only {
            outcome.status = InstanceStatus::Planned;
            return outcome;
        }

        let applied = if action_type == ActionType::Replace {
            self.replace(
                &mut outcome,
                &schema.block,
                &type_name,
                prior_state,
                config,
                planned.planned_private,
            )
            .await
        } else {
            self.apply(
                &mut outcome,
                &type_name,
                prior_state,
                planned.planned_state,
                config,
                planned.planned_private,
            )
            .await
        };
        let Some(applied) = applied else {
            return outcome.failed();
        };

        info!(%action_type, "applied");
        outcome.new_state = Some(InstanceState {
            value: applied.new_state,
            private: applied.private,
        });
        outcome.status = InstanceStatus::Applied;
        outcome
    }

    /// PlanResourceChange plus the destroy invariant. `None` means the
    /// outcome already carries the failure.
    async fn plan(
        &self,
        outcome: &mut InstanceOutcome,
        type_name: &str,
        prior_state: &Value,
        proposed: Value,
        config: &Value,
        prior_private: Vec<u8>,
    ) -> Option<PlanResourceChangeResponse> {
        let destroy = proposed.is_null();
        let mut planned = self
            .provider
            .plan_resource_change(PlanResourceChangeRequest {
                type_name: type_name.to_string(),
                prior_state: prior_state.clone(),
                proposed_new_state: proposed,
                config: config.clone(),
                prior_private,
            })
            .await;
        if outcome.absorb(std::mem::take(&mut planned.diagnostics)) {
            return None;
        }
        if destroy && !planned.planned_state.is_null() {
            outcome
                .diagnostics
                .push(provider_error("Provider planned a non-null state for a destroy"));
            return None;
        }
        Some(planned)
    }

    /// ApplyResourceChange plus the checks on what the provider hands back.
    async fn apply(
        &self,
        outcome: &mut InstanceOutcome,
        type_name: &str,
        prior_state: Value,
        planned_state: Value,
        config: Value,
        planned_private: Vec<u8>,
    ) -> Option<ApplyResourceChangeResponse> {
        let destroy = planned_state.is_null();
        let mut applied = self
            .provider
            .apply_resource_change(ApplyResourceChangeRequest {
                type_name: type_name.to_string(),
                prior_state,
                planned_state,
                config,
                planned_private,
            })
            .await;
        if outcome.absorb(std::mem::take(&mut applied.diagnostics)) {
            return None;
        }

        let violation = if destroy && !applied.new_state.is_null() {
            Some("Provider returned a non-null state for a destroy")
        } else if !destroy && applied.new_state.is_null() {
            Some("Provider returned a null state after apply")
        } else if !applied.new_state.is_wholly_known() {
            Some("Provider returned unknown values after apply")
        } else {
            None
        };
        if let Some(summary) = violation {
            outcome.diagnostics.push(provider_error(summary));
            return None;
        }
        Some(applied)
    }

    /// Destroy the current object, then plan and apply its successor.
    async fn replace(
        &self,
        outcome: &mut InstanceOutcome,
        block: &Block,
        type_name: &str,
        prior_state: Value,
        config: Value,
        prior_private: Vec<u8>,
    ) -> Option<ApplyResourceChangeResponse> {
        debug!("destroying before create");
        self.apply(outcome, type_name, prior_state, Value::Null, Value::Null, prior_private)
            .await?;

        let proposed = match proposed_new_state(block, &Value::Null, &config) {
            Ok(proposed) => proposed,
            Err(err) => {
                outcome.diagnostics.push(Diagnostic::from(err));
                return None;
            }
        };
        let planned = self
            .plan(outcome, type_name, &Value::Null, proposed, &config, Vec::new())
            .await?;
        self.apply(
            outcome,
            type_name,
            Value::Null,
            planned.planned_state,
            config,
            planned.planned_private,
        )
        .await
    }

    /// Import an existing object by id.
    pub async fn import(
        &self,
        type_name: impl Into<String>,
        id: impl Into<String>,
    ) -> ImportResourceStateResponse {
        self.provider
            .import_resource_state(ImportResourceStateRequest {
                type_name: type_name.into(),
                id: id.into(),
            })
            .await
    }

    /// Validate a data source configuration and read it.
    pub async fn read_data_source(
        &self,
        type_name: impl Into<String>,
        config: Value,
    ) -> ReadDataSourceResponse {
        let type_name = type_name.into();
        let validated = self
            .provider
            .validate_data_resource_config(ValidateDataResourceConfigRequest {
                type_name: type_name.clone(),
                config: config.clone(),
            })
            .await;
        if validated.diagnostics.has_errors() {
            return ReadDataSourceResponse {
                state: Value::Null,
                diagnostics: validated.diagnostics,
            };
        }
        let mut resp = self
            .provider
            .read_data_source(ReadDataSourceRequest { type_name, config })
            .await;
        let mut diagnostics = validated.diagnostics;
        diagnostics.append(resp.diagnostics);
        resp.diagnostics = diagnostics;
        resp
    }

    /// Plan an action and, unless this is a plan-only engine, invoke it.
    pub async fn invoke_action(&self, action_type: impl Into<String>, config: Value) -> Diagnostics {
        let action_type = action_type.into();
        let planned = self
            .provider
            .plan_action(PlanActionRequest {
                action_type: action_type.clone(),
                config: config.clone(),
            })
            .await;
        let mut diagnostics = planned.diagnostics;
        if diagnostics.has_errors() || self.config.plan_only {
            return diagnostics;
        }
        let applied = self
            .provider
            .apply_action(ApplyActionRequest {
                action_type,
                config,
            })
            .await;
        diagnostics.append(applied.diagnostics);
        diagnostics
    }

    pub async fn call_function(
        &self,
        function_name: impl Into<String>,
        arguments: Vec<Value>,
    ) -> CallFunctionResponse {
        self.provider
            .call_function(CallFunctionRequest {
                function_name: function_name.into(),
                arguments,
            })
            .await
    }

    /// Ask the provider to cancel in-flight work. A refusal is a warning.
    pub async fn stop(&self) -> Diagnostics {
        match self.provider.stop().await {
            Ok(()) => Diagnostics::new(),
            Err(err) => {
                warn!(error = %err, "provider did not stop");
                Diagnostic::warning(format!("Provider could not stop: {}", err))
                    .with_category(Category::Cancellation)
                    .into()
            }
        }
    }

    pub async fn close(&self) -> Result<()> {
        self.provider.close().await?;
        Ok(())
    }
}
