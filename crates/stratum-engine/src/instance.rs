//! Resource instances as the engine sees them
//!
//! The engine does not store state. Callers hand it each instance's prior
//! state and configuration as an [`InstanceChange`] and get an
//! [`InstanceOutcome`] back.

use crate::action::{ActionType, PlannedChange};
use serde::{Deserialize, Serialize};
use stratum_core::{Diagnostics, Value};
use stratum_provider::RawState;

/// `<type>.<name>`, unique within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceAddress {
    pub type_name: String,
    pub name: String,
}

impl InstanceAddress {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for InstanceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.type_name, self.name)
    }
}

/// What the caller knows about an instance before the run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorState {
    /// The instance has never been created
    #[default]
    Absent,
    /// State already in the current schema's shape
    Current(Value),
    /// Persisted state that must go through UpgradeResourceState first
    Raw { state: RawState, version: i64 },
}

/// Desired configuration for one instance. A null config destroys it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceChange {
    pub address: InstanceAddress,
    pub prior: PriorState,
    /// Provider-private bytes from the last apply
    pub private: Vec<u8>,
    pub config: Value,
}

impl InstanceChange {
    pub fn create(address: InstanceAddress, config: Value) -> Self {
        Self {
            address,
            prior: PriorState::Absent,
            private: Vec::new(),
            config,
        }
    }

    pub fn update(address: InstanceAddress, prior: Value, config: Value) -> Self {
        Self {
            address,
            prior: PriorState::Current(prior),
            private: Vec::new(),
            config,
        }
    }

    pub fn destroy(address: InstanceAddress, prior: Value) -> Self {
        Self {
            address,
            prior: PriorState::Current(prior),
            private: Vec::new(),
            config: Value::Null,
        }
    }

    pub fn with_private(mut self, private: Vec<u8>) -> Self {
        self.private = private;
        self
    }

    pub fn with_raw_prior(mut self, state: RawState, version: i64) -> Self {
        self.prior = PriorState::Raw { state, version };
        self
    }

    pub fn is_destroy(&self) -> bool {
        self.config.is_null()
    }
}

/// State plus the provider's private bytes, as returned by apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    pub value: Value,
    pub private: Vec<u8>,
}

/// How far an instance got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Planned as a no-op; nothing to apply
    Unchanged,
    /// Planned but not applied (plan-only run)
    Planned,
    /// Change applied
    Applied,
    /// Stopped by an error diagnostic
    Failed,
    /// Never started because the run halted
    Skipped,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceStatus::Unchanged => write!(f, "unchanged"),
            InstanceStatus::Planned => write!(f, "planned"),
            InstanceStatus::Applied => write!(f, "applied"),
            InstanceStatus::Failed => write!(f, "failed"),
            InstanceStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of reconciling one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceOutcome {
    pub address: InstanceAddress,
    pub status: InstanceStatus,
    /// Present once planning succeeded
    pub change: Option<PlannedChange>,
    /// Present once apply succeeded. A destroyed instance has a null value.
    pub new_state: Option<InstanceState>,
    pub diagnostics: Diagnostics,
}

impl InstanceOutcome {
    pub(crate) fn new(address: InstanceAddress) -> Self {
        Self {
            address,
            status: InstanceStatus::Failed,
            change: None,
            new_state: None,
            diagnostics: Diagnostics::new(),
        }
    }

    pub(crate) fn skipped(address: InstanceAddress, diagnostics: Diagnostics) -> Self {
        Self {
            status: InstanceStatus::Skipped,
            diagnostics,
            ..Self::new(address)
        }
    }

    /// Append `diagnostics`; true if they include an error.
    pub(crate) fn absorb(&mut self, diagnostics: Diagnostics) -> bool {
        let failed = diagnostics.has_errors();
        self.diagnostics.append(diagnostics);
        failed
    }

    pub(crate) fn failed(mut self) -> Self {
        self.status = InstanceStatus::Failed;
        self
    }

    pub fn action(&self) -> Option<ActionType> {
        self.change.as_ref().map(|c| c.action_type)
    }

    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}
