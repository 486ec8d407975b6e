//! Call-ordering state machine
//!
//! ```text
//! Unconfigured ──ConfigureProvider──▶ Configured ──Close──▶ Closed
//!       └──────────────────────Close─────────────────────────▲
//! ```
//!
//! The gate opens once `ConfigureProvider` has been called, whether or not it
//! succeeded. Instance-level operations are refused before that, and after
//! `Close`.

use serde::{Deserialize, Serialize};
use stratum_core::{Category, Diagnostic};

/// Every operation of the provider protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    GetProviderSchema,
    ValidateProviderConfig,
    ValidateResourceConfig,
    ValidateDataResourceConfig,
    ConfigureProvider,
    UpgradeResourceState,
    ReadResource,
    PlanResourceChange,
    ApplyResourceChange,
    ImportResourceState,
    MoveResourceState,
    ReadDataSource,
    PlanAction,
    ApplyAction,
    CallFunction,
    Stop,
    Close,
}

impl Operation {
    /// Operations that require a configured provider
    pub fn requires_configure(self) -> bool {
        matches!(
            self,
            Operation::ReadResource
                | Operation::PlanResourceChange
                | Operation::ApplyResourceChange
                | Operation::ImportResourceState
                | Operation::ReadDataSource
                | Operation::PlanAction
                | Operation::ApplyAction
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Unconfigured,
    Configured,
    Closed,
}

impl Lifecycle {
    pub fn configure(&mut self) {
        if *self == Lifecycle::Unconfigured {
            *self = Lifecycle::Configured;
        }
    }

    pub fn close(&mut self) {
        *self = Lifecycle::Closed;
    }

    pub fn is_configured(self) -> bool {
        self == Lifecycle::Configured
    }

    /// Refuse `operation` on `type_name` if the current state forbids it.
    pub fn check(self, operation: Operation, type_name: &str) -> Result<(), Diagnostic> {
        if !operation.requires_configure() {
            return Ok(());
        }
        let summary = match self {
            Lifecycle::Configured => return Ok(()),
            Lifecycle::Unconfigured => {
                format!("Configure not called before {} {:?}", operation, type_name)
            }
            Lifecycle::Closed => format!("Provider closed before {} {:?}", operation, type_name),
        };
        Err(Diagnostic::error(summary).with_category(Category::OrderingViolation))
    }
}
