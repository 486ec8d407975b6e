//! Run report

use crate::action::{Plan, PlanSummary};
use crate::instance::{InstanceOutcome, InstanceStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stratum_core::Diagnostics;

/// Everything a run did, in the order the changes were given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub outcomes: Vec<InstanceOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Changes that were planned, whether or not they were applied
    pub fn plan(&self) -> Plan {
        Plan::new(
            self.outcomes
                .iter()
                .filter_map(|o| o.change.clone())
                .collect(),
        )
    }

    pub fn summary(&self) -> PlanSummary {
        self.plan().summary()
    }

    /// Diagnostics of every instance, in outcome order
    pub fn diagnostics(&self) -> Diagnostics {
        self.outcomes
            .iter()
            .flat_map(|o| o.diagnostics.iter().cloned())
            .collect()
    }

    pub fn outcome(&self, address: &crate::InstanceAddress) -> Option<&InstanceOutcome> {
        self.outcomes.iter().find(|o| &o.address == address)
    }

    pub fn count(&self, status: InstanceStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Warnings never fail a run
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(InstanceOutcome::is_success)
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for outcome in &self.outcomes {
            match outcome.action() {
                Some(action) => writeln!(f, "{}: {} ({})", outcome.address, outcome.status, action)?,
                None => writeln!(f, "{}: {}", outcome.address, outcome.status)?,
            }
            for diag in &outcome.diagnostics {
                writeln!(f, "  {}", diag)?;
            }
        }
        write!(f, "{}", self.summary())
    }
}
