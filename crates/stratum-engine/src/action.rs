//! Action classification for planned changes

use crate::instance::InstanceAddress;
use serde::{Deserialize, Serialize};
use stratum_core::{Path, Value};

/// Type of action a plan implies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new object
    Create,
    /// Update an existing object in place
    Update,
    /// Destroy the object and create it anew
    Replace,
    /// Delete an object
    Delete,
    /// No changes needed
    NoOp,
}

impl ActionType {
    /// Classify the change from `prior` to `planned`. An update touching any
    /// attribute in `requires_replace` becomes a replacement.
    pub fn classify(prior: &Value, planned: &Value, requires_replace: &[Path]) -> Self {
        match (prior.is_null(), planned.is_null()) {
            (true, true) => ActionType::NoOp,
            (true, false) => ActionType::Create,
            (false, true) => ActionType::Delete,
            (false, false) if prior == planned => ActionType::NoOp,
            (false, false) if !requires_replace.is_empty() => ActionType::Replace,
            (false, false) => ActionType::Update,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// One instance's planned change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedChange {
    pub address: InstanceAddress,

    pub action_type: ActionType,

    /// State before the change, after refresh
    pub prior_state: Value,

    /// State the provider expects after apply; may contain unknowns
    pub planned_state: Value,

    /// Provider-private bytes, passed back to apply untouched
    pub planned_private: Vec<u8>,

    /// Attributes the provider says cannot change in place
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_replace: Vec<Path>,
}

/// Every change a run planned
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub changes: Vec<PlannedChange>,

    /// Whether any change is more than a no-op
    pub has_changes: bool,
}

impl Plan {
    pub fn new(changes: Vec<PlannedChange>) -> Self {
        let has_changes = changes.iter().any(|c| c.action_type != ActionType::NoOp);
        Self {
            changes,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn changes_by_type(&self, action_type: ActionType) -> Vec<&PlannedChange> {
        self.changes
            .iter()
            .filter(|c| c.action_type == action_type)
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.changes_by_type(ActionType::Create).len(),
            update: self.changes_by_type(ActionType::Update).len(),
            replace: self.changes_by_type(ActionType::Replace).len(),
            delete: self.changes_by_type(ActionType::Delete).len(),
            no_change: self.changes_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Counts of planned actions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.no_change
        )
    }
}
