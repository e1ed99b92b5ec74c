//! # Backup Strategies
//!
//! Named, condition-gated recovery plans tried in ascending priority order
//! once every primary attempt of a session has failed.

use crate::errors::{ErrorCategory, ErrorSeverity, ResilienceError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Symbolic trigger a backup strategy can be gated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupCondition {
    BridgeDown,
    BridgeUnhealthy,
    BridgeCrashed,
    BridgeUnresponsive,
    AllRecoveryFailed,
}

impl BackupCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupCondition::BridgeDown => "BRIDGE_DOWN",
            BackupCondition::BridgeUnhealthy => "BRIDGE_UNHEALTHY",
            BackupCondition::BridgeCrashed => "BRIDGE_CRASHED",
            BackupCondition::BridgeUnresponsive => "BRIDGE_UNRESPONSIVE",
            BackupCondition::AllRecoveryFailed => "ALL_RECOVERY_FAILED",
        }
    }
}

impl fmt::Display for BackupCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupStrategy {
    pub name: String,

    /// Lower runs first
    pub priority: u32,

    /// Applicable when any of these conditions is active
    pub conditions: Vec<BackupCondition>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl BackupStrategy {
    pub fn new(
        name: impl Into<String>,
        priority: u32,
        conditions: impl IntoIterator<Item = BackupCondition>,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            conditions: conditions.into_iter().collect(),
            enabled: true,
        }
    }

    pub fn is_applicable(&self, active: &HashSet<BackupCondition>) -> bool {
        self.enabled && self.conditions.iter().any(|c| active.contains(c))
    }
}

/// Conditions implied by an error once its primary attempts are exhausted
///
/// `ALL_RECOVERY_FAILED` always holds at that point. Bridge conditions are
/// derived only for errors raised by the bridge itself.
pub fn conditions_for_error(error: &ResilienceError) -> HashSet<BackupCondition> {
    let mut conditions = HashSet::from([BackupCondition::AllRecoveryFailed]);

    let bridge_related = error.category == ErrorCategory::Bridge
        || error
            .context
            .component
            .as_deref()
            .is_some_and(|component| component.contains("bridge"));
    if !bridge_related {
        return conditions;
    }

    conditions.insert(BackupCondition::BridgeUnhealthy);
    match error.category {
        ErrorCategory::Timeout => {
            conditions.insert(BackupCondition::BridgeUnresponsive);
        }
        ErrorCategory::Network => {
            conditions.insert(BackupCondition::BridgeDown);
        }
        _ => {}
    }
    if error.severity >= ErrorSeverity::High {
        conditions.insert(BackupCondition::BridgeDown);
    }
    if error.severity == ErrorSeverity::Critical {
        conditions.insert(BackupCondition::BridgeCrashed);
    }

    conditions
}

/// Enabled strategies applicable to `active`, in the order they should run
pub fn applicable_strategies<'a>(
    strategies: &'a [BackupStrategy],
    active: &HashSet<BackupCondition>,
) -> Vec<&'a BackupStrategy> {
    let mut applicable: Vec<_> = strategies
        .iter()
        .filter(|strategy| strategy.is_applicable(active))
        .collect();
    applicable.sort_by_key(|strategy| strategy.priority);
    applicable
}
