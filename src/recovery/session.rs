//! Recovery sessions and their attempt records.

use crate::errors::{ErrorCategory, ErrorSeverity, RecoveryStrategy, ResilienceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Lifecycle of a recovery session
///
/// `in_progress → {succeeded, failed, escalated}`; `failed` is revisited while
/// backup strategies remain and ends as `succeeded` or `escalated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    InProgress,
    Succeeded,
    Failed,
    Escalated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Succeeded => "succeeded",
            SessionStatus::Failed => "failed",
            SessionStatus::Escalated => "escalated",
        }
    }

    /// Whether the session has concluded for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Succeeded | SessionStatus::Escalated)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Succeeded,
    Failed,
}

/// One strategy execution within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    pub id: Uuid,
    pub strategy: RecoveryStrategy,

    /// 1-based position within the session, backups included
    pub attempt_number: u32,

    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub status: AttemptStatus,
    pub error: Option<String>,

    /// Name of the backup strategy, for attempts made after primary exhaustion
    pub backup_strategy: Option<String>,

    pub metadata: HashMap<String, Value>,
}

impl RecoveryAttempt {
    pub fn start(strategy: RecoveryStrategy, attempt_number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            strategy,
            attempt_number,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            status: AttemptStatus::InProgress,
            error: None,
            backup_strategy: None,
            metadata: HashMap::new(),
        }
    }

    pub fn start_backup(name: &str, attempt_number: u32) -> Self {
        Self {
            backup_strategy: Some(name.to_string()),
            ..Self::start(RecoveryStrategy::Fallback, attempt_number)
        }
    }

    pub fn finish(&mut self, success: bool, error: Option<String>, duration: Duration) {
        self.end_time = Some(Utc::now());
        self.duration = Some(duration);
        self.status = if success {
            AttemptStatus::Succeeded
        } else {
            AttemptStatus::Failed
        };
        self.error = error;
    }

    pub fn is_backup(&self) -> bool {
        self.backup_strategy.is_some()
    }
}

/// Bounded attempt sequence responding to one error occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverySession {
    pub id: Uuid,
    pub error_code: String,
    pub error_category: ErrorCategory,
    pub error_severity: ErrorSeverity,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub attempts: Vec<RecoveryAttempt>,
    pub current_strategy: RecoveryStrategy,
    pub escalation_level: u32,
    pub operation: Option<String>,
    pub component: Option<String>,
    pub correlation_id: String,

    /// Backup strategy that concluded the session, if any
    pub resolved_by_backup: Option<String>,
}

impl RecoverySession {
    pub fn from_error(error: &ResilienceError) -> Self {
        Self {
            id: Uuid::new_v4(),
            error_code: error.code.clone(),
            error_category: error.category,
            error_severity: error.severity,
            start_time: Utc::now(),
            end_time: None,
            status: SessionStatus::InProgress,
            attempts: Vec::new(),
            current_strategy: error.recovery.strategy,
            escalation_level: error.recovery.escalation_level,
            operation: error.context.operation.clone(),
            component: error.context.component.clone(),
            correlation_id: error.context.correlation_id.clone(),
            resolved_by_backup: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    /// Attempts made by the primary loop
    pub fn primary_attempts(&self) -> impl Iterator<Item = &RecoveryAttempt> {
        self.attempts.iter().filter(|attempt| !attempt.is_backup())
    }

    pub fn backup_attempts(&self) -> impl Iterator<Item = &RecoveryAttempt> {
        self.attempts.iter().filter(|attempt| attempt.is_backup())
    }

    /// Wall-clock duration, for concluded sessions
    pub fn duration(&self) -> Option<Duration> {
        self.end_time
            .and_then(|end| (end - self.start_time).to_std().ok())
    }
}
