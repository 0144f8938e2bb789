//! Collaborator sinks.
//!
//! The engine produces log-worthy events and alerts; transport and
//! routing live outside this crate. A sink failure is isolated: it is
//! logged locally and discarded, and never changes a verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Direction, RiskLevel};

/// Error returned by a sink implementation.
#[derive(Debug, Error)]
#[error("sink failure: {0}")]
pub struct SinkError(pub String);

/// An alert for a check containing a critical violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Request ID of the offending check.
    pub request_id: Uuid,
    /// User identifier, if the caller supplied one.
    pub user_id: Option<String>,
    /// Direction of the checked text.
    pub direction: Direction,
    /// Risk level of the check.
    pub risk_level: RiskLevel,
    /// Keys of the rules that fired at critical severity.
    pub pattern_keys: Vec<String>,
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,
}

/// Error-reporting sink for critical-severity events.
///
/// Invoked at most once per qualifying check; the engine never retries,
/// and an `Err` from [`alert`](AlertSink::alert) does not affect the
/// returned verdict.
pub trait AlertSink: Send + Sync {
    /// Deliver an alert.
    fn alert(&self, event: &AlertEvent) -> Result<(), SinkError>;
}

/// Default sink that discards alerts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAlertSink;

impl AlertSink for NoopAlertSink {
    fn alert(&self, _event: &AlertEvent) -> Result<(), SinkError> {
        Ok(())
    }
}
