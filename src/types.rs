//! Core types for the guardrail engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a detected violation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    /// Input crafted to override or subvert the system's instructions.
    PromptInjection,
    /// Content matching harmful-content rules.
    HarmfulContent,
    /// Personally identifiable information.
    Pii,
    /// Anything else (currently only the input size guard).
    Other,
}

impl std::fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationCategory::PromptInjection => write!(f, "prompt_injection"),
            ViolationCategory::HarmfulContent => write!(f, "harmful_content"),
            ViolationCategory::Pii => write!(f, "pii"),
            ViolationCategory::Other => write!(f, "other"),
        }
    }
}

/// Severity of a single violation, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Aggregate risk classification for an entire check, ordered from least
/// to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// A single detected violation.
///
/// `description` is safe to log: for PII violations it never contains the
/// captured substring. `pattern_key` identifies the static rule that fired
/// and is never derived from matched text, so metrics aggregation over it
/// is stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Category of the violation.
    pub category: ViolationCategory,
    /// Severity, determined solely by the rule that fired.
    pub severity: Severity,
    /// Human-readable explanation.
    pub description: String,
    /// Stable identifier of the rule that fired.
    pub pattern_key: String,
    /// Informational confidence score in `0.0..=1.0`. Not used to
    /// suppress redaction; 1.0 where a score is not meaningful.
    pub confidence: f64,
}

/// Result of checking a piece of input or output text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the text may proceed.
    pub is_allowed: bool,
    /// Aggregate risk classification.
    pub risk_level: RiskLevel,
    /// Violations in detection order.
    pub violations: Vec<Violation>,
    /// Non-blocking notices (e.g. suspicious-but-not-disallowed markup).
    pub warnings: Vec<String>,
    /// Sanitized text. Present only for output checks; equals the input
    /// unchanged when no PII was found.
    pub sanitized_content: Option<String>,
}

impl CheckResult {
    /// Whether any violation reaches the given severity.
    pub fn has_severity(&self, severity: Severity) -> bool {
        self.violations.iter().any(|v| v.severity >= severity)
    }

    /// Whether any violation belongs to the given category.
    pub fn has_category(&self, category: ViolationCategory) -> bool {
        self.violations.iter().any(|v| v.category == category)
    }
}

/// Result of a comprehensive (input + output) check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveResult {
    /// Verdict for the input text.
    pub input: CheckResult,
    /// Verdict for the output text.
    pub output: CheckResult,
    /// The higher of the two individual risk levels. A blocked input
    /// forces this to at least the input's risk level.
    pub overall_risk: RiskLevel,
}

/// Direction of content flow through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Text headed to the LLM.
    Input,
    /// Text generated by the LLM.
    Output,
}

/// Request context attached to a check, used only for log and alert
/// events. Classification never reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckContext {
    /// Unique request ID.
    pub request_id: Uuid,
    /// User identifier, if known.
    pub user_id: Option<String>,
    /// Session identifier, if known.
    pub session_id: Option<String>,
    /// When the check was initiated.
    pub timestamp: DateTime<Utc>,
}

impl Default for CheckContext {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: None,
            session_id: None,
            timestamp: Utc::now(),
        }
    }
}

impl CheckContext {
    /// Create a new context with a fresh request ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user ID.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the session ID.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
