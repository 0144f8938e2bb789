//! Error types for the guardrail engine.

use thiserror::Error;

/// Result type alias for guardrail operations.
pub type Result<T> = std::result::Result<T, GuardrailError>;

/// Errors that can occur while constructing a guardrail engine.
///
/// The check path itself never fails: every call to `check_input` /
/// `check_output` terminates in a [`CheckResult`](crate::types::CheckResult).
/// A rule that does not compile is fatal at construction time instead,
/// since silently skipping a detection rule would be an invisible
/// security regression.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// A detection rule failed to compile.
    #[error("invalid detection rule `{key}`: {source}")]
    InvalidRule {
        /// Stable key of the offending rule.
        key: String,
        /// Underlying regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
