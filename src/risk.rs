//! Risk classification.
//!
//! The single source of truth for mapping a set of violations to an
//! allow/block decision and an aggregate risk level. Both the input
//! validator and the output sanitizer call through here; neither
//! re-derives any part of this table.

use crate::types::{RiskLevel, Severity, Violation, ViolationCategory};

/// Classify a set of violations into `(is_allowed, risk_level)`.
///
/// Precedence, highest first:
/// 1. `size_exceeded` → blocked, [`RiskLevel::High`].
/// 2. Any [`Severity::Critical`] violation → blocked, [`RiskLevel::Critical`].
/// 3. Any PII or [`Severity::High`] violation → allowed, [`RiskLevel::High`].
/// 4. Any warning or [`Severity::Medium`] violation → allowed,
///    [`RiskLevel::Medium`].
/// 5. Otherwise → allowed, [`RiskLevel::Low`].
pub fn classify(
    violations: &[Violation],
    has_warnings: bool,
    size_exceeded: bool,
) -> (bool, RiskLevel) {
    if size_exceeded {
        return (false, RiskLevel::High);
    }
    if violations.iter().any(|v| v.severity == Severity::Critical) {
        return (false, RiskLevel::Critical);
    }
    if violations
        .iter()
        .any(|v| v.category == ViolationCategory::Pii || v.severity == Severity::High)
    {
        return (true, RiskLevel::High);
    }
    if has_warnings || violations.iter().any(|v| v.severity == Severity::Medium) {
        return (true, RiskLevel::Medium);
    }
    (true, RiskLevel::Low)
}
