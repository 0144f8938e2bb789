//! Input validation: size guard, injection detection, markup warnings.

use std::sync::Arc;

use crate::matcher::scan;
use crate::patterns::PatternRegistry;
use crate::risk;
use crate::types::{CheckResult, Severity, Violation, ViolationCategory};

/// Validates user-supplied text before it reaches the model.
pub struct InputValidator {
    registry: Arc<PatternRegistry>,
    max_input_bytes: usize,
}

impl InputValidator {
    /// Create a validator over the given registry.
    pub fn new(registry: Arc<PatternRegistry>, max_input_bytes: usize) -> Self {
        Self {
            registry,
            max_input_bytes,
        }
    }

    /// Validate input text, always producing a verdict.
    ///
    /// Oversized input is rejected before any pattern scanning runs.
    /// Injection matches are critical and block; suspicious markup
    /// becomes warnings that raise the risk floor without blocking.
    /// The empty string is vacuous success.
    pub fn validate(&self, text: &str) -> CheckResult {
        if text.len() > self.max_input_bytes {
            let violation = Violation {
                category: ViolationCategory::Other,
                severity: Severity::High,
                description: format!(
                    "Input exceeds maximum size of {} bytes",
                    self.max_input_bytes
                ),
                pattern_key: "input.size_limit".to_string(),
                confidence: 1.0,
            };
            let (is_allowed, risk_level) = risk::classify(&[], false, true);
            return CheckResult {
                is_allowed,
                risk_level,
                violations: vec![violation],
                warnings: Vec::new(),
                sanitized_content: None,
            };
        }

        let mut violations = Vec::new();
        for m in scan(self.registry.injection(), text) {
            violations.push(Violation {
                category: m.rule.category,
                severity: m.rule.severity,
                description: m.rule.description.to_string(),
                pattern_key: m.rule.key.clone(),
                confidence: 1.0,
            });
        }

        let warnings: Vec<String> = scan(self.registry.suspicious_markup(), text)
            .iter()
            .map(|m| {
                format!(
                    "Suspicious markup ({}) at byte {}",
                    m.rule.description, m.start
                )
            })
            .collect();

        let (is_allowed, risk_level) = risk::classify(&violations, !warnings.is_empty(), false);
        CheckResult {
            is_allowed,
            risk_level,
            violations,
            warnings,
            sanitized_content: None,
        }
    }
}
