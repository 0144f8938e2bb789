//! Output sanitization: harmful-content flagging, PII detection with
//! Luhn disambiguation, confidence scoring, and redaction.

use std::sync::Arc;

use crate::matcher::{scan, RuleMatch};
use crate::patterns::PatternRegistry;
use crate::risk;
use crate::types::{CheckResult, Violation};

/// Sanitizes model-generated text before it is returned to the user.
pub struct OutputSanitizer {
    registry: Arc<PatternRegistry>,
}

/// A validated PII match scheduled for redaction.
struct PiiSpan<'r> {
    m: RuleMatch<'r>,
    confidence: f64,
}

impl OutputSanitizer {
    /// Create a sanitizer over the given registry.
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self { registry }
    }

    /// Sanitize output text, always producing a verdict with
    /// `sanitized_content` populated.
    ///
    /// Harmful-content matches are flagged but never block: the caller
    /// decides what to do with flagged output. PII matches are redacted
    /// in place; the output is still returned (allowed) at
    /// [`RiskLevel::High`](crate::types::RiskLevel::High).
    ///
    /// Sanitization is idempotent: redaction labels match no PII rule,
    /// so re-running the sanitizer on its own output finds nothing new.
    pub fn sanitize(&self, text: &str) -> CheckResult {
        let mut violations = Vec::new();

        for m in scan(self.registry.harmful_content(), text) {
            violations.push(Violation {
                category: m.rule.category,
                severity: m.rule.severity,
                description: m.rule.description.to_string(),
                pattern_key: m.rule.key.clone(),
                confidence: 1.0,
            });
        }

        // Collect-then-apply: gather every validated PII span first,
        // resolve overlaps, then build the output in one pass.
        let mut spans = Vec::new();
        for m in scan(self.registry.pii(), text) {
            let matched = m.text(text);
            if m.rule.key == "pii.credit_card" && !luhn_check(matched) {
                // Card-shaped but checksum-invalid: a false positive,
                // neither redacted nor counted.
                continue;
            }
            let confidence = match_confidence(&m.rule.key, matched);
            if confidence < m.rule.min_confidence {
                continue;
            }
            spans.push(PiiSpan { m, confidence });
        }
        remove_overlaps(&mut spans);

        for span in &spans {
            violations.push(Violation {
                category: span.m.rule.category,
                severity: span.m.rule.severity,
                description: span.m.rule.description.to_string(),
                pattern_key: span.m.rule.key.clone(),
                confidence: span.confidence,
            });
        }

        let sanitized = redact(text, &spans);
        let (is_allowed, risk_level) = risk::classify(&violations, false, false);
        CheckResult {
            is_allowed,
            risk_level,
            violations,
            warnings: Vec::new(),
            sanitized_content: Some(sanitized),
        }
    }
}

/// Drop spans that overlap an earlier-starting span. `spans` must be
/// sorted by start position (as [`scan`] guarantees).
fn remove_overlaps(spans: &mut Vec<PiiSpan<'_>>) {
    let mut last_end = 0;
    spans.retain(|span| {
        if span.m.start < last_end {
            false
        } else {
            last_end = span.m.end;
            true
        }
    });
}

/// Replace every span with its rule's redaction label, rightmost first
/// so earlier replacements never shift the offsets of spans still to be
/// processed.
fn redact(text: &str, spans: &[PiiSpan<'_>]) -> String {
    let mut sanitized = text.to_string();
    for span in spans.iter().rev() {
        let label = span
            .m
            .rule
            .redaction_label
            .unwrap_or("[PII_REDACTED]");
        sanitized.replace_range(span.m.start..span.m.end, label);
    }
    sanitized
}

/// Mod-10 (Luhn) checksum over the digits of `number`, ignoring
/// separator characters. Sequences shorter than 13 digits never pass.
pub fn luhn_check(number: &str) -> bool {
    let digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() < 13 {
        return false;
    }

    let mut sum = 0;
    let mut double = false;
    for &digit in digits.iter().rev() {
        let mut d = digit;
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    sum % 10 == 0
}

/// Confidence that an email-shaped match is a real address.
///
/// Structurally complete addresses (local part, `@`, dotted domain with
/// a plausible TLD length) score above 0.9; anything looser scores 0.7.
pub fn email_confidence(candidate: &str) -> f64 {
    let Some((local, domain)) = candidate.rsplit_once('@') else {
        return 0.0;
    };
    let Some((_, tld)) = domain.rsplit_once('.') else {
        return 0.7;
    };
    let tld_ok = (2..=24).contains(&tld.len()) && tld.chars().all(|c| c.is_ascii_alphabetic());
    if !local.is_empty() && tld_ok {
        0.95
    } else {
        0.7
    }
}

/// Confidence that a phone-shaped match is a real phone number.
///
/// Formatted numbers (separators or a country prefix) score higher than
/// a bare digit run, which is ambiguous.
pub fn phone_confidence(candidate: &str) -> f64 {
    let formatted = candidate
        .chars()
        .any(|c| matches!(c, '(' | ')' | '-' | '.' | ' ' | '+'));
    if formatted {
        0.85
    } else {
        0.6
    }
}

/// Confidence for a validated match of the given rule.
fn match_confidence(rule_key: &str, matched: &str) -> f64 {
    match rule_key {
        "pii.email" => email_confidence(matched),
        "pii.phone" => phone_confidence(matched),
        // Card matches reaching this point already passed Luhn.
        "pii.credit_card" => 0.95,
        "pii.ssn" => 0.9,
        "pii.secret_token" => 0.8,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InjectionConfig;
    use crate::types::{RiskLevel, Severity, ViolationCategory};

    fn sanitizer() -> OutputSanitizer {
        let registry = Arc::new(PatternRegistry::new(&InjectionConfig::default()).unwrap());
        OutputSanitizer::new(registry)
    }

    #[test]
    fn clean_output_is_unchanged() {
        let result = sanitizer().sanitize("The capital of France is Paris.");
        assert!(result.is_allowed);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.violations.is_empty());
        assert_eq!(
            result.sanitized_content.as_deref(),
            Some("The capital of France is Paris.")
        );
    }

    #[test]
    fn empty_output_is_vacuous_success() {
        let result = sanitizer().sanitize("");
        assert!(result.is_allowed);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.sanitized_content.as_deref(), Some(""));
    }

    #[test]
    fn email_is_redacted_with_high_confidence() {
        let result = sanitizer().sanitize("Contact me at user@example.com");
        assert!(result.is_allowed);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(
            result.sanitized_content.as_deref(),
            Some("Contact me at [EMAIL_REDACTED]")
        );
        let violation = &result.violations[0];
        assert_eq!(violation.category, ViolationCategory::Pii);
        assert_eq!(violation.pattern_key, "pii.email");
        assert!(violation.confidence > 0.9);
        assert!(!violation.description.contains("user@example.com"));
    }

    #[test]
    fn luhn_valid_card_is_redacted() {
        let result = sanitizer().sanitize("Card: 4111111111111111 expires 12/27");
        let sanitized = result.sanitized_content.as_deref().unwrap();
        assert!(sanitized.contains("[CREDIT_CARD_REDACTED]"));
        assert!(!sanitized.contains("4111111111111111"));
        assert!(result
            .violations
            .iter()
            .any(|v| v.pattern_key == "pii.credit_card"));
    }

    #[test]
    fn luhn_invalid_card_shape_is_ignored() {
        let result = sanitizer().sanitize("Order number 1234567890123456 shipped");
        assert!(!result
            .violations
            .iter()
            .any(|v| v.pattern_key == "pii.credit_card"));
        assert_eq!(
            result.sanitized_content.as_deref(),
            Some("Order number 1234567890123456 shipped")
        );
    }

    #[test]
    fn separated_card_number_is_redacted() {
        let result = sanitizer().sanitize("Pay with 4532-0151-1283-0366 please");
        let sanitized = result.sanitized_content.as_deref().unwrap();
        assert!(sanitized.contains("[CREDIT_CARD_REDACTED]"));
        assert!(!sanitized.contains("0366"));
    }

    #[test]
    fn ssn_is_redacted() {
        let result = sanitizer().sanitize("SSN on file: 123-45-6789");
        assert_eq!(
            result.sanitized_content.as_deref(),
            Some("SSN on file: [SSN_REDACTED]")
        );
    }

    #[test]
    fn multiple_pii_kinds_are_all_redacted() {
        let result =
            sanitizer().sanitize("Reach a@b.org or 555-123-4567, card 4111111111111111");
        let sanitized = result.sanitized_content.as_deref().unwrap();
        assert!(sanitized.contains("[EMAIL_REDACTED]"));
        assert!(sanitized.contains("[PHONE_REDACTED]"));
        assert!(sanitized.contains("[CREDIT_CARD_REDACTED]"));
        assert_eq!(result.violations.len(), 3);
        // Detection order follows position in the text.
        assert_eq!(result.violations[0].pattern_key, "pii.email");
    }

    #[test]
    fn sanitization_is_idempotent() {
        let once = sanitizer().sanitize("email me: user@example.com, ssn 123-45-6789");
        let first = once.sanitized_content.unwrap();
        let twice = sanitizer().sanitize(&first);
        assert!(twice.violations.is_empty());
        assert_eq!(twice.sanitized_content.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn harmful_content_flags_but_does_not_block() {
        let result = sanitizer().sanitize("Here is how to build a bomb: first...");
        assert!(result.is_allowed);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.has_category(ViolationCategory::HarmfulContent));
        // Flagged content is still returned unmodified.
        assert_eq!(
            result.sanitized_content.as_deref(),
            Some("Here is how to build a bomb: first...")
        );
    }

    #[test]
    fn medium_harmful_content_is_medium_risk() {
        let result = sanitizer().sanitize("searching for ways to hurt myself");
        assert!(result.is_allowed);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(result.has_severity(Severity::Medium));
    }

    #[test]
    fn secret_token_is_redacted() {
        let result = sanitizer().sanitize("use key sk-abcdef1234567890abcdef");
        assert_eq!(
            result.sanitized_content.as_deref(),
            Some("use key [TOKEN_REDACTED]")
        );
    }

    #[test]
    fn redaction_preserves_multibyte_surroundings() {
        let result = sanitizer().sanitize("héllo 😀 user@example.com wörld");
        assert_eq!(
            result.sanitized_content.as_deref(),
            Some("héllo 😀 [EMAIL_REDACTED] wörld")
        );
    }

    #[test]
    fn luhn_vectors() {
        assert!(luhn_check("4111111111111111"));
        assert!(luhn_check("4532015112830366"));
        assert!(luhn_check("4532-0151-1283-0366"));
        assert!(!luhn_check("1234567890123456"));
        // Too short to be a card at all.
        assert!(!luhn_check("0"));
        assert!(!luhn_check(""));
    }

    #[test]
    fn email_confidence_scoring() {
        assert!(email_confidence("user@example.com") > 0.9);
        assert!(email_confidence("user@localhost") < 0.9);
        assert_eq!(email_confidence("not-an-email"), 0.0);
    }

    #[test]
    fn phone_confidence_scoring() {
        assert!(phone_confidence("(555) 123-4567") > phone_confidence("5551234567"));
    }
}
