//! Applies rule tables to text.

use crate::patterns::Rule;

/// A raw match produced by running a rule table over a text buffer.
///
/// Offsets are byte positions into the scanned text and always fall on
/// UTF-8 character boundaries.
#[derive(Debug)]
pub struct RuleMatch<'r> {
    /// The rule that fired.
    pub rule: &'r Rule,
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
}

impl RuleMatch<'_> {
    /// The matched substring.
    pub fn text<'t>(&self, source: &'t str) -> &'t str {
        &source[self.start..self.end]
    }
}

/// Run every rule in `rules` over `text`, yielding all matches sorted by
/// start position (ties broken by rule order).
pub fn scan<'r>(rules: &'r [Rule], text: &str) -> Vec<RuleMatch<'r>> {
    let mut matches = Vec::new();
    for rule in rules {
        for m in rule.regex.find_iter(text) {
            matches.push(RuleMatch {
                rule,
                start: m.start(),
                end: m.end(),
            });
        }
    }
    // Stable sort keeps rule-table order for same-position matches.
    matches.sort_by_key(|m| m.start);
    matches
}
