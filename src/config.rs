//! Configuration for the guardrail engine.

use serde::{Deserialize, Serialize};

use crate::error::{GuardrailError, Result};

/// Main configuration for a [`GuardrailEngine`](crate::engine::GuardrailEngine).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GuardrailConfig {
    /// Input size guard configuration.
    pub input: InputConfig,
    /// Injection detection configuration.
    pub injection: InjectionConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl GuardrailConfig {
    /// Validate the configuration, rejecting values that would disable
    /// detection or break metrics bookkeeping.
    pub fn validate(&self) -> Result<()> {
        if self.input.max_input_bytes == 0 {
            return Err(GuardrailError::InvalidConfig(
                "max_input_bytes must be greater than zero".to_string(),
            ));
        }
        if self.metrics.recent_capacity == 0 {
            return Err(GuardrailError::InvalidConfig(
                "recent_capacity must be greater than zero".to_string(),
            ));
        }
        if self.metrics.top_patterns_limit == 0 {
            return Err(GuardrailError::InvalidConfig(
                "top_patterns_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Input size guard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Maximum input size in bytes. Oversized input is rejected before
    /// any pattern scanning.
    pub max_input_bytes: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 100_000,
        }
    }
}

/// Injection detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InjectionConfig {
    /// Additional injection patterns (regex syntax, compiled
    /// case-insensitively). Each compiles into the registry at engine
    /// construction with critical severity; an invalid pattern fails
    /// construction.
    pub custom_patterns: Vec<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Capacity of the recent-violations ring buffer.
    pub recent_capacity: usize,
    /// How many entries `top_patterns` reports.
    pub top_patterns_limit: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            recent_capacity: 50,
            top_patterns_limit: 10,
        }
    }
}
