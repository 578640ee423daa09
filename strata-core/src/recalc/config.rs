//! Recalculation Config

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RecalcError;

/// Settings for the recalculation loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecalcConfig {
    /// Pause between two passes, in milliseconds.
    pub poll_interval_ms: u64,

    /// Maximum number of stale roots processed by a single pass.
    pub max_roots_per_pass: usize,

    /// Abort a pass on the first failing root instead of skipping it.
    pub stop_on_error: bool,
}

impl Default for RecalcConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_roots_per_pass: 16,
            stop_on_error: false,
        }
    }
}

impl RecalcConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, RecalcError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RecalcError> {
        if self.poll_interval_ms == 0 {
            return Err(RecalcError::InvalidConfig(
                "poll_interval_ms must be positive".into(),
            ));
        }
        if self.max_roots_per_pass == 0 {
            return Err(RecalcError::InvalidConfig(
                "max_roots_per_pass must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = RecalcConfig::from_json(r#"{"poll_interval_ms": 250}"#).unwrap();

        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.max_roots_per_pass, 16);
        assert!(!config.stop_on_error);
    }

    #[test]
    fn rejects_zero_batch() {
        let err = RecalcConfig::from_json(r#"{"max_roots_per_pass": 0}"#).unwrap_err();
        assert!(matches!(err, RecalcError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = RecalcConfig::from_json(r#"{"poll_interval": 5}"#).unwrap_err();
        assert!(matches!(err, RecalcError::Config(_)));
    }

    #[test]
    fn serializes_back_to_json() {
        let json = serde_json::to_string(&RecalcConfig::default()).unwrap();
        assert_eq!(RecalcConfig::from_json(&json).unwrap(), RecalcConfig::default());
    }
}
