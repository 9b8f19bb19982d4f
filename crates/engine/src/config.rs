use std::time::Duration;

use wps_core::duration::parse_retention;
use wps_core::error::CoreError;
use wps_core::polling::PollingConfig;

/// Default result retention: one hour.
pub const DEFAULT_RESULT_RETENTION: &str = "P0Y0D1H0M0S";

/// Engine-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Polling window applied to jobs submitted without an override.
    pub polling: PollingConfig,
    /// How long finished jobs and their outputs stay retrievable.
    pub result_retention: Duration,
}

impl EngineConfig {
    /// Replace the retention window with a `PnYnDnHnMnS` duration string.
    pub fn with_retention(mut self, retention: &str) -> Result<Self, CoreError> {
        self.result_retention = parse_retention(retention)?;
        Ok(self)
    }

    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            polling: PollingConfig::default(),
            result_retention: Duration::from_secs(3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retention_matches_constant() {
        let parsed = EngineConfig::default()
            .with_retention(DEFAULT_RESULT_RETENTION)
            .unwrap();
        assert_eq!(parsed, EngineConfig::default());
    }

    #[test]
    fn bad_retention_is_an_error() {
        assert!(EngineConfig::default().with_retention("soon").is_err());
    }
}
