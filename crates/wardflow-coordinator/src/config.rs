use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading coordinator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Tunables for the coordinator.
///
/// Everything has a sensible default; embedders typically construct this
/// with `CoordinatorConfig::default()` or load it from a TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Buffer size of the domain-event broadcast channel.
    pub event_capacity: usize,
    /// When true, admit/assign reject patient and staff ids the directories
    /// do not recognize. When false (default) the directories are trusted
    /// per the pre-authorized-caller contract.
    pub strict_identity: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1024,
            strict_identity: false,
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from a TOML file, filling unset keys with
    /// defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let loaded: Self = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.event_capacity == 0 {
            return Err(ConfigError::Validation(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.event_capacity, 1024);
        assert!(!config.strict_identity);
    }

    #[test]
    fn test_from_file_partial_keys() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "strict_identity = true").unwrap();

        let config = CoordinatorConfig::from_file(file.path()).unwrap();
        assert!(config.strict_identity);
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_from_file_rejects_zero_capacity() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "event_capacity = 0").unwrap();

        let err = CoordinatorConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_from_file_missing_file() {
        let err = CoordinatorConfig::from_file("/nonexistent/wardflow.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
