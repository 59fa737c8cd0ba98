//! Top-level configuration.

use crate::components::{
    default_locations, default_statuses, BusConfig, FieldNames, LocationConfig,
    StatusDefinition, StatusPreferences, SyncTimingConfig,
};
use crate::error::{ConfigError, ConfigResult};
use globset::Glob;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete configuration for a Tandem instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Ordered status vocabulary.
    #[serde(default = "default_statuses")]
    pub statuses: Vec<StatusDefinition>,

    /// Preferred status names when `Done` drives `Status`.
    #[serde(default)]
    pub preferences: StatusPreferences,

    /// Field names.
    #[serde(default)]
    pub fields: FieldNames,

    /// Tracked locations.
    #[serde(default = "default_locations")]
    pub locations: Vec<LocationConfig>,

    /// Event bus defaults.
    #[serde(default)]
    pub bus: BusConfig,

    /// Reentrancy lock timing.
    #[serde(default)]
    pub sync: SyncTimingConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            statuses: default_statuses(),
            preferences: StatusPreferences::default(),
            fields: FieldNames::default(),
            locations: default_locations(),
            bus: BusConfig::default(),
            sync: SyncTimingConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Replace the status list.
    pub fn with_statuses(mut self, statuses: Vec<StatusDefinition>) -> Self {
        self.statuses = statuses;
        self
    }

    /// Replace the tracked locations.
    pub fn with_locations(mut self, locations: Vec<LocationConfig>) -> Self {
        self.locations = locations;
        self
    }

    /// Check that the configuration is usable.
    ///
    /// The status list must be non-empty, have unique names and contain at
    /// least one done and one not-done status, otherwise `Done` could flip
    /// to a value no status can represent.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.statuses.is_empty() {
            return Err(ConfigError::Validation("status list is empty".into()));
        }

        let mut seen = HashSet::new();
        for status in &self.statuses {
            if status.name.trim().is_empty() {
                return Err(ConfigError::Validation("status name is empty".into()));
            }
            if !seen.insert(status.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate status '{}'",
                    status.name
                )));
            }
        }

        if !self.statuses.iter().any(|s| s.is_done) {
            return Err(ConfigError::Validation("no status has is_done = true".into()));
        }
        if !self.statuses.iter().any(|s| !s.is_done) {
            return Err(ConfigError::Validation("no status has is_done = false".into()));
        }

        if self.fields.status == self.fields.done {
            return Err(ConfigError::Validation(format!(
                "status and done fields are both '{}'",
                self.fields.status
            )));
        }

        for location in &self.locations {
            if location.patterns.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "location for class '{}' has no patterns",
                    location.class
                )));
            }
            for pattern in &location.patterns {
                Glob::new(pattern).map_err(|e| ConfigError::Pattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
            }
        }

        if self.bus.timeout_ms == 0 {
            return Err(ConfigError::Validation("bus.timeout_ms must be positive".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ResourceClass;

    #[test]
    fn test_default_config_is_valid() {
        SyncConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_duplicate_status() {
        let config = SyncConfig::default().with_statuses(vec![
            StatusDefinition::new("Done", true),
            StatusDefinition::new("Open", false),
            StatusDefinition::new("Done", true),
        ]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate status 'Done'"));
    }

    #[test]
    fn test_rejects_one_sided_vocabulary() {
        let config = SyncConfig::default().with_statuses(vec![
            StatusDefinition::new("Open", false),
            StatusDefinition::new("Waiting", false),
        ]);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_bad_glob() {
        let config = SyncConfig::default()
            .with_locations(vec![LocationConfig::new(ResourceClass::Task, ["Tasks/[*.md"])]);
        assert!(matches!(config.validate(), Err(ConfigError::Pattern { .. })));
    }

    #[test]
    fn test_rejects_same_field_names() {
        let mut config = SyncConfig::default();
        config.fields.done = "Status".into();
        assert!(config.validate().is_err());
    }
}
