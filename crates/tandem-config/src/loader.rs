//! Configuration loading from files and strings.

use crate::config::SyncConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use tracing::{debug, info};

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (`.toml`)
    #[cfg(feature = "toml")]
    Toml,
    /// YAML (`.yaml`, `.yml`)
    #[cfg(feature = "yaml")]
    Yaml,
    /// JSON (`.json`)
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            #[cfg(feature = "toml")]
            "toml" => Ok(Self::Toml),
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "toml")]
            Self::Toml => "TOML",
            #[cfg(feature = "yaml")]
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        }
    }
}

/// Loads and validates [`SyncConfig`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, detecting the format from its extension.
    pub async fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<SyncConfig> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        debug!("Loading {} configuration from {}", format.name(), path.display());

        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_str_with_format(&content, format)?;

        info!(
            statuses = config.statuses.len(),
            locations = config.locations.len(),
            "Loaded configuration from {}",
            path.display()
        );
        Ok(config)
    }

    /// Load from a file if given, otherwise return validated defaults.
    pub async fn load_or_default(path: Option<&Path>) -> ConfigResult<SyncConfig> {
        match path {
            Some(path) => Self::load_from_file(path).await,
            None => {
                let config = SyncConfig::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Parse and validate configuration text.
    pub fn from_str_with_format(content: &str, format: ConfigFormat) -> ConfigResult<SyncConfig> {
        let config: SyncConfig = match format {
            #[cfg(feature = "toml")]
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse {
                format: format.name(),
                message: e.to_string(),
            })?,
            #[cfg(feature = "yaml")]
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                format: format.name(),
                message: e.to_string(),
            })?,
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                format: format.name(),
                message: e.to_string(),
            })?,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ConfigFormat::from_path(&PathBuf::from("a/tandem.TOML")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(&PathBuf::from("tandem.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert!(matches!(
            ConfigFormat::from_path(&PathBuf::from("tandem.ini")),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn test_json_partial_config_uses_defaults() {
        let config = ConfigLoader::from_str_with_format(
            r#"{"bus": {"timeout_ms": 250}}"#,
            ConfigFormat::Json,
        )
        .unwrap();
        assert_eq!(config.bus.timeout_ms, 250);
        assert!(config.bus.async_dispatch);
        assert_eq!(config.fields.status, "Status");
        assert_eq!(config.statuses.len(), 5);
    }

    #[test]
    fn test_parse_error_names_format() {
        let err = ConfigLoader::from_str_with_format("{not json", ConfigFormat::Json).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse JSON configuration"));
    }
}
