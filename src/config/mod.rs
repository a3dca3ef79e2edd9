//! Bridge configuration
//!
//! Loaded from `.numbridge.toml`. Every key is optional.
//!
//! ```toml
//! [convert]
//! collapse_cells = true
//! strict_unsupported = false
//!
//! [session]
//! identifier = ""
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//! ```

use crate::errors::{BridgeError, Result};
use crate::logging::{LogConfig, LogFormat, LogOutput};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::Level;

pub const CONFIG_FILE_NAME: &str = ".numbridge.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub convert: ConvertOptions,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// Knobs consulted by both converters and the call marshaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Collapse homogeneous cells of scalars into one typed vector.
    #[serde(default = "default_true")]
    pub collapse_cells: bool,

    /// Tag values from fixed-width numeric classes with their class name.
    #[serde(default = "default_true")]
    pub tag_numeric_class: bool,

    /// Treat values without a conversion rule as errors instead of dropping them.
    #[serde(default = "default_false")]
    pub strict_unsupported: bool,

    /// Attach the struct class name to converted records.
    #[serde(default = "default_true")]
    pub struct_class_tag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Start command handed to the engine factory.
    #[serde(default)]
    pub identifier: String,

    /// Install the opened session as the process-wide default.
    #[serde(default = "default_true")]
    pub make_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: FormatName,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatName {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            collapse_cells: true,
            tag_numeric_class: true,
            strict_unsupported: false,
            struct_class_tag: true,
        }
    }
}

impl ConvertOptions {
    pub fn strict() -> Self {
        Self {
            strict_unsupported: true,
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            make_default: true,
        }
    }
}

impl SessionConfig {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    pub fn detached(mut self) -> Self {
        self.make_default = false;
        self
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: FormatName::default(),
            filter: None,
        }
    }
}

impl LoggingSection {
    pub fn to_log_config(&self) -> Result<LogConfig> {
        let level: Level = self
            .level
            .parse()
            .map_err(|_| BridgeError::config(format!("Unknown log level '{}'", self.level)))?;

        let format = match self.format {
            FormatName::Pretty => LogFormat::Pretty,
            FormatName::Compact => LogFormat::Compact,
            FormatName::Json => LogFormat::Json,
        };

        let mut config = LogConfig::new()
            .with_level(level)
            .with_format(format)
            .with_output(LogOutput::Stderr);
        if let Some(filter) = &self.filter {
            config = config.with_filter(filter.clone());
        }
        Ok(config)
    }
}

fn default_true() -> bool { true }
fn default_false() -> bool { false }
fn default_level() -> String { "info".to_string() }

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| BridgeError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| BridgeError::config(format!("Failed to parse config: {}", e)))
    }

    /// Searches `start` and its parents for a config file.
    /// Falls back to defaults when none is found or it fails to load.
    pub fn discover_from(start: &Path) -> Self {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = %config_path.display(), error = %e, "ignoring config file");
                        return Self::default();
                    }
                }
            }
            current = dir.parent().map(|p| p.to_path_buf());
        }

        Self::default()
    }

    pub fn discover() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::discover_from(&dir),
            Err(_) => Self::default(),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| BridgeError::config(format!("Failed to serialize config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = BridgeConfig::parse("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert!(config.convert.collapse_cells);
        assert!(!config.convert.strict_unsupported);
        assert!(config.session.make_default);
    }

    #[test]
    fn test_partial_sections() {
        let config = BridgeConfig::parse(
            r#"
            [convert]
            strict_unsupported = true

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert!(config.convert.strict_unsupported);
        assert!(config.convert.tag_numeric_class);
        assert_eq!(config.logging.format, FormatName::Json);

        let log = config.logging.to_log_config().unwrap();
        assert_eq!(log.level, Level::DEBUG);
        assert_eq!(log.format, LogFormat::Json);
    }

    #[test]
    fn test_bad_level_is_a_config_error() {
        let section = LoggingSection {
            level: "loud".to_string(),
            ..LoggingSection::default()
        };
        let err = section.to_log_config().unwrap_err();
        assert!(matches!(err.kind, crate::errors::ErrorKind::Config { .. }));
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(BridgeConfig::parse("[convert\n").is_err());
    }

    #[test]
    fn test_discover_walks_parents() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let mut file = std::fs::File::create(root.path().join(CONFIG_FILE_NAME)).unwrap();
        writeln!(file, "[session]\nidentifier = \"workspace\"\nmake_default = false").unwrap();

        let config = BridgeConfig::discover_from(&nested);
        assert_eq!(config.session.identifier, "workspace");
        assert!(!config.session.make_default);
    }

    #[test]
    fn test_serialized_config_parses_back() {
        let mut config = BridgeConfig::default();
        config.convert.collapse_cells = false;
        let text = config.to_toml().unwrap();
        assert_eq!(BridgeConfig::parse(&text).unwrap(), config);
    }
}
