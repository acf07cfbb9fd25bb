//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::symbol::options::LayoutOptions;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Defaults for symbol layout; command-line flags override these.
    #[serde(default)]
    pub layout: LayoutOptions,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_layout(&self.layout)
    }
}

/// Checks the numeric layout options.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] if `push` is outside `0.0..=1.0`
/// or the box line width is not positive.
pub fn validate_layout(layout: &LayoutOptions) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&layout.push) {
        return Err(ConfigError::ValidationError {
            message: format!("push must be between 0 and 1, got {}", layout.push),
        });
    }
    if layout.box_line_width.is_nan() || layout.box_line_width <= 0.0 {
        return Err(ConfigError::ValidationError {
            message: format!(
                "box_line_width must be positive, got {}",
                layout.box_line_width
            ),
        });
    }
    Ok(())
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::options::{Annotation, FillStyle, SortMode};
    use crate::symbol::pin::{PinType, Side};

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.layout, LayoutOptions::default());
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "layout": {
                "sort": "num",
                "reverse": true,
                "default_side": "right",
                "default_type": "passive",
                "default_style": "line",
                "bundle": true,
                "annotation": "range",
                "push": 0.0,
                "scrunch": true,
                "ccw": false,
                "center": false,
                "box_line_width": 0.3,
                "fill": "no_fill",
                "alt_delimiter": "/",
                "fuzzy": true
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.layout.sort, SortMode::Num);
        assert!(config.layout.reverse);
        assert_eq!(config.layout.default_side, Side::Right);
        assert_eq!(config.layout.default_type, PinType::Passive);
        assert!(config.layout.bundle);
        assert_eq!(config.layout.annotation, Annotation::Range);
        assert!(config.layout.push.abs() < f64::EPSILON);
        assert!(config.layout.scrunch);
        assert!((config.layout.box_line_width - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.layout.fill, FillStyle::NoFill);
        assert_eq!(config.layout.alt_delimiter, Some('/'));
        assert!(config.layout.fuzzy);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_push_out_of_range() {
        let json = r#"{ "layout": { "push": 1.5 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_zero_line_width() {
        let json = r#"{ "layout": { "box_line_width": 0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());

        let json = r#"{ "layout": { "pitch": 2.54 } }"#;
        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
