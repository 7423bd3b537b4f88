//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::PackConfig;
use std::path::Path;

/// Loads and validates a `pack.toml` configuration file.
pub fn load_config(path: &Path) -> Result<PackConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `pack.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<PackConfig, ConfigError> {
    let config: PackConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are consistent.
fn validate_config(config: &PackConfig) -> Result<(), ConfigError> {
    if let Some(std) = &config.io.default_iostandard {
        if std.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "io.default_iostandard is empty".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, PackConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[io]
require_iostandard = false
check_drive = true
default_iostandard = "LVCMOS18"

[iologic]
enabled = true
merge_delay_control = false
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(!config.io.require_iostandard);
        assert_eq!(config.io.default_iostandard.as_deref(), Some("LVCMOS18"));
        assert!(!config.iologic.merge_delay_control);
    }

    #[test]
    fn reject_empty_default_standard() {
        let result = load_config_from_str("[io]\ndefault_iostandard = \" \"\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn iologic_disabled_keeps_merge_default() {
        let config = load_config_from_str("[iologic]\nenabled = false\n").unwrap();
        assert!(!config.iologic.enabled);
        assert!(config.iologic.merge_delay_control);
    }

    #[test]
    fn reject_unknown_key() {
        let result = load_config_from_str("[io]\nfoo = 1\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn reject_malformed_toml() {
        let result = load_config_from_str("[io\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn load_missing_file() {
        let result = load_config(Path::new("/nonexistent/pack.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
