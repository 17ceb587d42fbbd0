//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CinderConfig, LogOutput, LoggingConfig};
use cinder_adapter_onebot::OneBotConfig;

/// Validates the entire configuration.
pub fn validate_config(config: &CinderConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_nicknames(&config.nickname)?;
    validate_onebot_config(&config.onebot)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    if let Some(target) = logging.filters.keys().find(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter target: {target:?}"
        )));
    }

    Ok(())
}

/// Blank nicknames would match every message.
fn validate_nicknames(nicknames: &[String]) -> ConfigResult<()> {
    if nicknames.iter().any(|name| !name.is_empty() && name.trim().is_empty()) {
        return Err(ConfigError::validation("Nicknames cannot be whitespace only"));
    }
    Ok(())
}

/// Validates the OneBot adapter section.
fn validate_onebot_config(onebot: &OneBotConfig) -> ConfigResult<()> {
    if onebot.api_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "onebot.api_timeout_secs must be greater than 0",
        ));
    }

    for (self_id, url) in &onebot.api_root {
        if self_id.contains(' ') {
            return Err(ConfigError::validation("Bot ID cannot contain spaces"));
        }
        // Empty roots mean "not configured".
        if !url.is_empty() {
            validate_url(url)?;
        }
    }

    Ok(())
}

/// Validates an HTTP API root.
fn validate_url(url: &str) -> ConfigResult<()> {
    const VALID_SCHEMES: [&str; 2] = ["http://", "https://"];

    if !VALID_SCHEMES.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {VALID_SCHEMES:?}"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&CinderConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_file_output_without_path() {
        let mut config = CinderConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        config.logging.file_path = Some("logs/cinder.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_api_root() {
        let mut config = CinderConfig::default();
        config
            .onebot
            .api_root
            .insert("10001".to_string(), "ws://127.0.0.1:5700".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));

        config
            .onebot
            .api_root
            .insert("10001".to_string(), String::new());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_timeout_and_nicknames() {
        let mut config = CinderConfig::default();
        config.onebot.api_timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = CinderConfig::default();
        config.nickname = vec!["cinder".to_string(), "  ".to_string()];
        assert!(validate_config(&config).is_err());
    }
}
