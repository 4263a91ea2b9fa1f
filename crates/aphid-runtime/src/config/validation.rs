//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{AphidConfig, BotConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &AphidConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates the bot settings.
fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.prefix.is_empty() {
        return Err(ConfigError::missing_field("bot.prefix"));
    }

    // The prefix is matched before splitting on spaces.
    if bot.prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Prefix cannot contain whitespace: {:?}",
            bot.prefix
        )));
    }

    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.filters.keys().any(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation("Log filter target cannot be empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_validate_default_config() {
        let config = AphidConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_prefix() {
        let mut config = AphidConfig::default();
        config.bot.prefix = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_validate_prefix_with_whitespace() {
        let mut config = AphidConfig::default();
        config.bot.prefix = "hey bot".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_file_output_without_path() {
        let mut config = AphidConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("aphid.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_blank_filter_target() {
        let mut config = AphidConfig::default();
        config.logging.filters.insert(" ".to_string(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
