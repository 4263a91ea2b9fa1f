//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files (`aphid.toml`, `config.toml`)
//! - `yaml-config`: enables YAML configuration files (`aphid.yaml`, `aphid.yml`, etc.)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults, or a base configuration given to [`ConfigLoader::defaults`]
//! 2. Profile-specific config file (`aphid.{profile}.toml`)
//! 3. Main config file (`aphid.toml`)
//! 4. Environment variables (`APHID_*`)
//! 5. Programmatic overrides ([`ConfigLoader::set`], [`ConfigLoader::provider`])
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `APHID_` prefix with `__` as separator:
//!
//! - `APHID_BOT__PREFIX=?` → `bot.prefix = "?"`
//! - `APHID_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! # Example
//!
//! ```rust,ignore
//! use aphid_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .set("bot.prefix", "?")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::{Figment, Provider};
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::AphidConfig;

const ENV_PREFIX: &str = "APHID_";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting `dev` and `prod` as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `APHID_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("APHID_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Base layer, merged over the built-in defaults and under every file.
    base: Figment,
    /// Programmatic overrides, merged last. Only the keys they set apply.
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            base: Figment::new(),
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds the user config directory (`~/.config/aphid`) to the search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("aphid"))
        } else {
            self
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Replaces the built-in defaults with `config`. Files, environment
    /// variables and overrides still apply on top of it.
    pub fn defaults(mut self, config: AphidConfig) -> Self {
        self.base = self.base.merge(Serialized::defaults(config));
        self
    }

    /// Overrides a single key, such as `bot.prefix`, over every other source.
    pub fn set<V: Serialize>(mut self, key: &str, value: V) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Merges `provider` over every other source. Keys it leaves unset keep
    /// their value from the lower layers.
    pub fn provider<P: Provider>(mut self, provider: P) -> Self {
        self.overrides = self.overrides.merge(provider);
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<AphidConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: AphidConfig = figment.extract()?;

        debug!(
            profile = %profile,
            prefix = %config.bot.prefix,
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(AphidConfig::default()));
        figment = figment.merge(std::mem::take(&mut self.base));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    /// Merges a single config file, dispatching on its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("aphid"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Tries the profile variant then the base file of each name in each
    /// search path. Stops at the first base file found.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    return (merge_fn(figment, &base_path), true);
                }
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["aphid.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["aphid.yaml", "aphid.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<AphidConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<AphidConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|_| {
            let config = ConfigLoader::new().without_env().load().unwrap();

            assert_eq!(config.bot.prefix, "!");
            assert!(!config.bot.reply_errors);
            assert_eq!(config.logging.level.as_str(), "info");
            Ok(())
        });
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse("Development"), Profile::Development);
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }

    #[test]
    fn test_profile_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("APHID_PROFILE", "production");
            assert_eq!(Profile::from_env(), Profile::Production);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_layering_order() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "aphid.staging.toml",
                r#"
                [bot]
                prefix = "?"
                author = "staging"
                "#,
            )?;
            jail.create_file(
                "aphid.toml",
                r#"
                [bot]
                author = "ada"

                [logging]
                level = "debug"
                "#,
            )?;
            jail.set_env("APHID_LOGGING__LEVEL", "warn");

            let config = ConfigLoader::new()
                .profile("staging")
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.bot.prefix, "?");
            assert_eq!(config.bot.author, "ada");
            assert_eq!(config.logging.level, LogLevel::Warn);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_overrides_win() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "aphid.toml",
                r#"
                [bot]
                prefix = "?"
                author = "ada"

                [logging]
                level = "debug"
                "#,
            )?;
            jail.set_env("APHID_BOT__PREFIX", "$");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .set("bot.prefix", "%")
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.bot.prefix, "%");
            assert_eq!(config.bot.author, "ada");
            assert_eq!(config.logging.level, LogLevel::Debug);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_base_config_sits_under_files() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "aphid.toml",
                r#"
                [bot]
                author = "ada"
                "#,
            )?;

            let mut base = AphidConfig::default();
            base.bot.prefix = "%".to_string();
            base.bot.author = "nobody".to_string();

            let config = ConfigLoader::new()
                .without_env()
                .search_path(jail.directory())
                .defaults(base)
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.bot.prefix, "%");
            assert_eq!(config.bot.author, "ada");
            Ok(())
        });
    }

    #[test]
    fn test_provider_override_keeps_unset_keys() {
        Jail::expect_with(|jail| {
            jail.set_env("APHID_BOT__AUTHOR", "grace");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .provider(Serialized::default("bot.reply_errors", true))
                .load()
                .map_err(|e| e.to_string())?;

            assert!(config.bot.reply_errors);
            assert_eq!(config.bot.author, "grace");
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new()
            .without_env()
            .file("/nonexistent/aphid.toml")
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
