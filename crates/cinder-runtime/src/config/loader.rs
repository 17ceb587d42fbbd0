//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files (`cinder.toml`)
//! - `yaml-config`: enables YAML configuration files (`cinder.yaml`, `cinder.yml`)
//!
//! Both features can be enabled simultaneously; the first file found in
//! search order is loaded.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic values passed to [`ConfigLoader::merge`]
//! 3. Config file: an explicit [`ConfigLoader::file`], or the first
//!    `cinder.*` found in the current directory, then `<config dir>/cinder/`
//! 4. Environment variables (`CINDER_*`)
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `CINDER_` prefix with `__` as separator:
//!
//! - `CINDER_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `CINDER_ONEBOT__API_TIMEOUT_SECS=60` → `onebot.api_timeout_secs = 60`
//! - `CINDER_ONEBOT__API_ROOT__10001=http://127.0.0.1:5700` → `onebot.api_root."10001"`
//!
//! # Example
//!
//! ```rust,ignore
//! use cinder_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load()?;
//!
//! let config = ConfigLoader::new()
//!     .file("./config/cinder.toml")
//!     .without_env()
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::CinderConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "CINDER_";

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic layers.
    figment: Figment,
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
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds a search path for configuration files.
    ///
    /// Once any path is added, the default locations are no longer searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges configuration values programmatically, below files and env.
    pub fn merge(mut self, config: CinderConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<CinderConfig> {
        let figment = self.build_figment()?;

        let config: CinderConfig = figment
            .extract()
            .map_err(|e| ConfigError::Extract(e.to_string()))?;
        validate_config(&config)?;

        debug!(
            logging_level = %config.logging.level,
            nicknames = config.nickname.len(),
            command_starts = config.command_start.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(CinderConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

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

        Ok(figment)
    }

    /// Merges a single config file into the figment, dispatching on file extension.
    ///
    /// Only extensions enabled via feature flags are accepted.
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

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("cinder"));
        }
        paths
    }

    /// Returns the first existing `cinder.*` file in search order.
    #[allow(unused_mut)]
    fn find_config_file(&self) -> Option<PathBuf> {
        let mut names: Vec<&str> = Vec::new();
        #[cfg(feature = "toml-config")]
        names.push("cinder.toml");
        #[cfg(feature = "yaml-config")]
        names.extend(["cinder.yaml", "cinder.yml"]);

        self.resolve_search_paths()
            .into_iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .find(|path| path.is_file())
    }

    /// Searches for and loads a configuration file from the search paths.
    fn load_config_files(&self, figment: Figment) -> Figment {
        match self.find_config_file() {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration file");
                // Only enabled extensions are ever found.
                Self::merge_config_file(figment.clone(), &path).unwrap_or(figment)
            }
            None => {
                warn!("No configuration file found, using defaults");
                figment
            }
        }
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<CinderConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from a specific file, with env overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<CinderConfig> {
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
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, LogLevel::Info);
            assert_eq!(config.command_start, vec!["/"]);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("CINDER_LOGGING__LEVEL", "debug");
            jail.set_env("CINDER_ONEBOT__API_TIMEOUT_SECS", "5");
            jail.set_env("CINDER_ONEBOT__API_ROOT__10001", "http://127.0.0.1:5700");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.onebot.api_timeout_secs, 5);
            assert_eq!(
                config.onebot.api_root_for("10001"),
                Some("http://127.0.0.1:5700")
            );
            Ok(())
        });
    }

    #[test]
    fn test_without_env_ignores_variables() {
        Jail::expect_with(|jail| {
            jail.set_env("CINDER_LOGGING__LEVEL", "error");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, LogLevel::Info);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|_jail| {
            let err = ConfigLoader::new()
                .file("missing.toml")
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::FileNotFound(_)));
            Ok(())
        });
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("cinder.ini", "level = debug")?;
            let err = ConfigLoader::new().file("cinder.ini").load().unwrap_err();
            assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "ini"));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("CINDER_ONEBOT__API_TIMEOUT_SECS", "0");
            let err = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError { .. }));
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_file_with_env_on_top() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "cinder.toml",
                r#"
                nickname = ["cinder", "ember"]
                command_start = ["/", "!"]

                [logging]
                level = "warn"

                [onebot]
                access_token = "secret"
                api_root = { "10001" = "http://127.0.0.1:5700" }
                "#,
            )?;
            jail.set_env("CINDER_LOGGING__LEVEL", "trace");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.nickname, vec!["cinder", "ember"]);
            assert_eq!(config.command_start, vec!["/", "!"]);
            assert_eq!(config.logging.level, LogLevel::Trace);
            assert_eq!(config.onebot.access_token.as_deref(), Some("secret"));
            assert_eq!(
                config.onebot.api_root_for("10001"),
                Some("http://127.0.0.1:5700")
            );
            Ok(())
        });
    }

    #[cfg(feature = "yaml-config")]
    #[test]
    fn test_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "cinder.yaml",
                "nickname: [cinder]\ncommand_start: []\nonebot:\n  api_timeout_secs: 10\n",
            )?;

            let config = ConfigLoader::new()
                .file("cinder.yaml")
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.nickname, vec!["cinder"]);
            assert!(config.command_start.is_empty());
            assert_eq!(config.onebot.api_timeout_secs, 10);
            Ok(())
        });
    }
}
