use crate::config::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

/// Default location of the application config file.
pub const DEFAULT_CONFIG_PATH: &str = "config/pairs.toml";

/// Prefix for environment overrides, e.g. `PAIRS_STRATEGY__LEVERAGE=2`.
pub const ENV_PREFIX: &str = "PAIRS_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration from `path` merged with environment
    /// variables. Nested keys are separated by `__` in variable names.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or required keys are missing.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        let config: AppConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Ok(config)
    }

    /// Loads configuration with a profile overlay (`pairs.<profile>.toml`
    /// next to the base file).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(path: impl AsRef<Path>, profile: &str) -> Result<AppConfig> {
        let path = path.as_ref();
        let overlay = path.with_file_name(format!("pairs.{profile}.toml"));
        let config: AppConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Toml::file(&overlay))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| {
                format!(
                    "Failed to load config from {} with profile {profile}",
                    path.display()
                )
            })?;

        Ok(config)
    }
}
