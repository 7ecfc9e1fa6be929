//! # velo-config
//!
//! Layered configuration loading for velo using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`VELO_*` prefix, `__` as separator)
//! 2. Project-level `velo.toml`
//! 3. User-level `~/.config/velo/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `VELO_DATABASE__PATH` -> `database.path`,
//! `VELO_INGEST__CHUNK_SIZE` -> `ingest.chunk_size`, etc. The `__` (double
//! underscore) separates nested config sections.

mod database;
mod error;
mod ingest;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use ingest::IngestConfig;

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VeloConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl VeloConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need
    /// `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if extraction fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if extraction fails.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer additional providers.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from("velo.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("VELO_").split("__"))
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("velo").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = VeloConfig::default();
        assert_eq!(config.ingest.chunk_size, 5000);
        assert_eq!(config.ingest.link_batch_size, 1000);
        assert_eq!(config.ingest.speed_batch_size, 5000);
        assert_eq!(config.database.path, "velo.duckdb");
    }

    #[test]
    fn figment_builds_without_files() {
        figment::Jail::expect_with(|_jail| {
            let config: VeloConfig = VeloConfig::figment().extract().expect("extract defaults");
            assert_eq!(config.ingest.chunk_size, 5000);
            Ok(())
        });
    }

    #[test]
    fn env_vars_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("VELO_INGEST__CHUNK_SIZE", "1234");
            jail.set_env("VELO_DATABASE__PATH", "/tmp/other.duckdb");
            let config: VeloConfig = VeloConfig::figment().extract().expect("extract env");
            assert_eq!(config.ingest.chunk_size, 1234);
            assert_eq!(config.database.path, "/tmp/other.duckdb");
            Ok(())
        });
    }

    #[test]
    fn toml_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "velo.toml",
                r#"
                [ingest]
                link_batch_size = 250
                "#,
            )?;
            let config: VeloConfig = VeloConfig::figment().extract().expect("extract toml");
            assert_eq!(config.ingest.link_batch_size, 250);
            // Untouched sections keep their defaults.
            assert_eq!(config.ingest.speed_batch_size, 5000);
            Ok(())
        });
    }
}
