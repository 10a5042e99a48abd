//! Configuration loader with layered sources.

use crate::AppConfig;
use config::{Config, Environment, File};
use std::path::Path;
use strata_core::{StrataError, StrataResult};
use tracing::debug;

impl AppConfig {
    /// Loads configuration from the default location (`./config`).
    pub fn load() -> StrataResult<Self> {
        Self::load_from("./config")
    }

    /// Loads configuration from the specified directory.
    ///
    /// Sources are layered in order:
    /// 1. `{config_dir}/default.toml` - committed defaults
    /// 2. `{config_dir}/local.toml` - local overrides (not committed)
    /// 3. Environment variables with the flat deployment names
    ///    (`TOTAL_LEVEL`, `SELECT_WEIGHT`, `KAFKA_BROKERS`, ...)
    pub fn load_from(config_dir: &str) -> StrataResult<Self> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let mut builder = Config::builder();

        for name in ["default", "local"] {
            let path = format!("{config_dir}/{name}.toml");
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(Environment::default().try_parsing(true));

        let config = builder
            .build()
            .map_err(|e| StrataError::configuration(e.to_string()))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| StrataError::configuration(e.to_string()))?;

        app_config.validate()?;

        Ok(app_config)
    }
}
