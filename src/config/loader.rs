//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{ArbError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with ARB_, `__` separates sections)
/// 2. Configuration file (TOML, YAML or JSON, chosen by extension)
/// 3. Default values
///
/// The result is validated before it is returned.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("ARB")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("exchanges")
            .with_list_parse_key("arbitrage.symbols")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ArbError::Configuration(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ArbError::Configuration(e.to_string()))?;

    app_config.validate()?;
    Ok(app_config)
}
