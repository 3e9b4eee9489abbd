//! CLI configuration loading

use anyhow::Result;
use config::{Config, Environment, File};
use keystone_core::ClientConfig;
use std::path::Path;

/// Load the client configuration.
///
/// Defaults, then the optional TOML file, then `KEYSTONE_*` environment
/// variables (`KEYSTONE_ENDPOINTS__LOGIN` for nested keys).
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    let mut builder = Config::builder().add_source(Config::try_from(&ClientConfig::default())?);

    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }

    builder = builder.add_source(
        Environment::with_prefix("KEYSTONE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config: ClientConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
