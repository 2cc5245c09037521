//! Layered configuration loading
//!
//! Every service reads its settings the same way: an optional
//! `config/<name>.{toml,yaml,json}` file, overridden by environment
//! variables. Keys are the lowercased variable names, so `DATABASE_URL`
//! fills a field called `database_url`.

use config::{Config, ConfigError, Environment, File};
use serde::de::DeserializeOwned;

/// Load a settings struct for the named component.
pub fn load<T: DeserializeOwned>(name: &str) -> Result<T, ConfigError> {
    Config::builder()
        .add_source(File::with_name(&format!("config/{}", name)).required(false))
        .add_source(Environment::default().try_parsing(true))
        .build()?
        .try_deserialize()
}
