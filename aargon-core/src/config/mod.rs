use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Settings shared by every service binary. Loaded once at process start and
/// passed around by reference; never mutated afterwards.
#[derive(Debug, Deserialize, Clone)]
pub struct CoreConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Build a `config` source stack: optional `configuration` file, then
/// `APP__`-prefixed environment variables.
pub fn load<'de, T: Deserialize<'de>>() -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let config = Cfg::builder()
        .add_source(File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;

    Ok(config.try_deserialize()?)
}

impl CoreConfig {
    pub fn load() -> Result<Self, AppError> {
        load()
    }
}
