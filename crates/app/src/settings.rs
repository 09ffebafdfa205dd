//! Application settings, read from `settings.toml` (optional) and overridden
//! by `COOPHUB__<SECTION>__<KEY>` environment variables.
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [server]
//! port = 3000
//! database = { sqlite = "coophub.db" }
//! token_secret = "at least thirty-two bytes of secret material"
//!
//! [payments]
//! provider = "korapay"
//! secret_key = "sk_live_..."
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use server::Provider;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
    Url(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    pub token_secret: String,
    /// Hours a login session stays valid.
    pub session_ttl_hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Payments {
    pub provider: Provider,
    pub secret_key: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    pub payments: Option<Payments>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("COOPHUB").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
