use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub mysql: Mysql,
    pub redis: Redis,
    pub amqp: Amqp,
    pub kafka: Kafka,
    pub bus: Bus,
    pub mailer: Mailer,
    pub auth: Auth,
    pub cache: Cache,
    pub gateway: Gateway,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Mysql {
    pub backend: String, // "mysql" or "memory"
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Redis {
    pub backend: String, // "redis" or "memory"
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Amqp {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Kafka {
    pub brokers: String,
}

#[derive(Debug, Deserialize)]
pub struct Bus {
    pub backend: String, // "broker" or "memory"
}

#[derive(Debug, Deserialize)]
pub struct Mailer {
    pub backend: String, // "log"
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    /// Name of the environment variable holding the HS256 signing key.
    pub signing_key_env: String,
}

#[derive(Debug, Deserialize)]
pub struct Cache {
    pub detail_ttl_secs: u64,
    pub search_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Gateway {
    pub window_secs: u64,
    pub max_requests: u32,
    pub auth_max_requests: u32,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
