use crate::domain_model::UserId;
use anyhow::{Result, anyhow};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub gateway: Gateway,
    pub log: Log,
    pub session: Session,
}

#[derive(Deserialize)]
pub struct Gateway {
    pub backend: String, // "memory" or "remote"
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    pub access_token: Option<String>,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_bucket() -> String {
    "chat_attachments".to_owned()
}

fn default_timeout_secs() -> u64 {
    30
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("backend", &self.backend)
            .field("url", &self.url)
            .field("api_key", &redacted(!self.api_key.is_empty()))
            .field("access_token", &redacted(self.access_token.is_some()))
            .field("bucket", &self.bucket)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn redacted(present: bool) -> &'static str {
    if present { "<redacted>" } else { "<unset>" }
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "SIGNCHAT";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);
    build(File::with_name(path))
}

pub fn parse_settings_str(toml: &str) -> Result<Settings> {
    build(File::from_str(toml, FileFormat::Toml))
}

fn build<S>(file: S) -> Result<Settings>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings: Settings = Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
