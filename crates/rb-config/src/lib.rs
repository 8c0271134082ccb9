//! # rb-config
//!
//! Runtime settings for Rusty-Blog. Values come from built-in defaults,
//! then an optional `.env` file, then `RB__`-prefixed environment variables
//! (`RB__SECTION__KEY`, e.g. `RB__DATABASE__URL`).
//!
//! The session secret has no default and must be supplied externally.

use config::{Config, Environment};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "RB";
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("session.secret must be at least 32 bytes (set RB__SESSION__SECRET)")]
    WeakSecret,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// sqlx connection string, e.g. "sqlite:rusty_blog.db"
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    pub upload_dir: String,
    /// URL prefix the upload directory's parent is served under
    pub public_prefix: String,
    pub max_bytes: usize,
    pub allowed_extensions: Vec<String>,
    /// Hash-prefix stored names so uploads never overwrite each other
    pub unique_names: bool,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    pub secret: SecretString,
    pub ttl_hours: i64,
    /// Mark the session cookie `Secure` (enable behind HTTPS)
    pub secure_cookie: bool,
}

impl Settings {
    /// Loads `.env` (if present) and the process environment on top of defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("loaded environment from {}", path.display());
        }
        let source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("media.allowed_extensions")
            .try_parsing(true);
        Self::from_builder(Config::builder().add_source(source))
    }

    /// Applies defaults underneath whatever `builder` already holds, then validates.
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings: Settings = builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite:rusty_blog.db")?
            .set_default("media.upload_dir", "static/uploads")?
            .set_default("media.public_prefix", "/static")?
            .set_default("media.max_bytes", 10 * 1024 * 1024)?
            .set_default(
                "media.allowed_extensions",
                vec!["png", "jpg", "jpeg", "gif", "webp", "mp4", "webm"],
            )?
            .set_default("media.unique_names", false)?
            .set_default("session.ttl_hours", 24)?
            .set_default("session.secure_cookie", false)?
            .build()?
            .try_deserialize()?;

        if settings.session.secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }
        Ok(settings)
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}
