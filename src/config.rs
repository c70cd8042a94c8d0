use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    pub database_path: String,
    pub log_level: String,
    /// The one chat user allowed to edit the tree.
    pub admin_id: i64,
    /// Shared secret the transport sends in `X-Webhook-Secret`.
    pub webhook_secret: String,
}

const MIN_SECRET_LEN: usize = 16;

fn required_var(name: &str) -> Result<String, config::ConfigError> {
    env::var(name).map_err(|_| {
        config::ConfigError::Message(format!(
            "FATAL: Environment variable '{}' is not set in your .env file.",
            name
        ))
    })
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path).map_err(|e| {
            config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}",
                env_path.display(),
                e
            ))
        })?;

        let database_path = required_var("DATABASE_PATH")?;
        if Path::new(&database_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'DATABASE_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                database_path
            )));
        }

        let admin_id = required_var("ADMIN_ID")?.trim().parse::<i64>().map_err(|_| {
            config::ConfigError::Message(
                "FATAL: 'ADMIN_ID' must be the numeric chat user id of the administrator.".to_string(),
            )
        })?;

        let webhook_secret = required_var("WEBHOOK_SECRET")?;
        if webhook_secret.len() < MIN_SECRET_LEN {
            return Err(config::ConfigError::Message(format!(
                "FATAL: 'WEBHOOK_SECRET' must be at least {} characters long.",
                MIN_SECRET_LEN
            )));
        }

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let builder = config::Config::builder()
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 8080)?
            // Base settings (web host/port); the file is optional.
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml).required(false))
            .set_override("database_path", database_path)?
            .set_override("admin_id", admin_id)?
            .set_override("webhook_secret", webhook_secret)?
            .set_override("log_level", log_level)?
            .build()?;

        builder.try_deserialize()
    }

    /// Full path to the content database inside its own folder.
    pub fn content_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("content")
            .join("content.db")
    }
}
