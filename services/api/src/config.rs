//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;

use meal_builder_core::domain::DayOfWeek;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the hosted image storage.
#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Origin the browser reaches the service at; the OAuth callback hangs off it.
    pub public_base_url: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub cookie_secure: bool,
    pub cors_origin: Option<String>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub telegram_bot_token: Option<String>,
    /// First day of the week in bot replies. The web grid always starts on Sunday.
    pub week_start: DayOfWeek,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let cookie_secure = match var("COOKIE_SECURE") {
            None => true,
            Some(v) => v.parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue("COOKIE_SECURE".to_string(), format!("'{v}' is not a boolean"))
            })?,
        };

        // --- Identity Provider ---
        let google_client_id = required("GOOGLE_CLIENT_ID")?;
        let google_client_secret = required("GOOGLE_CLIENT_SECRET")?;

        // --- Optional Integrations ---
        let cloudinary = match (
            var("CLOUDINARY_CLOUD_NAME"),
            var("CLOUDINARY_API_KEY"),
            var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "CLOUDINARY_*".to_string(),
                    "cloud name, API key and API secret must be set together".to_string(),
                ))
            }
        };

        let telegram_bot_token = var("TELEGRAM_BOT_TOKEN");
        let week_start = match var("TELEGRAM_WEEK_START") {
            None => DayOfWeek::Sunday,
            Some(v) => v.trim().parse::<DayOfWeek>().map_err(|e| {
                ConfigError::InvalidValue("TELEGRAM_WEEK_START".to_string(), e.to_string())
            })?,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            public_base_url,
            google_client_id,
            google_client_secret,
            cookie_secure,
            cors_origin: var("CORS_ORIGIN"),
            cloudinary,
            telegram_bot_token,
            week_start,
        })
    }

    /// Where the identity provider sends the browser back to.
    pub fn oauth_redirect_url(&self) -> String {
        format!("{}/auth/callback", self.public_base_url)
    }
}
