//! Configuration management for the ReaDefy server and client

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Length of the per-process secret used when no `JWT_SECRET` is configured
const EPHEMERAL_SECRET_LEN: usize = 48;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin; any origin when unset
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Token signing secret; random per process in [`Config::default`]
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API, including the `/api` prefix
    pub api_url: String,
    pub chat_poll_interval_secs: u64,
    pub chat_page_size: u32,
}

impl ClientConfig {
    pub fn chat_poll_interval(&self) -> Duration {
        Duration::from_secs(self.chat_poll_interval_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_url: "http://localhost:3001/api".to_string(),
            chat_poll_interval_secs: 3,
            chat_page_size: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3001,
                cors_origin: None,
            },
            database: DatabaseConfig {
                url: "sqlite:./readefy.db".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: ephemeral_secret(),
                token_ttl_days: 7,
                bcrypt_cost: 10,
            },
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration from the environment
    ///
    /// Fails only when `JWT_SECRET` is missing or empty.
    pub fn from_env() -> Result<Self, env::VarError> {
        let jwt_secret = env::var("JWT_SECRET")?;
        if jwt_secret.is_empty() {
            return Err(env::VarError::NotPresent);
        }
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| defaults.server.host.clone()),
                port: parse_var("PORT", defaults.server.port),
                cors_origin: env::var("CORS_ORIGIN").ok().filter(|o| o != "*"),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| defaults.database.url.clone()),
            },
            auth: AuthConfig {
                jwt_secret,
                token_ttl_days: parse_var("TOKEN_TTL_DAYS", defaults.auth.token_ttl_days),
                bcrypt_cost: parse_var("BCRYPT_COST", defaults.auth.bcrypt_cost),
            },
            client: ClientConfig::from_env(),
        })
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = ClientConfig::default();
        ClientConfig {
            api_url: env::var("API_URL").unwrap_or(defaults.api_url),
            chat_poll_interval_secs: parse_var(
                "CHAT_POLL_INTERVAL_SECS",
                defaults.chat_poll_interval_secs,
            ),
            chat_page_size: parse_var("CHAT_PAGE_SIZE", defaults.chat_page_size),
        }
    }
}

fn ephemeral_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(EPHEMERAL_SECRET_LEN)
        .map(char::from)
        .collect()
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
