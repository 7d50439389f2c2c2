//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    /// Message archive; in-memory when absent
    pub database: Option<DatabaseConfig>,
    /// Offline queue and broker; in-memory when absent
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    pub relay: RelayConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(other.to_string()),
        }
    }
}

/// Server bind configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// How connections prove their identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Jwt,
    /// Accept the declared `user_id` as-is (development only)
    Trusted,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jwt" => Ok(Self::Jwt),
            "trusted" => Ok(Self::Trusted),
            other => Err(other.to_string()),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// Required in JWT mode
    pub jwt_secret: Option<String>,
}

/// What to do when a principal connects while already online
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateLoginPolicy {
    /// Force-close the previous connection and admit the new one
    #[default]
    Replace,
    /// Refuse the new connection while the previous one is live
    Reject,
}

impl FromStr for DuplicateLoginPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "reject" => Ok(Self::Reject),
            other => Err(other.to_string()),
        }
    }
}

/// Routing core tuning
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub heartbeat_interval_ms: u64,
    /// Connection is dead after `interval * multiplier` without a pong
    pub heartbeat_timeout_multiplier: u32,
    pub ack_timeout_ms: u64,
    /// Per-connection outbound queue capacity
    pub outbound_buffer: usize,
    pub duplicate_login: DuplicateLoginPolicy,
    pub topic_prefix: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_multiplier: default_heartbeat_timeout_multiplier(),
            ack_timeout_ms: default_ack_timeout_ms(),
            outbound_buffer: default_outbound_buffer(),
            duplicate_login: DuplicateLoginPolicy::default(),
            topic_prefix: default_topic_prefix(),
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_interval() * self.heartbeat_timeout_multiplier.max(1)
    }

    #[must_use]
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

// Default value functions
fn default_app_name() -> String {
    "relay-gateway".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_multiplier() -> u32 {
    2
}

fn default_ack_timeout_ms() -> u64 {
    5_000
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_topic_prefix() -> String {
    "relay".to_string()
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// Returns an error if required variables are missing or invalid
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let auth = AuthConfig {
            mode: vars.parse_or("AUTH_MODE", AuthMode::default)?,
            jwt_secret: vars.get("JWT_SECRET"),
        };
        if auth.mode == AuthMode::Jwt && auth.jwt_secret.is_none() {
            return Err(ConfigError::MissingVar("JWT_SECRET"));
        }

        let relay = RelayConfig {
            heartbeat_interval_ms: vars
                .parse_or("HEARTBEAT_INTERVAL_MS", default_heartbeat_interval_ms)?,
            heartbeat_timeout_multiplier: vars.parse_or(
                "HEARTBEAT_TIMEOUT_MULTIPLIER",
                default_heartbeat_timeout_multiplier,
            )?,
            ack_timeout_ms: vars.parse_or("ACK_TIMEOUT_MS", default_ack_timeout_ms)?,
            outbound_buffer: vars.parse_or("OUTBOUND_BUFFER", default_outbound_buffer)?,
            duplicate_login: vars.parse_or("DUPLICATE_LOGIN", DuplicateLoginPolicy::default)?,
            topic_prefix: vars.get("BROKER_TOPIC_PREFIX").unwrap_or_else(default_topic_prefix),
        };
        if relay.heartbeat_interval_ms == 0 {
            return Err(ConfigError::InvalidValue("HEARTBEAT_INTERVAL_MS", "0".to_string()));
        }
        if relay.ack_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("ACK_TIMEOUT_MS", "0".to_string()));
        }

        Ok(Self {
            app: AppSettings {
                name: vars.get("APP_NAME").unwrap_or_else(default_app_name),
                env: vars.parse_or("APP_ENV", default_env)?,
            },
            gateway: ServerConfig {
                host: vars.get("GATEWAY_HOST").unwrap_or_else(default_host),
                port: vars
                    .parse::<u16>("GATEWAY_PORT")?
                    .ok_or(ConfigError::MissingVar("GATEWAY_PORT"))?,
            },
            database: match vars.get("DATABASE_URL") {
                Some(url) => Some(DatabaseConfig {
                    url,
                    max_connections: vars
                        .parse_or("DATABASE_MAX_CONNECTIONS", default_max_connections)?,
                    min_connections: vars
                        .parse_or("DATABASE_MIN_CONNECTIONS", default_min_connections)?,
                }),
                None => None,
            },
            redis: match vars.get("REDIS_URL") {
                Some(url) => Some(RedisConfig {
                    url,
                    max_connections: vars
                        .parse_or("REDIS_MAX_CONNECTIONS", default_redis_max_connections)?,
                }),
                None => None,
            },
            auth,
            relay,
        })
    }
}

/// Typed access to a variable lookup; blank values count as unset
struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        self.get(key)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key, raw))
            })
            .transpose()
    }

    fn parse_or<T: FromStr>(
        &self,
        key: &'static str,
        default: impl FnOnce() -> T,
    ) -> Result<T, ConfigError> {
        Ok(self.parse(key)?.unwrap_or_else(default))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
