//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, AuthConfig, AuthMode, ConfigError, DatabaseConfig,
    DuplicateLoginPolicy, Environment, RedisConfig, RelayConfig, ServerConfig,
};
