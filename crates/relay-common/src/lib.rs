//! # relay-common
//!
//! Shared utilities including configuration, error handling, authentication, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{AuthError, Authenticator, Claims, Credentials, JwtAuthenticator, TrustedAuthenticator};
pub use config::{
    AppConfig, AppSettings, AuthConfig, AuthMode, ConfigError, DatabaseConfig,
    DuplicateLoginPolicy, Environment, RedisConfig, RelayConfig, ServerConfig,
};
pub use error::{AppError, AppResult, ErrorResponse};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
