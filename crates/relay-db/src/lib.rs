//! # relay-db
//!
//! PostgreSQL message archive via SQLx.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_db::{create_pool, ensure_schema, DatabaseConfig, PgMessageRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::new("postgres://localhost/relay")).await?;
//!     ensure_schema(&pool).await?;
//!     let archive = PgMessageRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, ensure_schema, DatabaseConfig, PgPool};
pub use repositories::PgMessageRepository;
