//! Database layer
//!
//! Supports SQLite (default, single-file deployment) and MySQL. The driver is
//! selected from configuration and hidden behind the `DatabasePool` trait.
//!
//! ```ignore
//! use kinyweb::config::DatabaseConfig;
//! use kinyweb::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub(crate) use pool::on_pool;
pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, InsertedId, MysqlDatabase,
    SqliteDatabase,
};
