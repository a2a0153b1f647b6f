//! Database layer
//!
//! Database abstraction for the Lumina backend. It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration.
//!
//! # Usage
//!
//! ```ignore
//! use lumina::config::DatabaseConfig;
//! use lumina::db::{create_pool, migrations, UnitOfWork};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//!
//! let uow = UnitOfWork::new(pool.clone());
//! let mut tx = uow.begin().await?;
//! // ... repository calls taking `&mut tx`
//! tx.commit().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;
pub mod unit_of_work;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
pub use unit_of_work::{DbTransaction, UnitOfWork};
