//! Storage layer - SQLite
//!
//! Provides database management and migrations for playforge.
//!
//! # Architecture
//!
//! - `database`: Connection pool management and initialization
//! - `migrations`: Schema versioning and automatic migration
//!
//! # Usage
//!
//! ```ignore
//! use playforge_core::storage::Database;
//!
//! // Create an in-memory database for testing
//! let db = Database::in_memory().await?;
//!
//! // Or open the configured file
//! let db = Database::open(&config.storage.database_path).await?;
//! ```

pub mod database;
pub mod migrations;

// Re-export commonly used types
pub use database::{Database, DatabaseConfig};
pub use migrations::{migration_status, run_migrations, MigrationStatus, CURRENT_VERSION};
