//! Storage layer
//!
//! PostgreSQL connection pool and versioned schema migrations.

pub mod database;
pub mod migrations;

pub use database::{Database, DatabaseConfig};
pub use migrations::MigrationStatus;
