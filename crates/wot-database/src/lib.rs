//! # wot-database
//!
//! PostgreSQL connection management, the repository contracts the lifecycle
//! managers are written against, and their sqlx implementations.
//!
//! Every mutating repository call runs as a single transaction: either all
//! of its effects commit or none do. A dropped future rolls back.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
