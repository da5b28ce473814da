//! # punchgate-database
//!
//! PostgreSQL persistence for Punchgate: database bootstrap (pool +
//! migrations) and the queue/session repositories.

pub mod connection;
pub mod repositories;

pub use connection::{migrate, open};
