//! # punchgate-core
//!
//! Core crate for the Punchgate attendance gateway. Contains configuration
//! schemas, the unified error system, and the API response envelope.
//!
//! This crate has **no** internal dependencies on other Punchgate crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
