//! Result alias used across the workspace.

use crate::error::AppError;

/// Shorthand for fallible Punchgate operations; saves every crate from
/// spelling out `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;
