//! Convenience result type alias for RoadHelp.

use crate::error::AppError;

/// A specialized `Result` type for RoadHelp operations.
pub type AppResult<T> = Result<T, AppError>;
