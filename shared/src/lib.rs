//! Shared types for the PharmaFlow backend
//!
//! Holds the pieces every member crate (and a future desktop or web
//! client) needs to agree on: the error-code taxonomy and the API
//! response envelope.

pub mod error;
pub mod response;

pub use error::{AppError, AppResult, ErrorCode};
pub use response::ApiResponse;
