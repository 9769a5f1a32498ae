//! Backend REST surface.

mod client;
mod error;

pub use client::{ApiClient, TokenResponse};
pub use error::{ApiError, ApiErrorKind};
