//! Error types for the HTTP surface.
//!
//! [`ApiError`] implements [`IntoResponse`] so handlers can return
//! `Result<_, ApiError>` and let axum render the failure. Store failures are
//! logged in full where they happen; the response body only names the class
//! of failure.
//!
//! ## Error Cases
//! - `Forbidden`: The caller's origin did not match the allowed pattern.
//! - `Store`: The passcode store could not be read or is corrupt.
//! - `TaskFailed`: The blocking task running a store call panicked or was
//!   cancelled.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use passcode::StoreError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// The request did not come from an allowed origin.
    #[error("origin not allowed")]
    Forbidden,

    /// The store failed in a way the caller cannot fix.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A store call did not run to completion.
    #[error("store task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Store(_) | Self::TaskFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::Forbidden => "forbidden",
            Self::Store(StoreError::CorruptState { .. }) => "store corrupt",
            Self::Store(_) => "store unavailable",
            Self::TaskFailed(_) => "internal error",
        };
        (self.status(), body).into_response()
    }
}
