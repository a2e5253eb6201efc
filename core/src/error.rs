//! Error types for the shop API client.
//!
//! # Design
//! `NotLoggedIn` is raised before any I/O when an operation needs a session
//! and none is stored. Every non-2xx response lands in `Request` with the
//! status code and the best message the body (or status line) offered.
//! Network faults and undecodable bodies both surface as `Transport`.

use thiserror::Error;

/// Errors returned by `ShopClient` parse methods and `ApiClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No `userId` is stored in the session.
    #[error("user not logged in, cannot {action}")]
    NotLoggedIn { action: &'static str },

    /// The backend answered with a non-2xx status.
    #[error("HTTP error! status: {status} - {message}")]
    Request { status: u16, message: String },

    /// The request never completed, or the response body was not valid JSON.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The persistent key-value store could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

impl ApiError {
    /// HTTP status carried by a `Request` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}
