//! Error types for the token layer

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure reading or writing the on-disk token cache
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no cached token at {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read token cache {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("corrupt token cache {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write token cache {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Failure producing a usable access token
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("profile '{profile}' has no corp id or corp secret configured")]
    InvalidCredentials { profile: String },

    #[error("token request failed: {0}")]
    Remote(#[from] reqwest::Error),

    #[error("token endpoint returned HTTP {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("unexpected token response: {0}")]
    Decode(String),

    #[error("weixin error {code}: {message}")]
    Rejected { code: i64, message: String },
}

impl From<serde_json::Error> for TokenError {
    fn from(err: serde_json::Error) -> Self {
        TokenError::Decode(err.to_string())
    }
}
