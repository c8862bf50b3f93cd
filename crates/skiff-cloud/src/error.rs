//! Namespace API error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Invalid namespace name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Unauthorized. Run `skiff login` to refresh your token")]
    Unauthorized,

    #[error("API error: {0}")]
    Api(String),

    #[error("API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("API returned no data")]
    EmptyResponse,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
