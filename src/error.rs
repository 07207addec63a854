//! Request-level error taxonomy.
//!
//! Per-record problems never show up here; they are discards (see
//! [`crate::normalize::DiscardReason`]). Everything in this module aborts the
//! whole request and is rendered as a single `{error, details}` object.

use thiserror::Error;

/// Failures of the single outbound fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream transport failure: {detail}")]
    Transport { detail: String },

    #[error("upstream returned HTTP {status}: {body_excerpt}")]
    HttpStatus { status: u16, body_excerpt: String },

    #[error("upstream body is not valid JSON: {detail} (body: {raw_body_excerpt})")]
    MalformedJson {
        detail: String,
        raw_body_excerpt: String,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport {
                detail: err.to_string(),
            }
        }
    }
}

/// Failures to locate the record list inside the upstream envelope.
#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("inner `data` string is not valid JSON: {0}")]
    InnerJson(#[source] serde_json::Error),

    #[error("unrecognized upstream payload shape")]
    UnrecognizedShape,
}

/// Anything that fails a `/processed_data` request.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProcessError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status surfaced to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Fetch(FetchError::Timeout) => 504,
            Self::Fetch(FetchError::Transport { .. } | FetchError::HttpStatus { .. }) => 502,
            Self::Fetch(FetchError::MalformedJson { .. }) | Self::Shape(_) | Self::Internal(_) => {
                500
            }
        }
    }

    /// Short, stable message for the `error` field.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Fetch(FetchError::Timeout) => "Timed out fetching data from the upstream feed",
            Self::Fetch(FetchError::Transport { .. }) => "Failed to reach the upstream feed",
            Self::Fetch(FetchError::HttpStatus { .. }) => "Upstream feed returned an error status",
            Self::Fetch(FetchError::MalformedJson { .. }) => {
                "Upstream feed returned a body that is not valid JSON"
            }
            Self::Shape(ShapeError::InnerJson(_)) => {
                "Failed to parse the inner data string of the upstream feed"
            }
            Self::Shape(ShapeError::UnrecognizedShape) => {
                "Unexpected payload format received from the upstream feed"
            }
            Self::Internal(_) => "Internal processing server error",
        }
    }

    /// Diagnostic detail for the `details` field, when the kind carries one.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Fetch(FetchError::Timeout) | Self::Shape(ShapeError::UnrecognizedShape) => None,
            Self::Fetch(FetchError::Transport { detail }) => Some(detail.clone()),
            Self::Fetch(FetchError::HttpStatus {
                status,
                body_excerpt,
            }) => Some(format!("status {status}: {body_excerpt}")),
            Self::Fetch(FetchError::MalformedJson { detail, .. }) => Some(detail.clone()),
            Self::Shape(ShapeError::InnerJson(err)) => Some(err.to_string()),
            Self::Internal(message) => Some(message.clone()),
        }
    }
}
