//! Error types for probing targets.

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias using [`ProbeError`].
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Errors that abort a probe before or after flattening.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The request did not name a target.
    #[error("Target parameter is missing")]
    MissingTarget,

    /// The target could not be reached or its body could not be read.
    #[error("Failed to fetch {target}: {source}")]
    Fetch {
        target: String,
        #[source]
        source: reqwest::Error,
    },

    /// The target answered with something that is not JSON.
    #[error("Failed to decode JSON from {target}: {source}")]
    Decode {
        target: String,
        #[source]
        source: serde_json::Error,
    },

    /// The registry could not be rendered.
    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] std::fmt::Error),
}

impl ProbeError {
    /// Create a fetch error for `target`.
    pub fn fetch(target: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Fetch {
            target: target.into(),
            source,
        }
    }

    /// Create a decode error for `target`.
    pub fn decode(target: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            target: target.into(),
            source,
        }
    }

    /// HTTP status reported to the scraper.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingTarget => StatusCode::BAD_REQUEST,
            Self::Fetch { .. } | Self::Decode { .. } | Self::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label value used for the failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingTarget => "missing_target",
            Self::Fetch { .. } => "fetch",
            Self::Decode { .. } => "decode",
            Self::Encode(_) => "encode",
        }
    }
}
