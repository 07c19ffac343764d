use thiserror::Error;

/// Errors that can be returned by framekit-hub operations.
#[derive(Debug, Error)]
pub enum HubError {
    /// An HTTP request failed (network error, TLS, body read, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to deserialize a hub response.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The hub refused access; the dataset is gated or private.
    #[error(
        "hub refused access to {repo} (HTTP {status}); set HF_TOKEN to a token with access to this dataset"
    )]
    Unauthorized { repo: String, status: u16 },

    /// Any other non-success status.
    #[error("hub returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The requested split does not exist in any config of the dataset.
    #[error("split `{split}` not found in {repo} (available: {})", .available.join(", "))]
    SplitNotFound {
        repo: String,
        split: String,
        available: Vec<String>,
    },

    /// A URL could not be built from the endpoint and parameters.
    #[error("invalid hub URL: {message}")]
    InvalidUrl { message: String },
}
