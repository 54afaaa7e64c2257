use thiserror::Error;

/// Failures talking to the catalog backend.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The configured base URL could not be parsed.
    #[error("invalid catalog url {url}: {reason}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser message.
        reason: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build http client")]
    Client(#[source] reqwest::Error),
    /// Transport-level failure (connect, timeout, body read).
    #[error("request to {url} failed")]
    Http {
        /// Requested URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The response body was not the expected JSON.
    #[error("failed to decode response from {url}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}
