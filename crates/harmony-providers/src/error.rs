use thiserror::Error;

/// Errors returned by the outbound provider clients.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The provider answered with a non-2xx status.
    #[error("{context} returned HTTP {status}")]
    UnexpectedStatus { context: String, status: u16 },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown province '{0}'")]
    UnknownProvince(String),

    #[error("chat completion returned no content")]
    EmptyCompletion,
}
