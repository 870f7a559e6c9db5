use thiserror::Error;

/// Failure of a single page fetch against the photo API.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API answered with a non-success status.
    #[error("photo api returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// The request never produced a response.
    #[error("photo api request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The body did not match the listing or search shape.
    #[error("unexpected photo api payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure reading or writing the local key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A stored value could not be parsed.
    #[error("stored value under {key:?} is malformed: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized for storage.
    #[error("failed to encode value for {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
