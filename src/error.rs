use thiserror::Error;

/// Failure of a single page request against the timeline endpoint.
///
/// Transient and permanent failures are not distinguished: every variant is
/// logged, and scrolling again is the only retry mechanism.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, TLS or timeout failure before a response arrived
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("server returned HTTP {status}")]
    Status { status: reqwest::StatusCode },

    /// The body was not a JSON array of statuses
    #[error("could not decode timeline page: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
