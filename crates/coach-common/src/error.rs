/// Error types shared across the coaching client crates.
///
/// These cover failures at the analysis-API boundary: transport problems,
/// undecodable payloads, and explicit error responses from the service.
/// Application-specific errors are defined in the binary crate and wrap
/// `ApiError` via `#[from]`.
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to read video file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("analysis service returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("analysis service returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },
}
