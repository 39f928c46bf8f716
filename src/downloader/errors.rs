// Error types for service resolution

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Page shape or domain is not a playable episode page
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// Required embedded JSON/HTML marker not found
    #[error("{0}")]
    Extraction(String),

    /// API backend refused playback for this location
    #[error("Can't play this because the video is geoblocked.")]
    GeoBlocked,

    /// API declares zero renditions for the video
    #[error("Media doesn't have any associated videos (yet?)")]
    NoStreams,

    /// Exclude filter matched the output name
    #[error("Excluding video")]
    Excluded,

    /// Upstream JSON no longer has the shape the field table expects
    #[error("Error parsing info, json keys might have changed? ({0})")]
    Normalization(String),

    /// Error message returned in the API payload
    #[error("{0}")]
    Api(String),

    /// Non-success status under the generic response policy
    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    /// Request never produced a response
    #[error("Request failed: {0}")]
    Transport(String),

    /// Manifest parser or RTMP builder failed
    #[error("Manifest parse error: {0}")]
    Parser(String),

    /// Payload was not valid JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Field table or configuration is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Writing an artifact failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Exclusion is a filter decision, not a failure
    pub fn is_exclusion(&self) -> bool {
        matches!(self, Self::Excluded)
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Transport(format!("timed out: {}", e));
        }
        Self::Transport(e.to_string())
    }
}
