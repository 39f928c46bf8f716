// Response diagnostics - maps non-success responses and API payload
// messages to service errors
//
// Each service picks a status policy:
// - GeoBlocking: 403 means the video is geoblocked (viafree API)
// - Generic: any non-success status is reported as is

use serde_json::Value;

use crate::downloader::errors::ServiceError;
use crate::downloader::fields::{Field, FieldTable};
use crate::downloader::traits::HttpResponse;

/// How a service reads a non-success status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// HTTP 403 means the backend refused playback for this location
    GeoBlocking,
    Generic,
}

/// Why a response was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingReason {
    GeoBlocked,
    Forbidden,
    NotFound,
    RateLimited,
    ServerError,
    Unknown,
}

impl BlockingReason {
    /// Check if a proxy in another country might help
    pub fn proxy_might_help(&self) -> bool {
        matches!(self, Self::GeoBlocked | Self::Forbidden)
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::GeoBlocked => "Geographic restriction",
            Self::Forbidden => "Access denied (HTTP 403)",
            Self::NotFound => "Not found",
            Self::RateLimited => "Rate limited",
            Self::ServerError => "Server error",
            Self::Unknown => "Unexpected status",
        }
    }
}

/// Classify a status under `policy`; None for success
pub fn diagnose_status(policy: StatusPolicy, status: u16) -> Option<BlockingReason> {
    match status {
        200..=299 => None,
        403 if policy == StatusPolicy::GeoBlocking => Some(BlockingReason::GeoBlocked),
        403 => Some(BlockingReason::Forbidden),
        404 | 410 => Some(BlockingReason::NotFound),
        429 => Some(BlockingReason::RateLimited),
        500..=599 => Some(BlockingReason::ServerError),
        _ => Some(BlockingReason::Unknown),
    }
}

/// Turn a rejected response into the matching error
pub fn check_response(
    policy: StatusPolicy,
    response: &HttpResponse,
    url: &str,
) -> Result<(), ServiceError> {
    match diagnose_status(policy, response.status) {
        None => Ok(()),
        Some(BlockingReason::GeoBlocked) => Err(ServiceError::GeoBlocked),
        Some(_) => Err(ServiceError::Http {
            status: response.status,
            url: url.to_string(),
        }),
    }
}

/// Error message carried in an API payload, if any
pub fn api_message(table: &FieldTable, payload: &Value) -> Option<String> {
    table.get(payload, Field::Msg).map(|msg| match msg {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
