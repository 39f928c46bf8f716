// Collaborator traits consumed by the resolution pipeline

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::errors::ServiceError;
use super::models::{ResolveOptions, StreamHandle};

/// Response as seen by the services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// URL after redirects
    pub final_url: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<serde_json::Value, ServiceError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// HTTP transport. Non-2xx responses are returned, not raised.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse, ServiceError>;

    async fn get(&self, url: &str) -> Result<HttpResponse, ServiceError> {
        self.get_with_query(url, &[]).await
    }
}

/// Adaptive-streaming manifest parser, keyed by bitrate in kbps
pub trait ManifestParser: Send + Sync {
    /// Name of the parser (for logging)
    fn name(&self) -> &'static str;

    fn parse(
        &self,
        options: &ResolveOptions,
        response: &HttpResponse,
        source_url: &str,
    ) -> Result<BTreeMap<u32, StreamHandle>, ServiceError>;
}

/// Turns arbitrary text into a filesystem-safe name component
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, raw: &str) -> String;
}
