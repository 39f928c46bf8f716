// In-memory HTTP client for tests
//
// Built for unit tests, and for integration tests through the `testing` feature.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::errors::ServiceError;
use super::traits::{HttpClient, HttpResponse};

/// Routes are keyed by the full request URL, query included.
/// Unrouted requests answer 404 with an empty body.
#[derive(Default)]
pub struct FakeHttp {
    routes: HashMap<String, HttpResponse>,
    requests: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: &str, status: u16, body: &str) -> Self {
        self.with_redirect(url, url, status, body)
    }

    pub fn with_redirect(mut self, url: &str, final_url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            HttpResponse {
                status,
                body: body.to_string(),
                final_url: final_url.to_string(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

pub fn full_url(url: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, sep, pairs.join("&"))
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse, ServiceError> {
        let full = full_url(url, query);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(full.clone());
        }
        Ok(self.routes.get(&full).cloned().unwrap_or(HttpResponse {
            status: 404,
            body: String::new(),
            final_url: full,
        }))
    }
}
