// Helper functions shared by services

use regex::Regex;
use std::time::Duration;
use url::Url;

use super::errors::ServiceError;
use super::models::NetworkConfig;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/115.0";

/// Build a reqwest client honoring proxy and timeout settings
pub fn build_reqwest_client(config: &NetworkConfig) -> Result<reqwest::Client, ServiceError> {
    let mut builder = reqwest::Client::builder().user_agent(
        config
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
    );

    if let Some(timeout) = config.timeout_seconds {
        builder = builder.timeout(Duration::from_secs(timeout as u64));
    }

    if let Some(proxy_url) = config.proxy.as_deref() {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ServiceError::Config(format!("Invalid proxy URL {}: {}", proxy_url, e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ServiceError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Parse the first capture group of `re` in `text` as JSON
pub fn embedded_json(re: &Regex, text: &str) -> Option<Result<serde_json::Value, ServiceError>> {
    let caps = re.captures(text)?;
    let raw = caps.get(1)?.as_str();
    Some(serde_json::from_str(raw).map_err(ServiceError::from))
}

/// First value of query parameter `key`, ignoring empty values
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

/// Path component of an absolute or origin-relative URL
pub fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Resolve `reference` against `origin`
pub fn join_url(origin: &str, reference: &str) -> Result<String, ServiceError> {
    let base = Url::parse(origin)
        .map_err(|e| ServiceError::Config(format!("Invalid origin {}: {}", origin, e)))?;
    base.join(reference)
        .map(|u| u.to_string())
        .map_err(|e| ServiceError::Extraction(format!("Invalid link {}: {}", reference, e)))
}

/// Integer from a JSON number or a numeric string
pub fn json_u32(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// String form of a JSON string or number
pub fn json_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
