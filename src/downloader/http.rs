// reqwest-backed HttpClient

use async_trait::async_trait;
use tracing::debug;

use super::errors::ServiceError;
use super::models::NetworkConfig;
use super::traits::{HttpClient, HttpResponse};
use super::utils::build_reqwest_client;

pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(config: &NetworkConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_reqwest_client(config)?,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse, ServiceError> {
        debug!(url, ?query, "GET");

        let response = self.client.get(url).query(query).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        debug!(status, final_url = %final_url, bytes = body.len(), "response");
        Ok(HttpResponse {
            status,
            body,
            final_url,
        })
    }
}
