//! HTTP client for a running relay service

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::analyzer::AnalyzeResult;
use crate::error::{Error, Result};
use crate::request::AnalyzeRequest;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct RelayClient {
    client: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // searches can take up to the server's request timeout
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Calls the health endpoint. An unhealthy service comes back as an error
    /// carrying its reason.
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/api/v1/health", self.base_url);
        let response = self.client.get(&url).headers(self.headers()).send().await?;

        if !response.status().is_success() {
            return Err(service_error(response).await);
        }
        Ok(())
    }

    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResult> {
        let url = format!("{}/api/v1/analyze", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(service_error(response).await);
        }

        let result: AnalyzeResult = response.json().await?;
        Ok(result)
    }
}

async fn service_error(response: Response) -> Error {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);

    if status.is_client_error() {
        Error::InvalidRequest(message)
    } else {
        Error::Connection(format!("{}: {}", status, message))
    }
}
