//! # Hosted Backend Client
//!
//! Calls the hosted `resolve` and `fetch-results` functions over HTTP.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;

use crate::config::MatchdeckConfig;
use crate::error::{FetchError, ResolutionError};
use crate::results::{parse_payload, Contract, FetchTarget, PayloadFetcher};
use crate::startup::{NormalizedUrl, ResolveResponse, ResolvedStartup, Resolver};

const RESOLVE_PATH: &str = "functions/v1/resolve";
const FETCH_RESULTS_PATH: &str = "functions/v1/fetch-results";

/// HTTP client for the hosted backend functions
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("matchdeck/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &MatchdeckConfig) -> anyhow::Result<Self> {
        let base_url = config
            .remote_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("remote_url is not configured"))?;
        Self::new(
            base_url,
            config.api_key.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> reqwest::Result<reqwest::Response> {
        let mut request = self.client.post(self.endpoint(path)).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key).header("apikey", key);
        }
        request.send().await
    }
}

/// Pull an `error` string out of a failed response body, if there is one.
fn error_text(body: &serde_json::Value) -> Option<String> {
    body.get("error")
        .or_else(|| body.get("message"))
        .and_then(|e| e.as_str())
        .map(str::to_string)
}

#[async_trait]
impl Resolver for HttpBackend {
    async fn resolve(
        &self,
        url: &NormalizedUrl,
    ) -> Result<Option<ResolvedStartup>, ResolutionError> {
        let response = self
            .post(RESOLVE_PATH, json!({ "url": url.as_str() }))
            .await
            .map_err(|e| ResolutionError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            return Err(match error_text(&body) {
                Some(text) => ResolutionError::Backend(text),
                None => ResolutionError::Unavailable(format!("HTTP {}", status)),
            });
        }

        response
            .json::<ResolveResponse>()
            .await
            .map_err(|e| ResolutionError::InvalidResponse(e.to_string()))?
            .into_result()
    }
}

#[async_trait]
impl PayloadFetcher for HttpBackend {
    async fn fetch(&self, target: &FetchTarget) -> Result<Option<Contract>, FetchError> {
        let body = match target {
            FetchTarget::StartupId(id) => json!({ "startupId": id }),
            FetchTarget::Url(url) => json!({ "url": url.as_str() }),
        };

        let response = self
            .post(FETCH_RESULTS_PATH, body)
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        if !status.is_success() {
            return Err(match error_text(&payload) {
                Some(text) => FetchError::Backend(text),
                None => FetchError::Transport(format!("HTTP {}", status)),
            });
        }

        parse_payload(payload)
    }
}
