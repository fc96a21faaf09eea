//! Blocking client for the Generative Language REST API, shared by the
//! embedder and the generator.
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::credential::ApiKey;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Request content: a role plus text parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Content {
    pub fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    api_key: ApiKey,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: ApiKey, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("docsync-rag/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// POST `body` as JSON to `{base_url}/{path}` and decode the JSON reply.
    pub fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("POST {url}");

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .json(body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        Ok(resp.json()?)
    }
}

/// Normalize a model name to its resource path, e.g. `embedding-001` →
/// `models/embedding-001`.
pub fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_path() {
        assert_eq!(model_path("embedding-001"), "models/embedding-001");
        assert_eq!(model_path("models/gemini-2.5-flash"), "models/gemini-2.5-flash");
    }

    #[test]
    fn test_content_serialization() {
        let content = Content::text(Some("user"), "hi");
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "user", "parts": [{"text": "hi"}]})
        );

        let no_role = serde_json::to_value(Content::text(None, "x")).unwrap();
        assert!(no_role.get("role").is_none());
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = ApiClient::new(
            "https://example.invalid/v1beta/",
            ApiKey::new("k").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://example.invalid/v1beta");
    }
}
