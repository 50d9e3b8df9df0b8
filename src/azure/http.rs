//! Authenticated JSON requests shared by the ARM and Key Vault clients.

use super::auth::TokenSource;
use crate::config::USER_AGENT;
use crate::error::{Error, Result};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const CORRELATION_HEADER: &str = "x-ms-correlation-request-id";

#[derive(Clone)]
pub struct Pipeline {
    http: reqwest::Client,
    token: Arc<dyn TokenSource>,
    audience: String,
    correlation_id: Option<String>,
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = if self.body.trim().is_empty() { "null" } else { self.body.as_str() };
        let mut deserializer = serde_json::Deserializer::from_str(body);
        Ok(serde_path_to_error::deserialize(&mut deserializer)?)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Retry-After` in seconds.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("Retry-After")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Build an [`Error::Api`] from an ARM style `{"error":{"code","message"}}` body.
pub fn api_error(status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .unwrap_or_else(|| ErrorDetail {
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: body.to_string(),
        });
    Error::Api {
        status: status.as_u16(),
        code: detail.code,
        message: detail.message,
    }
}

impl Pipeline {
    pub fn new(
        http: reqwest::Client,
        token: Arc<dyn TokenSource>,
        audience: impl Into<String>,
        correlation_id: Option<String>,
    ) -> Self {
        Pipeline {
            http,
            token,
            audience: audience.into(),
            correlation_id,
        }
    }

    /// Send a request and read the whole response, whatever its status.
    pub async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<RawResponse> {
        let token = self.token.token(&self.audience).await?;
        log::debug!("[DEBUG] {method} {url}");
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT);
        if let Some(id) = &self.correlation_id {
            request = request.header(CORRELATION_HEADER, id);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        log::trace!("[TRACE] {method} {url} -> {status}");
        Ok(RawResponse { status, headers, body })
    }

    /// Like [`Pipeline::send`] but non-success statuses become errors.
    pub async fn execute(&self, method: Method, url: Url, body: Option<&Value>) -> Result<RawResponse> {
        let response = self.send(method, url, body).await?;
        if !response.is_success() {
            return Err(api_error(response.status, &response.body));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_from_arm_body() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":"ReferencedResourceNotProvisioned","message":"Cannot proceed"}}"#,
        );
        assert!(err.was_bad_request());
        assert_eq!(
            err.to_string(),
            "unexpected status 400 with error: ReferencedResourceNotProvisioned: Cannot proceed"
        );
    }

    #[test]
    fn test_api_error_without_body() {
        let err = api_error(StatusCode::NOT_FOUND, "");
        assert!(err.was_not_found());
        assert!(err.to_string().contains("Not Found"));
    }

    #[test]
    fn test_empty_body_decodes_as_null() {
        let response = RawResponse {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: String::new(),
        };
        let value: Option<Value> = response.json().unwrap();
        assert!(value.is_none());
    }
}
