//! Azure Resource Manager client.
//!
//! Requests are addressed by resource id; writes that answer `201`/`202`
//! are followed through `Azure-AsyncOperation` or `Location` until the
//! operation reaches a terminal status.

use super::auth::TokenSource;
use super::http::{api_error, Pipeline, RawResponse};
use crate::error::{Error, Result};
use crate::timeouts::OperationContext;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ArmClient {
    pipeline: Pipeline,
    endpoint: Url,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct AsyncOperationStatus {
    status: String,
    #[serde(default)]
    error: Option<super::http::ErrorDetail>,
}

enum Tracking {
    AsyncOperation(Url),
    Location(Url),
}

impl ArmClient {
    pub fn new(
        http: reqwest::Client,
        endpoint: &str,
        token: Arc<dyn TokenSource>,
        audience: &str,
        correlation_id: Option<String>,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("parsing resource manager endpoint {endpoint:?}: {e}")))?;
        Ok(ArmClient {
            pipeline: Pipeline::new(http, token, audience, correlation_id),
            endpoint,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Interval between long-running operation polls when no `Retry-After` is sent.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, path: &str, api_version: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)
        } else {
            self.endpoint.join(path.trim_start_matches('/'))
        }
        .map_err(|e| Error::invalid_id(path, format!("building request url: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", api_version);
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, ctx: &OperationContext, id: &str, api_version: &str) -> Result<T> {
        self.get_with_query(ctx, id, api_version, &[]).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        ctx: &OperationContext,
        path: &str,
        api_version: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url(path, api_version, query)?;
        ctx.run(async { self.pipeline.execute(Method::GET, url, None).await?.json() })
            .await
    }

    /// GET an absolute URL as returned by the API (`nextLink`).
    pub async fn get_url<T: DeserializeOwned>(&self, ctx: &OperationContext, url: &str) -> Result<T> {
        let url = Url::parse(url).map_err(|e| Error::invalid_id(url, format!("parsing link: {e}")))?;
        ctx.run(async { self.pipeline.execute(Method::GET, url, None).await?.json() })
            .await
    }

    /// Create or replace `id`, wait for provisioning, return the final resource.
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        ctx: &OperationContext,
        id: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T> {
        self.write(ctx, Method::PUT, id, api_version, body).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        ctx: &OperationContext,
        id: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T> {
        self.write(ctx, Method::PATCH, id, api_version, body).await
    }

    /// POST an action; returns the response body (`null` when empty).
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        ctx: &OperationContext,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path, api_version, &[])?;
        let body = serde_json::to_value(body)?;
        ctx.run(async {
            let response = self.pipeline.execute(Method::POST, url, Some(&body)).await?;
            self.wait_for_completion(&response).await?;
            response.json()
        })
        .await
    }

    /// Delete `id` and wait for the deletion to finish. `404` is returned as an error.
    pub async fn delete(&self, ctx: &OperationContext, id: &str, api_version: &str) -> Result<()> {
        let url = self.url(id, api_version, &[])?;
        ctx.run(async {
            let response = self.pipeline.execute(Method::DELETE, url, None).await?;
            self.wait_for_completion(&response).await.map(|_| ())
        })
        .await
    }

    async fn write<B: Serialize, T: DeserializeOwned>(
        &self,
        ctx: &OperationContext,
        method: Method,
        id: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(id, api_version, &[])?;
        let body = serde_json::to_value(body)?;
        ctx.run(async {
            let response = self.pipeline.execute(method, url.clone(), Some(&body)).await?;
            if self.wait_for_completion(&response).await? || response.body.trim().is_empty() {
                return self.pipeline.execute(Method::GET, url, None).await?.json();
            }
            response.json()
        })
        .await
    }

    fn tracking(response: &RawResponse) -> Option<Tracking> {
        if response.status != StatusCode::CREATED && response.status != StatusCode::ACCEPTED {
            return None;
        }
        if let Some(url) = response.header("Azure-AsyncOperation").and_then(|u| Url::parse(u).ok()) {
            return Some(Tracking::AsyncOperation(url));
        }
        response
            .header("Location")
            .and_then(|u| Url::parse(u).ok())
            .map(Tracking::Location)
    }

    /// Follow a long-running operation; true when one was tracked.
    async fn wait_for_completion(&self, initial: &RawResponse) -> Result<bool> {
        let Some(tracking) = Self::tracking(initial) else {
            return Ok(false);
        };
        let mut wait = initial.retry_after().unwrap_or(self.poll_interval);
        loop {
            tokio::time::sleep(wait).await;
            match &tracking {
                Tracking::AsyncOperation(url) => {
                    let response = self.pipeline.execute(Method::GET, url.clone(), None).await?;
                    let status: AsyncOperationStatus = response.json()?;
                    log::debug!("[DEBUG] long running operation status {:?}", status.status);
                    match status.status.as_str() {
                        "Succeeded" => return Ok(true),
                        "Failed" | "Canceled" => {
                            let detail = status.error.unwrap_or_default();
                            return Err(Error::Api {
                                status: response.status.as_u16(),
                                code: detail.code,
                                message: format!(
                                    "long running operation {}: {}",
                                    status.status, detail.message
                                ),
                            });
                        }
                        _ => wait = response.retry_after().unwrap_or(self.poll_interval),
                    }
                }
                Tracking::Location(url) => {
                    let response = self.pipeline.send(Method::GET, url.clone(), None).await?;
                    if response.status == StatusCode::ACCEPTED {
                        wait = response.retry_after().unwrap_or(self.poll_interval);
                        continue;
                    }
                    if !response.is_success() {
                        return Err(api_error(response.status, &response.body));
                    }
                    return Ok(true);
                }
            }
        }
    }
}
