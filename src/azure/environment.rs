//! Cloud environment discovery from the stack's metadata endpoint.

use crate::config::METADATA_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Base URL for ARM requests, with a trailing slash.
    pub resource_manager_endpoint: String,
    pub login_endpoint: String,
    pub token_audience: String,
    pub key_vault_dns_suffix: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataResponse {
    authentication: MetadataAuthentication,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataAuthentication {
    login_endpoint: String,
    #[serde(default)]
    audiences: Vec<String>,
}

impl Environment {
    /// `GET https://{metadata_host}/metadata/endpoints`.
    pub async fn discover(http: &reqwest::Client, metadata_host: &str) -> Result<Self> {
        Self::discover_at(http, &format!("https://{metadata_host}/"), metadata_host).await
    }

    /// Discovery against an explicit base URL.
    pub async fn discover_at(http: &reqwest::Client, base_url: &str, metadata_host: &str) -> Result<Self> {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let url = format!("{base}metadata/endpoints?api-version={METADATA_API_VERSION}");
        log::info!("Discovering environment from {url}");
        let response = http
            .get(&url)
            .send()
            .await
            .map_err(Error::from)
            .with_context(|| format!("retrieving environment metadata from {url:?}"))?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Config(format!(
                "retrieving environment metadata from {url:?}: unexpected status {status}: {body}"
            )));
        }
        let mut deserializer = serde_json::Deserializer::from_str(&body);
        let metadata: MetadataResponse = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(Error::from)
            .context("decoding environment metadata")?;
        Self::from_metadata(&base, metadata_host, metadata)
    }

    fn from_metadata(base: &str, metadata_host: &str, metadata: MetadataResponse) -> Result<Self> {
        let token_audience = metadata
            .authentication
            .audiences
            .into_iter()
            .next()
            .ok_or_else(|| Error::Config("environment metadata has no token audiences".to_string()))?;
        Ok(Environment {
            resource_manager_endpoint: base.to_string(),
            login_endpoint: metadata.authentication.login_endpoint,
            token_audience,
            key_vault_dns_suffix: key_vault_dns_suffix(metadata_host),
        })
    }

    /// Token audience for Key Vault data-plane requests.
    pub fn key_vault_audience(&self) -> String {
        format!("https://{}", self.key_vault_dns_suffix)
    }
}

/// `management.local.azurestack.external` becomes `vault.local.azurestack.external`.
pub fn key_vault_dns_suffix(metadata_host: &str) -> String {
    let host = metadata_host.split(':').next().unwrap_or(metadata_host);
    format!("vault.{}", host.strip_prefix("management.").unwrap_or(host))
}
