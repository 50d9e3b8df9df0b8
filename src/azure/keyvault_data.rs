//! Key Vault data-plane client (secrets and keys).
//!
//! Every call is addressed by the vault base URL, e.g.
//! `https://vault1.vault.local.azurestack.external/`.

use super::auth::TokenSource;
use super::http::{Pipeline, RawResponse};
use crate::config::KEY_VAULT_DATA_API_VERSION;
use crate::error::{Error, Result};
use crate::models::keyvault::{
    DeletedItem, KeyBundle, KeyCreateParameters, KeyUpdateParameters, SecretBundle,
    SecretSetParameters, SecretUpdateParameters,
};
use crate::timeouts::OperationContext;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct KeyVaultDataClient {
    pipeline: Pipeline,
}

impl KeyVaultDataClient {
    pub fn new(
        http: reqwest::Client,
        token: Arc<dyn TokenSource>,
        audience: &str,
        correlation_id: Option<String>,
    ) -> Self {
        KeyVaultDataClient {
            pipeline: Pipeline::new(http, token, audience, correlation_id),
        }
    }

    fn url(base_url: &str, segments: &[&str]) -> Result<Url> {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let mut url = Url::parse(&base)
            .and_then(|u| u.join(&segments.join("/")))
            .map_err(|e| Error::invalid_id(base_url, format!("building Key Vault url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("api-version", KEY_VAULT_DATA_API_VERSION);
        Ok(url)
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        ctx: &OperationContext,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T> {
        let body = body.map(serde_json::to_value).transpose()?;
        ctx.run(async {
            let response: RawResponse = self.pipeline.execute(method, url, body.as_ref()).await?;
            response.json()
        })
        .await
    }

    pub async fn get_secret(
        &self,
        ctx: &OperationContext,
        base_url: &str,
        name: &str,
        version: &str,
    ) -> Result<SecretBundle> {
        let url = Self::url(base_url, &["secrets", name, version])?;
        self.call::<(), _>(ctx, Method::GET, url, None).await
    }

    pub async fn set_secret(
        &self,
        ctx: &OperationContext,
        base_url: &str,
        name: &str,
        params: &SecretSetParameters,
    ) -> Result<SecretBundle> {
        let url = Self::url(base_url, &["secrets", name])?;
        self.call(ctx, Method::PUT, url, Some(params)).await
    }

    pub async fn update_secret(
        &self,
        ctx: &OperationContext,
        base_url: &str,
        name: &str,
        version: &str,
        params: &SecretUpdateParameters,
    ) -> Result<SecretBundle> {
        let url = Self::url(base_url, &["secrets", name, version])?;
        self.call(ctx, Method::PATCH, url, Some(params)).await
    }

    pub async fn delete_secret(&self, ctx: &OperationContext, base_url: &str, name: &str) -> Result<DeletedItem> {
        let url = Self::url(base_url, &["secrets", name])?;
        self.call::<(), _>(ctx, Method::DELETE, url, None).await
    }

    pub async fn get_deleted_secret(&self, ctx: &OperationContext, base_url: &str, name: &str) -> Result<DeletedItem> {
        let url = Self::url(base_url, &["deletedsecrets", name])?;
        self.call::<(), _>(ctx, Method::GET, url, None).await
    }

    pub async fn purge_deleted_secret(&self, ctx: &OperationContext, base_url: &str, name: &str) -> Result<()> {
        let url = Self::url(base_url, &["deletedsecrets", name])?;
        let _: Option<serde_json::Value> = self.call::<(), _>(ctx, Method::DELETE, url, None).await?;
        Ok(())
    }

    pub async fn create_key(
        &self,
        ctx: &OperationContext,
        base_url: &str,
        name: &str,
        params: &KeyCreateParameters,
    ) -> Result<KeyBundle> {
        let url = Self::url(base_url, &["keys", name, "create"])?;
        self.call(ctx, Method::POST, url, Some(params)).await
    }

    pub async fn get_key(&self, ctx: &OperationContext, base_url: &str, name: &str, version: &str) -> Result<KeyBundle> {
        let url = Self::url(base_url, &["keys", name, version])?;
        self.call::<(), _>(ctx, Method::GET, url, None).await
    }

    pub async fn update_key(
        &self,
        ctx: &OperationContext,
        base_url: &str,
        name: &str,
        version: &str,
        params: &KeyUpdateParameters,
    ) -> Result<KeyBundle> {
        let url = Self::url(base_url, &["keys", name, version])?;
        self.call(ctx, Method::PATCH, url, Some(params)).await
    }

    pub async fn delete_key(&self, ctx: &OperationContext, base_url: &str, name: &str) -> Result<DeletedItem> {
        let url = Self::url(base_url, &["keys", name])?;
        self.call::<(), _>(ctx, Method::DELETE, url, None).await
    }

    pub async fn get_deleted_key(&self, ctx: &OperationContext, base_url: &str, name: &str) -> Result<DeletedItem> {
        let url = Self::url(base_url, &["deletedkeys", name])?;
        self.call::<(), _>(ctx, Method::GET, url, None).await
    }

    pub async fn purge_deleted_key(&self, ctx: &OperationContext, base_url: &str, name: &str) -> Result<()> {
        let url = Self::url(base_url, &["deletedkeys", name])?;
        let _: Option<serde_json::Value> = self.call::<(), _>(ctx, Method::DELETE, url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_with_and_without_version() {
        let url = KeyVaultDataClient::url("https://v1.vault.example.com/", &["secrets", "s1", ""]).unwrap();
        assert_eq!(url.as_str(), "https://v1.vault.example.com/secrets/s1/?api-version=2016-10-01");
        let url = KeyVaultDataClient::url("http://127.0.0.1:9000", &["deletedkeys", "k1"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/deletedkeys/k1?api-version=2016-10-01");
    }
}
