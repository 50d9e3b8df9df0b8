//! Access token sources.
//!
//! ARM and the Key Vault data plane need bearer tokens for different
//! audiences; every source caches one token per audience until five minutes
//! before it expires.

use super::cli;
use crate::error::{Error, Result};
use async_trait::async_trait;
use azure_core::auth::TokenCredential;
use azure_identity::TokenCredentialOptions;
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const EXPIRY_MARGIN_MINUTES: i64 = 5;

#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Bearer token for `audience` (e.g. `https://management.<region>.<fqdn>/<guid>`).
    async fn token(&self, audience: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    secret: String,
    expires_on: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::minutes(EXPIRY_MARGIN_MINUTES) < self.expires_on
    }
}

#[derive(Debug, Default)]
struct TokenCache {
    tokens: Mutex<HashMap<String, CachedToken>>,
}

impl TokenCache {
    async fn get(&self, audience: &str) -> Option<String> {
        let tokens = self.tokens.lock().await;
        tokens
            .get(audience)
            .filter(|t| t.is_fresh(Utc::now()))
            .map(|t| t.secret.clone())
    }

    async fn put(&self, audience: &str, token: CachedToken) {
        self.tokens.lock().await.insert(audience.to_string(), token);
    }
}

/// A fixed token, e.g. one handed over by the caller.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self, _audience: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliAccessToken {
    access_token: String,
    expires_on: String,
}

/// Tokens from `az account get-access-token`.
#[derive(Debug, Default)]
pub struct AzureCliToken {
    tenant_id: Option<String>,
    cache: TokenCache,
}

impl AzureCliToken {
    pub fn new(tenant_id: Option<String>) -> Self {
        AzureCliToken {
            tenant_id: tenant_id.filter(|t| !t.is_empty()),
            cache: TokenCache::default(),
        }
    }
}

#[async_trait]
impl TokenSource for AzureCliToken {
    async fn token(&self, audience: &str) -> Result<String> {
        if let Some(token) = self.cache.get(audience).await {
            return Ok(token);
        }
        let mut cmd = format!("az account get-access-token --resource '{audience}' --output json");
        if let Some(tenant) = &self.tenant_id {
            cmd.push_str(&format!(" --tenant {tenant}"));
        }
        let parsed: CliAccessToken = tokio::task::spawn_blocking(move || cli::run_json(&cmd))
            .await
            .map_err(|e| Error::Cli(format!("joining az cli task: {e}")))??;
        let expires_on = parse_cli_expiry(&parsed.expires_on)?;
        log::debug!("[DEBUG] obtained az cli token for {audience:?}, expires {expires_on}");
        self.cache
            .put(
                audience,
                CachedToken {
                    secret: parsed.access_token.clone(),
                    expires_on,
                },
            )
            .await;
        Ok(parsed.access_token)
    }
}

/// `expiresOn` is printed in local time, e.g. `2024-01-31 10:00:00.000000`.
fn parse_cli_expiry(input: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| Error::Auth(format!("parsing token expiry {input:?}: {e}")))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::Auth(format!("token expiry {input:?} is not a valid local time")))
}

/// Service principal tokens through `azure_identity`.
pub struct ClientSecretToken {
    credential: Arc<azure_identity::ClientSecretCredential>,
}

impl ClientSecretToken {
    pub fn new(login_endpoint: &str, tenant_id: &str, client_id: &str, client_secret: &str) -> Result<Self> {
        let credential = azure_identity::ClientSecretCredential::new(
            azure_core::new_http_client(),
            tenant_id.to_string(),
            client_id.to_string(),
            client_secret.to_string(),
            credential_options(login_endpoint)?,
        );
        Ok(ClientSecretToken {
            credential: Arc::new(credential),
        })
    }
}

/// Credential options pointing the token requests at the stamp's login endpoint.
fn credential_options(login_endpoint: &str) -> Result<TokenCredentialOptions> {
    let authority = azure_core::Url::parse(login_endpoint)
        .map_err(|e| Error::Auth(format!("parsing login endpoint {login_endpoint:?}: {e}")))?;
    Ok(TokenCredentialOptions::new(authority))
}

#[async_trait]
impl TokenSource for ClientSecretToken {
    async fn token(&self, audience: &str) -> Result<String> {
        let scope = format!("{}/.default", audience.trim_end_matches('/'));
        let token = self
            .credential
            .get_token(&[scope.as_str()])
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;
        Ok(token.token.secret().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_expiry() {
        let parsed = parse_cli_expiry("2030-01-31 10:00:00.000000").unwrap();
        assert!(parsed > Utc::now());
        assert!(parse_cli_expiry("tomorrow").is_err());
    }

    #[test]
    fn test_credential_options_use_login_endpoint() {
        let options = credential_options("https://adfs.local.azurestack.external/adfs/").unwrap();
        assert_eq!(
            options.authority_host().as_str(),
            "https://adfs.local.azurestack.external/adfs/"
        );
        assert!(matches!(credential_options("not a url"), Err(Error::Auth(_))));
    }

    #[test]
    fn test_client_secret_token_builds() {
        assert!(ClientSecretToken::new("https://login.example.com/", "tenant", "client", "secret").is_ok());
        assert!(ClientSecretToken::new("", "tenant", "client", "secret").is_err());
    }

    #[test]
    fn test_token_freshness() {
        let now = Utc::now();
        let fresh = CachedToken {
            secret: "a".into(),
            expires_on: now + ChronoDuration::minutes(30),
        };
        let stale = CachedToken {
            secret: "b".into(),
            expires_on: now + ChronoDuration::minutes(4),
        };
        assert!(fresh.is_fresh(now));
        assert!(!stale.is_fresh(now), "tokens expiring within five minutes are refreshed");
    }

    #[tokio::test]
    async fn test_cache_per_audience() {
        let cache = TokenCache::default();
        cache
            .put(
                "https://vault.example.com",
                CachedToken {
                    secret: "kv".into(),
                    expires_on: Utc::now() + ChronoDuration::hours(1),
                },
            )
            .await;
        assert_eq!(cache.get("https://vault.example.com").await.as_deref(), Some("kv"));
        assert!(cache.get("https://management.example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_static_token() {
        let source = StaticToken("abc".into());
        assert_eq!(source.token("anything").await.unwrap(), "abc");
    }
}
