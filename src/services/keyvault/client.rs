use crate::azure::{list_resources_by_type, ArmClient, KeyVaultDataClient};
use crate::config::KEY_VAULT_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use crate::ids::VaultId;
use crate::models::keyvault::Vault;
use crate::timeouts::OperationContext;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Poll timings of the Key Vault handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyVaultTiming {
    /// Between checks while a secret or key is deleted or purged.
    pub nested_item_poll_interval: Duration,
    /// Before the first check that a new vault answers.
    pub availability_delay: Duration,
    pub availability_poll_interval: Duration,
    /// Consecutive answers needed before a new vault counts as available.
    pub availability_occurrences: u32,
}

impl Default for KeyVaultTiming {
    fn default() -> Self {
        KeyVaultTiming {
            nested_item_poll_interval: Duration::from_secs(5),
            availability_delay: Duration::from_secs(30),
            availability_poll_interval: Duration::from_secs(10),
            availability_occurrences: 10,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedVault {
    vault_id: VaultId,
    base_uri: String,
}

/// Vault management, data-plane access and the vault id to base URI cache.
#[derive(Clone)]
pub struct KeyVaultClient {
    subscription_id: String,
    arm: ArmClient,
    pub data: KeyVaultDataClient,
    http: reqwest::Client,
    cache: Arc<Mutex<HashMap<String, CachedVault>>>,
    timing: KeyVaultTiming,
}

fn cache_key(name: &str) -> String {
    name.to_lowercase()
}

fn same_base_uri(a: &str, b: &str) -> bool {
    a.trim_end_matches('/').eq_ignore_ascii_case(b.trim_end_matches('/'))
}

impl KeyVaultClient {
    pub fn new(subscription_id: &str, arm: ArmClient, data: KeyVaultDataClient, http: reqwest::Client) -> Self {
        KeyVaultClient {
            subscription_id: subscription_id.to_string(),
            arm,
            data,
            http,
            cache: Arc::new(Mutex::new(HashMap::new())),
            timing: KeyVaultTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: KeyVaultTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn timing(&self) -> &KeyVaultTiming {
        &self.timing
    }

    /// Plain HTTP client for probing a vault URI.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn add_to_cache(&self, id: &VaultId, base_uri: &str) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.insert(
            cache_key(&id.name),
            CachedVault {
                vault_id: id.clone(),
                base_uri: base_uri.to_string(),
            },
        );
    }

    pub fn purge(&self, id: &VaultId) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.remove(&cache_key(&id.name));
    }

    fn cached(&self, id: &VaultId) -> Option<CachedVault> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(&cache_key(&id.name)).cloned()
    }

    fn cached_by_base_uri(&self, base_uri: &str) -> Option<CachedVault> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .values()
            .find(|v| same_base_uri(&v.base_uri, base_uri))
            .cloned()
    }

    pub async fn get_vault(&self, ctx: &OperationContext, id: &VaultId) -> Result<Vault> {
        self.arm.get(ctx, &id.id(), KEY_VAULT_API_VERSION).await
    }

    /// Data-plane base URI of a vault, cached after the first lookup.
    pub async fn base_uri_for_key_vault(&self, ctx: &OperationContext, id: &VaultId) -> Result<String> {
        if let Some(cached) = self.cached(id) {
            return Ok(cached.base_uri);
        }
        let vault = self
            .get_vault(ctx, id)
            .await
            .with_context(|| format!("retrieving {id}"))?;
        let base_uri = vault
            .properties
            .and_then(|p| p.vault_uri)
            .ok_or_else(|| Error::Validation(format!("retrieving {id}: `properties.VaultUri` was nil")))?;
        self.add_to_cache(id, &base_uri);
        Ok(base_uri)
    }

    pub async fn exists(&self, ctx: &OperationContext, id: &VaultId) -> Result<bool> {
        if self.cached(id).is_some() {
            return Ok(true);
        }
        match self.get_vault(ctx, id).await {
            Ok(vault) => {
                if let Some(uri) = vault.properties.and_then(|p| p.vault_uri) {
                    self.add_to_cache(id, &uri);
                }
                Ok(true)
            }
            Err(e) if e.was_not_found() => Ok(false),
            Err(e) => Err(e.context(format!("retrieving {id}"))),
        }
    }

    /// Resource id of the vault answering at `base_url`; `None` when no vault in
    /// the subscription uses it.
    pub async fn key_vault_id_from_base_url(&self, ctx: &OperationContext, base_url: &str) -> Result<Option<String>> {
        if let Some(cached) = self.cached_by_base_uri(base_url) {
            return Ok(Some(cached.vault_id.id()));
        }

        let vaults = list_resources_by_type(&self.arm, ctx, &self.subscription_id, "Microsoft.KeyVault/vaults")
            .await
            .context("listing the Key Vault resources")?;
        for resource in vaults {
            let id = match VaultId::parse_insensitively(&resource.id) {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("skipping Key Vault with unparseable id {:?}: {e}", resource.id);
                    continue;
                }
            };
            let vault = match self.get_vault(ctx, &id).await {
                Ok(vault) => vault,
                Err(e) if e.was_not_found() => continue,
                Err(e) => return Err(e.context(format!("retrieving {id}"))),
            };
            let Some(uri) = vault.properties.and_then(|p| p.vault_uri) else {
                continue;
            };
            self.add_to_cache(&id, &uri);
            if same_base_uri(&uri, base_url) {
                return Ok(Some(id.id()));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::StaticToken;

    fn client() -> KeyVaultClient {
        let token = Arc::new(StaticToken("t".into()));
        let arm = ArmClient::new(
            reqwest::Client::new(),
            "https://management.local.azurestack.external/",
            token.clone(),
            "aud",
            None,
        )
        .unwrap();
        let data = KeyVaultDataClient::new(reqwest::Client::new(), token, "https://vault.local.azurestack.external", None);
        KeyVaultClient::new("sub", arm, data, reqwest::Client::new())
    }

    #[test]
    fn test_cache_by_name_and_uri() {
        let kv = client();
        let id = VaultId::new("sub", "rg", "Vault1");
        kv.add_to_cache(&id, "https://vault1.vault.local.azurestack.external/");

        assert!(kv.cached(&VaultId::new("sub", "rg", "vault1")).is_some(), "names are case insensitive");
        let found = kv
            .cached_by_base_uri("https://VAULT1.vault.local.azurestack.external")
            .unwrap();
        assert_eq!(found.vault_id, id);

        kv.purge(&id);
        assert!(kv.cached(&id).is_none());
    }

    #[test]
    fn test_clones_share_the_cache() {
        let kv = client();
        let other = kv.clone();
        kv.add_to_cache(&VaultId::new("sub", "rg", "v"), "https://v.example/");
        assert!(other.cached_by_base_uri("https://v.example/").is_some());
    }
}
