//! Provider configuration.
//!
//! Values come from the `ARM_*` environment variables (optionally loaded from a
//! `.env` file by the binary) and may be overridden by a provider attribute
//! block.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NETWORK_API_VERSION: &str = "2018-11-01";
pub const KEY_VAULT_API_VERSION: &str = "2016-10-01";
pub const KEY_VAULT_DATA_API_VERSION: &str = "2016-10-01";
pub const RESOURCES_API_VERSION: &str = "2016-09-01";
pub const METADATA_API_VERSION: &str = "2015-01-01";

pub const USER_AGENT: &str = concat!("azurestack-provider/", env!("CARGO_PKG_VERSION"));

const MAX_AUXILIARY_TENANTS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyVaultFeatures {
    pub purge_soft_delete_on_destroy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceGroupFeatures {
    pub prevent_deletion_if_contains_resources: bool,
}

impl Default for ResourceGroupFeatures {
    fn default() -> Self {
        Self {
            prevent_deletion_if_contains_resources: true,
        }
    }
}

/// The provider `features` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub key_vault: KeyVaultFeatures,
    pub resource_group: ResourceGroupFeatures,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub subscription_id: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub tenant_id: String,
    pub metadata_host: String,
    pub environment: String,
    pub auxiliary_tenant_ids: Vec<String>,
    pub use_cli: bool,
    pub disable_correlation_request_id: bool,
    pub skip_provider_registration: bool,
    pub features: Features,
}

impl ProviderConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any `ARM_*` lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();
        let flag = |key: &str| parse_bool(&get(key));

        // ARM_ENDPOINT is deprecated in favour of ARM_METADATA_HOST
        let mut metadata_host = get("ARM_METADATA_HOST");
        if metadata_host.is_empty() {
            metadata_host = get("ARM_ENDPOINT");
        }

        let environment = match get("ARM_ENVIRONMENT") {
            e if e.is_empty() => "public".to_string(),
            e => e,
        };

        let config = ProviderConfig {
            subscription_id: get("ARM_SUBSCRIPTION_ID"),
            client_id: get("ARM_CLIENT_ID"),
            client_secret: get("ARM_CLIENT_SECRET"),
            tenant_id: get("ARM_TENANT_ID"),
            metadata_host: normalize_metadata_host(&metadata_host),
            environment,
            auxiliary_tenant_ids: split_auxiliary_tenants(&get("ARM_AUXILIARY_TENANT_IDS")),
            use_cli: lookup("ARM_USE_CLI").map_or(true, |v| parse_bool(&v)),
            disable_correlation_request_id: flag("ARM_DISABLE_CORRELATION_REQUEST_ID"),
            skip_provider_registration: flag("ARM_SKIP_PROVIDER_REGISTRATION"),
            features: Features::default(),
        };
        log::debug!(
            "config from environment: subscription={:?} metadata_host={:?} use_cli={}",
            config.subscription_id,
            config.metadata_host,
            config.use_cli
        );
        Ok(config)
    }

    /// Apply a provider attribute block on top of the environment values.
    pub fn with_overrides(mut self, block: &Map<String, Value>) -> Result<Self> {
        let mut merged = serde_json::to_value(&self)?;
        if let Value::Object(target) = &mut merged {
            for (key, value) in block {
                if !value.is_null() {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        let secret = std::mem::take(&mut self.client_secret);
        let mut config: ProviderConfig = serde_path_to_error::deserialize(merged)?;
        config.client_secret = match block.get("client_secret").and_then(Value::as_str) {
            Some(s) => s.to_string(),
            None => secret,
        };
        config.metadata_host = normalize_metadata_host(&config.metadata_host);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.metadata_host.is_empty() {
            return Err(Error::Config(
                "`metadata_host` (ARM_METADATA_HOST) must be set".to_string(),
            ));
        }
        if self.subscription_id.is_empty() {
            return Err(Error::Config(
                "`subscription_id` (ARM_SUBSCRIPTION_ID) must be set".to_string(),
            ));
        }
        if self.auxiliary_tenant_ids.len() > MAX_AUXILIARY_TENANTS {
            return Err(Error::Config(format!(
                "The provider only supports {MAX_AUXILIARY_TENANTS} auxiliary tenant IDs, got {}",
                self.auxiliary_tenant_ids.len()
            )));
        }
        if !self.use_cli && (self.client_id.is_empty() || self.client_secret.is_empty()) {
            return Err(Error::Config(
                "either `use_cli` or a `client_id`/`client_secret` pair is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// `metadata_host` may be given as a URL; only its host is kept.
pub fn normalize_metadata_host(input: &str) -> String {
    let input = input.trim();
    if input.contains("://") {
        if let Ok(url) = reqwest::Url::parse(input) {
            if let Some(host) = url.host_str() {
                return match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                };
            }
        }
    }
    input.trim_end_matches('/').to_string()
}

fn split_auxiliary_tenants(input: &str) -> Vec<String> {
    input
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
