//! Key Vault service.
//!
//! - [`client`] - vault lookups and the vault URI cache
//! - [`key_vault`] - `azurestack_key_vault`
//! - [`key_vault_access_policy`] - `azurestack_key_vault_access_policy`
//! - [`key_vault_key`] - `azurestack_key_vault_key`
//! - [`key_vault_secret`] - `azurestack_key_vault_secret`
//! - [`nested_item`] - delete/purge and import of secrets and keys

pub mod client;
pub mod key_vault;
pub mod key_vault_access_policy;
pub mod key_vault_key;
pub mod key_vault_secret;
pub mod nested_item;

pub use client::{KeyVaultClient, KeyVaultTiming};

use super::ServiceRegistration;
use crate::schema::{DataSource, Resource};
use std::sync::Arc;

pub struct Registration;

impl ServiceRegistration for Registration {
    fn name(&self) -> &'static str {
        "KeyVault"
    }

    fn website_categories(&self) -> Vec<&'static str> {
        vec!["Key Vault"]
    }

    fn supported_data_sources(&self) -> Vec<Arc<dyn DataSource>> {
        vec![
            Arc::new(key_vault::KeyVaultDataSource),
            Arc::new(key_vault_access_policy::KeyVaultAccessPolicyDataSource),
            Arc::new(key_vault_key::KeyVaultKeyDataSource),
            Arc::new(key_vault_secret::KeyVaultSecretDataSource),
        ]
    }

    fn supported_resources(&self) -> Vec<Arc<dyn Resource>> {
        vec![
            Arc::new(key_vault::KeyVaultResource),
            Arc::new(key_vault_access_policy::KeyVaultAccessPolicyResource),
            Arc::new(key_vault_key::KeyVaultKeyResource),
            Arc::new(key_vault_secret::KeyVaultSecretResource),
        ]
    }
}
