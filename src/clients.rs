//! The provider client handed to every resource handler.

use crate::azure::{
    ArmClient, AzureCliToken, ClientSecretToken, Environment, KeyVaultDataClient, TokenSource,
};
use crate::config::{Features, ProviderConfig, USER_AGENT};
use crate::error::{Result, ResultExt};
use crate::locks::LockTable;
use crate::services::keyvault::{KeyVaultClient, KeyVaultTiming};
use std::sync::Arc;

/// Shared state of one configured provider.
///
/// Cloning is cheap; the lock table and Key Vault cache are shared between clones.
#[derive(Clone)]
pub struct Client {
    pub subscription_id: String,
    pub arm: ArmClient,
    pub key_vault: KeyVaultClient,
    pub locks: LockTable,
    pub features: Features,
}

impl Client {
    /// Discover the environment, pick a token source and wire up the API clients.
    pub async fn build(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        let env = Environment::discover(&http, &config.metadata_host)
            .await
            .context("building the AzureStack client")?;
        log::info!(
            "Using resource manager endpoint {} (key vault suffix {})",
            env.resource_manager_endpoint,
            env.key_vault_dns_suffix
        );

        let token: Arc<dyn TokenSource> =
            if !config.client_id.is_empty() && !config.client_secret.is_empty() {
                log::info!("Authenticating using a Service Principal with a Client Secret");
                Arc::new(ClientSecretToken::new(
                    &env.login_endpoint,
                    &config.tenant_id,
                    &config.client_id,
                    &config.client_secret,
                )?)
            } else {
                log::info!("Authenticating using the Azure CLI");
                Arc::new(AzureCliToken::new(Some(config.tenant_id.clone())))
            };

        let correlation_id = if config.disable_correlation_request_id {
            None
        } else {
            Some(uuid::Uuid::new_v4().to_string())
        };

        let arm = ArmClient::new(
            http.clone(),
            &env.resource_manager_endpoint,
            token.clone(),
            &env.token_audience,
            correlation_id.clone(),
        )?;
        let data = KeyVaultDataClient::new(http.clone(), token, &env.key_vault_audience(), correlation_id);

        Ok(Self::new(&config.subscription_id, arm, data, http, config.features.clone()))
    }

    /// Assemble a client from already configured parts.
    pub fn new(
        subscription_id: &str,
        arm: ArmClient,
        key_vault_data: KeyVaultDataClient,
        http: reqwest::Client,
        features: Features,
    ) -> Self {
        let key_vault = KeyVaultClient::new(subscription_id, arm.clone(), key_vault_data, http);
        Client {
            subscription_id: subscription_id.to_string(),
            arm,
            key_vault,
            locks: LockTable::new(),
            features,
        }
    }

    pub fn with_key_vault_timing(mut self, timing: KeyVaultTiming) -> Self {
        self.key_vault = self.key_vault.with_timing(timing);
        self
    }
}
