//! `azurestack_key_vault_secret` resource and data source.

use super::nested_item::{
    delete_and_optionally_purge, expand_item_attributes, flatten_item_attributes,
    import_nested_item, DeleteAndPurgeNestedItem,
};
use crate::azure::KeyVaultDataClient;
use crate::clients::Client;
use crate::error::{Error, Result, ResultExt};
use crate::ids::{NestedItemId, VaultId};
use crate::models::keyvault::{SecretBundle, SecretSetParameters, SecretUpdateParameters};
use crate::models::{expand_tags, flatten_tags};
use crate::schema::{common, validate, Attribute, DataSource, Resource, ResourceData, Schema, ValueType};
use crate::timeouts::OperationContext;
use async_trait::async_trait;
use std::time::Duration;

struct SecretDeleter<'a> {
    data: &'a KeyVaultDataClient,
    base_url: String,
    name: String,
    poll_interval: Duration,
}

#[async_trait]
impl<'a> DeleteAndPurgeNestedItem for SecretDeleter<'a> {
    async fn delete_nested_item(&self, ctx: &OperationContext) -> Result<()> {
        self.data.delete_secret(ctx, &self.base_url, &self.name).await?;
        Ok(())
    }

    async fn nested_item_has_been_deleted(&self, ctx: &OperationContext) -> Result<()> {
        self.data.get_secret(ctx, &self.base_url, &self.name, "").await?;
        Ok(())
    }

    async fn purge_nested_item(&self, ctx: &OperationContext) -> Result<()> {
        self.data.purge_deleted_secret(ctx, &self.base_url, &self.name).await
    }

    async fn nested_item_has_been_purged(&self, ctx: &OperationContext) -> Result<()> {
        self.data.get_deleted_secret(ctx, &self.base_url, &self.name).await?;
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

fn content_type(d: &ResourceData) -> Option<String> {
    let value = d.get_str("content_type");
    (!value.is_empty()).then(|| value.to_string())
}

fn set_secret_attributes(d: &mut ResourceData, secret: &SecretBundle) {
    d.set("value", secret.value.clone().unwrap_or_default());
    d.set("content_type", secret.content_type.clone().unwrap_or_default());
    flatten_item_attributes(d, secret.attributes.as_ref());
    d.set("tags", flatten_tags(secret.tags.as_ref()));
}

/// GET the latest version and point the resource id at it.
async fn set_id_from_latest(
    data: &KeyVaultDataClient,
    ctx: &OperationContext,
    d: &mut ResourceData,
    base_url: &str,
    name: &str,
) -> Result<()> {
    let read = data
        .get_secret(ctx, base_url, name, "")
        .await
        .with_context(|| format!("retrieving Secret {name:?} (Key Vault {base_url:?})"))?;
    let id = read
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Validation(format!("cannot read KeyVault Secret {name:?} (in key vault {base_url:?})")))?;
    d.set_id(id);
    Ok(())
}

pub struct KeyVaultSecretResource;

#[async_trait]
impl Resource for KeyVaultSecretResource {
    fn resource_type(&self) -> &'static str {
        "azurestack_key_vault_secret"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::nested_item_name),
            )
            .attr(
                "key_vault_id",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::resource_id),
            )
            .attr("value", Attribute::required(ValueType::String).sensitive())
            .attr("content_type", Attribute::optional(ValueType::String))
            .attr(
                "not_before_date",
                Attribute::optional(ValueType::String).validate(validate::rfc3339_time),
            )
            .attr(
                "expiration_date",
                Attribute::optional(ValueType::String).validate(validate::rfc3339_time),
            )
            .attr("version", common::computed_string())
            .attr("tags", common::tags())
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_context();
        let data = &client.key_vault.data;
        let name = d.get_str("name").to_string();
        let vault_id = VaultId::parse(d.get_str("key_vault_id"))?;

        let base_url = client
            .key_vault
            .base_uri_for_key_vault(&ctx, &vault_id)
            .await
            .with_context(|| format!("looking up Secret {name:?} vault url from id {:?}", vault_id.id()))?;

        match data.get_secret(&ctx, &base_url, &name, "").await {
            Ok(existing) => {
                if let Some(id) = existing.id.filter(|id| !id.is_empty()) {
                    return Err(Error::import_as_exists(self.resource_type(), id));
                }
            }
            Err(e) if e.was_not_found() => {}
            Err(e) => {
                return Err(e.context(format!(
                    "checking for presence of existing Secret {name:?} (Key Vault {base_url:?})"
                )))
            }
        }

        let parameters = SecretSetParameters {
            value: d.get_str("value").to_string(),
            content_type: content_type(d),
            tags: expand_tags(d.get("tags")),
            attributes: Some(expand_item_attributes(d, None)?),
        };
        data.set_secret(&ctx, &base_url, &name, &parameters)
            .await
            .with_context(|| format!("creating Secret {name:?} (Key Vault {base_url:?})"))?;

        set_id_from_latest(data, &ctx, d, &base_url, &name).await?;
        self.read(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = NestedItemId::parse(d.id())?;

        let vault_id = client
            .key_vault
            .key_vault_id_from_base_url(&ctx, &id.key_vault_base_url)
            .await
            .with_context(|| format!("retrieving the Resource ID the Key Vault at URL {:?}", id.key_vault_base_url))?;
        let Some(vault_id) = vault_id else {
            log::debug!("[DEBUG] Unable to determine the Resource ID for the Key Vault at URL {:?} - removing from state!", id.key_vault_base_url);
            d.set_id("");
            return Ok(());
        };
        let vault_id = VaultId::parse(&vault_id)?;

        if !client.key_vault.exists(&ctx, &vault_id).await? {
            log::debug!("[DEBUG] Secret {:?} Key Vault {:?} was not found in Key Vault at URI {:?} - removing from state", id.name, vault_id.name, id.key_vault_base_url);
            d.set_id("");
            return Ok(());
        }

        let secret = match client
            .key_vault
            .data
            .get_secret(&ctx, &id.key_vault_base_url, &id.name, "")
            .await
        {
            Ok(secret) => secret,
            Err(e) if e.was_not_found() => {
                log::debug!("[DEBUG] Secret {:?} was not found in Key Vault at URI {:?} - removing from state", id.name, id.key_vault_base_url);
                d.set_id("");
                return Ok(());
            }
            Err(e) => return Err(e.context(format!("reading Key Vault Secret {id}"))),
        };

        let latest = NestedItemId::parse(secret.id.as_deref().unwrap_or_default())?;
        d.set("name", latest.name.as_str());
        d.set("key_vault_id", vault_id.id());
        d.set("version", latest.version.as_str());
        set_secret_attributes(d, &secret);
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.update_context();
        let data = &client.key_vault.data;
        let id = NestedItemId::parse(d.id())?;
        let vault_id = VaultId::parse(d.get_str("key_vault_id"))?;

        let base_url = client
            .key_vault
            .base_uri_for_key_vault(&ctx, &vault_id)
            .await
            .with_context(|| format!("looking up Secret {:?} vault url from id {:?}", id.name, vault_id.id()))?;

        if !client.key_vault.exists(&ctx, &vault_id).await? {
            log::debug!("[DEBUG] Secret {:?} Key Vault {:?} was not found - removing from state", id.name, vault_id.name);
            d.set_id("");
            return Ok(());
        }

        let attributes = expand_item_attributes(d, None)?;
        if d.has_change("value") {
            // a new value creates a new version of the secret
            let parameters = SecretSetParameters {
                value: d.get_str("value").to_string(),
                content_type: content_type(d),
                tags: expand_tags(d.get("tags")),
                attributes: Some(attributes),
            };
            data.set_secret(&ctx, &base_url, &id.name, &parameters)
                .await
                .with_context(|| format!("updating Key Vault Secret {:?} (Key Vault {base_url:?})", id.name))?;
        } else {
            let parameters = SecretUpdateParameters {
                content_type: content_type(d),
                tags: expand_tags(d.get("tags")),
                attributes: Some(attributes),
            };
            data.update_secret(&ctx, &base_url, &id.name, "", &parameters)
                .await
                .with_context(|| format!("updating Key Vault Secret {:?} (Key Vault {base_url:?})", id.name))?;
        }

        set_id_from_latest(data, &ctx, d, &base_url, &id.name).await?;
        self.read(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = NestedItemId::parse(d.id())?;

        let vault_id = client
            .key_vault
            .key_vault_id_from_base_url(&ctx, &id.key_vault_base_url)
            .await
            .with_context(|| format!("retrieving the Resource ID the Key Vault at URL {:?}", id.key_vault_base_url))?
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Unable to determine the Resource ID for the Key Vault at URL {:?}",
                    id.key_vault_base_url
                ))
            })?;
        let vault_id = VaultId::parse(&vault_id)?;

        if !client.key_vault.exists(&ctx, &vault_id).await? {
            log::debug!("[DEBUG] Secret {:?} Key Vault {:?} was not found - removing from state", id.name, vault_id.name);
            d.set_id("");
            return Ok(());
        }

        let deleter = SecretDeleter {
            data: &client.key_vault.data,
            base_url: id.key_vault_base_url.clone(),
            name: id.name.clone(),
            poll_interval: client.key_vault.timing().nested_item_poll_interval,
        };
        let description = format!("Secret {:?} (Key Vault {:?})", id.name, id.key_vault_base_url);
        let should_purge = client.features.key_vault.purge_soft_delete_on_destroy;
        delete_and_optionally_purge(&ctx, &description, should_purge, &deleter).await
    }

    async fn import(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        import_nested_item(client, d).await
    }
}

pub struct KeyVaultSecretDataSource;

#[async_trait]
impl DataSource for KeyVaultSecretDataSource {
    fn resource_type(&self) -> &'static str {
        "azurestack_key_vault_secret"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String).validate(validate::nested_item_name),
            )
            .attr(
                "key_vault_id",
                Attribute::required(ValueType::String).validate(validate::resource_id),
            )
            .attr("value", Attribute::computed(ValueType::String).sensitive())
            .attr("content_type", common::computed_string())
            .attr("version", common::computed_string())
            .attr("not_before_date", common::computed_string())
            .attr("expiration_date", common::computed_string())
            .attr("tags", common::tags_computed())
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let name = d.get_str("name").to_string();
        let vault_id = VaultId::parse(d.get_str("key_vault_id"))?;

        let base_url = client
            .key_vault
            .base_uri_for_key_vault(&ctx, &vault_id)
            .await
            .with_context(|| format!("looking up Secret {name:?} vault url from id {:?}", vault_id.id()))?;

        let secret = match client.key_vault.data.get_secret(&ctx, &base_url, &name, "").await {
            Ok(secret) => secret,
            Err(e) if e.was_not_found() => {
                return Err(Error::Validation(format!(
                    "KeyVault Secret {name:?} (KeyVault URI {base_url:?}) does not exist"
                )))
            }
            Err(e) => return Err(e.context(format!("making Read request on Azure KeyVault Secret {name}"))),
        };

        let id = NestedItemId::parse(secret.id.as_deref().unwrap_or_default())?;
        d.set_id(id.id());
        d.set("version", id.version.as_str());
        set_secret_attributes(d, &secret);
        Ok(())
    }
}
