//! `azurestack_key_vault_key` resource and data source.

use super::nested_item::{
    delete_and_optionally_purge, expand_item_attributes, flatten_item_attributes,
    import_nested_item, DeleteAndPurgeNestedItem,
};
use crate::azure::KeyVaultDataClient;
use crate::clients::Client;
use crate::error::{Error, Result, ResultExt};
use crate::ids::{NestedItemId, VaultId};
use crate::models::keyvault::{KeyBundle, KeyCreateParameters, KeyUpdateParameters};
use crate::models::{expand_tags, flatten_tags};
use crate::schema::{common, validate, Attribute, DataSource, Resource, ResourceData, Schema, ValueType};
use crate::timeouts::OperationContext;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::time::Duration;

const KEY_TYPES: &[&str] = &["RSA", "RSA-HSM", "EC", "EC-HSM"];

const KEY_OPTS: &[&str] = &["decrypt", "encrypt", "sign", "unwrapKey", "verify", "wrapKey"];

const CURVES: &[&str] = &["P-256", "P-384", "P-521", "SECP256K1"];

struct KeyDeleter<'a> {
    data: &'a KeyVaultDataClient,
    base_url: String,
    name: String,
    poll_interval: Duration,
}

#[async_trait]
impl<'a> DeleteAndPurgeNestedItem for KeyDeleter<'a> {
    async fn delete_nested_item(&self, ctx: &OperationContext) -> Result<()> {
        self.data.delete_key(ctx, &self.base_url, &self.name).await?;
        Ok(())
    }

    async fn nested_item_has_been_deleted(&self, ctx: &OperationContext) -> Result<()> {
        self.data.get_key(ctx, &self.base_url, &self.name, "").await?;
        Ok(())
    }

    async fn purge_nested_item(&self, ctx: &OperationContext) -> Result<()> {
        self.data.purge_deleted_key(ctx, &self.base_url, &self.name).await
    }

    async fn nested_item_has_been_purged(&self, ctx: &OperationContext) -> Result<()> {
        self.data.get_deleted_key(ctx, &self.base_url, &self.name).await?;
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

fn is_rsa(key_type: &str) -> bool {
    key_type.eq_ignore_ascii_case("RSA") || key_type.eq_ignore_ascii_case("RSA-HSM")
}

/// Modulus length in bits of a base64url encoded RSA modulus.
fn rsa_key_size(modulus: &str) -> Option<i64> {
    let bytes = URL_SAFE_NO_PAD.decode(modulus.trim_end_matches('=')).ok()?;
    Some(bytes.len() as i64 * 8)
}

fn set_key_attributes(d: &mut ResourceData, bundle: &KeyBundle) -> Result<()> {
    let key = bundle.key.clone().unwrap_or_default();
    let kid = key.kid.as_deref().unwrap_or_default();
    let id = NestedItemId::parse(kid)?;

    d.set("name", id.name.as_str());
    d.set("key_type", key.kty.clone().unwrap_or_default());
    d.set("key_opts", key.key_ops.clone().unwrap_or_default());
    d.set("n", key.n.clone().unwrap_or_default());
    d.set("e", key.e.clone().unwrap_or_default());
    d.set("x", key.x.clone().unwrap_or_default());
    d.set("y", key.y.clone().unwrap_or_default());
    if let Some(size) = key.n.as_deref().and_then(rsa_key_size) {
        d.set("key_size", size);
    }
    if let Some(crv) = &key.crv {
        d.set("curve", crv.as_str());
    }
    d.set("version", id.version.as_str());
    d.set("versionless_id", id.versionless_id());
    flatten_item_attributes(d, bundle.attributes.as_ref());
    d.set("tags", flatten_tags(bundle.tags.as_ref()));
    Ok(())
}

fn expand_key_create_parameters(d: &ResourceData) -> Result<KeyCreateParameters> {
    let key_type = d.get_str("key_type").to_string();
    let mut parameters = KeyCreateParameters {
        kty: key_type.clone(),
        key_ops: Some(d.get_strings("key_opts")),
        attributes: Some(expand_item_attributes(d, Some(true))?),
        tags: expand_tags(d.get("tags")),
        ..Default::default()
    };
    if is_rsa(&key_type) {
        let Some(size) = d.get_ok("key_size").and_then(|v| v.as_i64()) else {
            return Err(Error::Validation("Key size is required when creating an RSA key".to_string()));
        };
        parameters.key_size = Some(size);
    } else if let Some(curve) = d.get_ok("curve").and_then(|v| v.as_str()) {
        parameters.crv = Some(curve.to_string());
    }
    Ok(parameters)
}

pub struct KeyVaultKeyResource;

#[async_trait]
impl Resource for KeyVaultKeyResource {
    fn resource_type(&self) -> &'static str {
        "azurestack_key_vault_key"
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
            .attr(
                "key_type",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::string_in_slice(KEY_TYPES, false)),
            )
            .attr("key_size", Attribute::optional(ValueType::Int).force_new())
            .attr(
                "key_opts",
                Attribute::required(ValueType::List)
                    .elem(Attribute::optional(ValueType::String).validate(validate::string_in_slice(KEY_OPTS, false))),
            )
            .attr(
                "curve",
                Attribute::optional_computed(ValueType::String)
                    .force_new()
                    .validate(validate::string_in_slice(CURVES, false)),
            )
            .attr(
                "not_before_date",
                Attribute::optional(ValueType::String).validate(validate::rfc3339_time),
            )
            .attr(
                "expiration_date",
                Attribute::optional(ValueType::String).validate(validate::rfc3339_time),
            )
            .attr("version", common::computed_string())
            .attr("versionless_id", common::computed_string())
            .attr("n", common::computed_string())
            .attr("e", common::computed_string())
            .attr("x", common::computed_string())
            .attr("y", common::computed_string())
            .attr("tags", common::tags())
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_context();
        let data = &client.key_vault.data;
        let name = d.get_str("name").to_string();
        let vault_id = VaultId::parse(d.get_str("key_vault_id"))?;

        if d.get_ok("key_size").is_some() && d.get_ok("curve").is_some() {
            return Err(Error::Validation(
                "`key_size` conflicts with `curve`, only one of them may be set".to_string(),
            ));
        }

        let base_url = client
            .key_vault
            .base_uri_for_key_vault(&ctx, &vault_id)
            .await
            .with_context(|| format!("looking up Key {name:?} vault url from id {:?}", vault_id.id()))?;

        match data.get_key(&ctx, &base_url, &name, "").await {
            Ok(existing) => {
                if let Some(kid) = existing.key.and_then(|k| k.kid).filter(|k| !k.is_empty()) {
                    return Err(Error::import_as_exists(self.resource_type(), kid));
                }
            }
            Err(e) if e.was_not_found() => {}
            Err(e) => {
                return Err(e.context(format!(
                    "checking for presence of existing Key {name:?} (Key Vault {base_url:?})"
                )))
            }
        }

        let parameters = expand_key_create_parameters(d)?;
        let created = data
            .create_key(&ctx, &base_url, &name, &parameters)
            .await
            .with_context(|| format!("creating Key {name:?} (Key Vault {base_url:?})"))?;
        let kid = created
            .key
            .and_then(|k| k.kid)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Validation(format!("cannot read KeyVault Key {name:?} (in key vault {base_url:?})")))?;
        d.set_id(kid);

        self.read(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = NestedItemId::parse(d.id())?;

        let Some(vault_id) = client
            .key_vault
            .key_vault_id_from_base_url(&ctx, &id.key_vault_base_url)
            .await
            .with_context(|| format!("retrieving the Resource ID the Key Vault at URL {:?}", id.key_vault_base_url))?
        else {
            log::debug!("[DEBUG] Unable to determine the Resource ID for the Key Vault at URL {:?} - removing from state!", id.key_vault_base_url);
            d.set_id("");
            return Ok(());
        };
        let vault_id = VaultId::parse(&vault_id)?;

        if !client.key_vault.exists(&ctx, &vault_id).await? {
            log::debug!("[DEBUG] Key {:?} Key Vault {:?} was not found - removing from state", id.name, vault_id.name);
            d.set_id("");
            return Ok(());
        }

        let bundle = match client
            .key_vault
            .data
            .get_key(&ctx, &id.key_vault_base_url, &id.name, "")
            .await
        {
            Ok(bundle) => bundle,
            Err(e) if e.was_not_found() => {
                log::debug!("[DEBUG] Key {:?} was not found in Key Vault at URI {:?} - removing from state", id.name, id.key_vault_base_url);
                d.set_id("");
                return Ok(());
            }
            Err(e) => return Err(e.context(format!("reading Key Vault Key {id}"))),
        };

        d.set("key_vault_id", vault_id.id());
        set_key_attributes(d, &bundle)
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.update_context();
        let id = NestedItemId::parse(d.id())?;
        let vault_id = VaultId::parse(d.get_str("key_vault_id"))?;

        if !client.key_vault.exists(&ctx, &vault_id).await? {
            log::debug!("[DEBUG] Key {:?} Key Vault {:?} was not found - removing from state", id.name, vault_id.name);
            d.set_id("");
            return Ok(());
        }

        let parameters = KeyUpdateParameters {
            key_ops: Some(d.get_strings("key_opts")),
            attributes: Some(expand_item_attributes(d, Some(true))?),
            tags: expand_tags(d.get("tags")),
        };
        client
            .key_vault
            .data
            .update_key(&ctx, &id.key_vault_base_url, &id.name, "", &parameters)
            .await
            .with_context(|| format!("updating Key Vault Key {:?} (Key Vault {:?})", id.name, id.key_vault_base_url))?;

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
            log::debug!("[DEBUG] Key {:?} Key Vault {:?} was not found - removing from state", id.name, vault_id.name);
            d.set_id("");
            return Ok(());
        }

        let deleter = KeyDeleter {
            data: &client.key_vault.data,
            base_url: id.key_vault_base_url.clone(),
            name: id.name.clone(),
            poll_interval: client.key_vault.timing().nested_item_poll_interval,
        };
        let description = format!("Key {:?} (Key Vault {:?})", id.name, id.key_vault_base_url);
        let should_purge = client.features.key_vault.purge_soft_delete_on_destroy;
        delete_and_optionally_purge(&ctx, &description, should_purge, &deleter).await
    }

    async fn import(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        import_nested_item(client, d).await
    }
}

pub struct KeyVaultKeyDataSource;

#[async_trait]
impl DataSource for KeyVaultKeyDataSource {
    fn resource_type(&self) -> &'static str {
        "azurestack_key_vault_key"
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
            .attr("key_type", common::computed_string())
            .attr("key_size", common::computed_int())
            .attr("key_opts", common::computed_strings())
            .attr("curve", common::computed_string())
            .attr("version", common::computed_string())
            .attr("versionless_id", common::computed_string())
            .attr("n", common::computed_string())
            .attr("e", common::computed_string())
            .attr("x", common::computed_string())
            .attr("y", common::computed_string())
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
            .with_context(|| format!("looking up Key {name:?} vault url from id {:?}", vault_id.id()))?;

        let bundle = match client.key_vault.data.get_key(&ctx, &base_url, &name, "").await {
            Ok(bundle) => bundle,
            Err(e) if e.was_not_found() => {
                return Err(Error::Validation(format!(
                    "KeyVault Key {name:?} (KeyVault URI {base_url:?}) does not exist"
                )))
            }
            Err(e) => return Err(e.context(format!("making Read request on Azure KeyVault Key {name}"))),
        };

        let kid = bundle.key.as_ref().and_then(|k| k.kid.clone()).unwrap_or_default();
        d.set_id(kid);
        set_key_attributes(d, &bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::keyvault::JsonWebKey;
    use serde_json::json;

    #[test]
    fn test_rsa_key_size_from_modulus() {
        let modulus = URL_SAFE_NO_PAD.encode([0xffu8; 256]);
        assert_eq!(rsa_key_size(&modulus), Some(2048));
        assert_eq!(rsa_key_size("!!"), None);
    }

    #[test]
    fn test_set_key_attributes() {
        let bundle = KeyBundle {
            key: Some(JsonWebKey {
                kid: Some("https://v1.vault.local.azurestack.external/keys/k1/0123456789abcdef".into()),
                kty: Some("RSA".into()),
                key_ops: Some(vec!["sign".into(), "verify".into()]),
                n: Some(URL_SAFE_NO_PAD.encode([1u8; 512])),
                e: Some("AQAB".into()),
                ..Default::default()
            }),
            attributes: None,
            tags: None,
        };
        let mut d = ResourceData::from_id(bundle.key.as_ref().unwrap().kid.clone().unwrap());
        set_key_attributes(&mut d, &bundle).unwrap();
        assert_eq!(d.get_str("name"), "k1");
        assert_eq!(d.get_i64("key_size"), 4096);
        assert_eq!(d.get_str("version"), "0123456789abcdef");
        assert_eq!(
            d.get_str("versionless_id"),
            "https://v1.vault.local.azurestack.external/keys/k1"
        );
        assert_eq!(d.get("key_opts"), Some(&json!(["sign", "verify"])));
    }

    #[test]
    fn test_key_type_validation() {
        let schema = KeyVaultKeyResource.schema();
        let config = json!({
            "name": "k1",
            "key_vault_id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/v1",
            "key_type": "EC-HSM",
            "key_opts": ["sign"],
            "curve": "P-256",
        });
        schema.validate(config.as_object().unwrap()).unwrap();
        let mut bad = config.clone();
        bad["key_type"] = json!("oct");
        assert!(schema.validate(bad.as_object().unwrap()).is_err());
    }

    fn config(value: serde_json::Value) -> ResourceData {
        ResourceData::new(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_rsa_requires_key_size() {
        let d = config(json!({"name": "k1", "key_type": "RSA", "key_opts": ["sign"]}));
        let err = expand_key_create_parameters(&d).unwrap_err();
        assert_eq!(err.to_string(), "Key size is required when creating an RSA key");

        let d = config(json!({
            "name": "k1",
            "key_type": "RSA-HSM",
            "key_size": 2048,
            "key_opts": ["sign"],
            "expiration_date": "2030-01-01T00:00:00Z",
        }));
        let params = expand_key_create_parameters(&d).unwrap();
        assert_eq!(params.key_size, Some(2048));
        assert_eq!(params.crv, None);
        let attributes = params.attributes.unwrap();
        assert_eq!(attributes.enabled, Some(true));
        assert_eq!(attributes.exp, Some(1_893_456_000));
    }

    #[test]
    fn test_ec_uses_curve() {
        let d = config(json!({"key_type": "EC", "curve": "P-384", "key_opts": ["sign", "verify"]}));
        let params = expand_key_create_parameters(&d).unwrap();
        assert_eq!(params.crv.as_deref(), Some("P-384"));
        assert_eq!(params.key_size, None);
        assert_eq!(params.key_ops, Some(vec!["sign".to_string(), "verify".to_string()]));
    }
}
