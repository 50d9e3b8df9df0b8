//! `azurestack_key_vault_access_policy` resource and data source.

use crate::clients::Client;
use crate::config::KEY_VAULT_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use crate::ids::{AccessPolicyId, VaultId};
use crate::locks::KEY_VAULT_RESOURCE_NAME;
use crate::models::keyvault::{
    AccessPolicyEntry, Permissions, Vault, VaultAccessPolicyParameters, VaultAccessPolicyProperties,
};
use crate::poll::StateChangeConf;
use crate::schema::{validate, Attribute, DataSource, Resource, ResourceData, Schema, ValueType};
use crate::timeouts::OperationContext;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::fmt;

pub const KEY_PERMISSIONS: &[&str] = &[
    "backup", "create", "decrypt", "delete", "encrypt", "get", "import", "list", "purge", "recover",
    "restore", "sign", "unwrapKey", "update", "verify", "wrapKey",
];

pub const SECRET_PERMISSIONS: &[&str] =
    &["backup", "delete", "get", "list", "purge", "recover", "restore", "set"];

pub const CERTIFICATE_PERMISSIONS: &[&str] = &[
    "backup", "create", "delete", "deleteissuers", "get", "getissuers", "import", "list",
    "listissuers", "managecontacts", "manageissuers", "purge", "recover", "restore", "setissuers",
    "update",
];

pub const STORAGE_PERMISSIONS: &[&str] = &[
    "backup", "delete", "deletesas", "get", "getsas", "list", "listsas", "purge", "recover",
    "regeneratekey", "restore", "set", "setsas", "update",
];

fn permissions(valid: &'static [&'static str]) -> Attribute {
    Attribute::optional(ValueType::List)
        .elem(Attribute::optional(ValueType::String).validate(validate::string_in_slice(valid, true)))
}

pub fn schema_key_permissions() -> Attribute {
    permissions(KEY_PERMISSIONS)
}

pub fn schema_secret_permissions() -> Attribute {
    permissions(SECRET_PERMISSIONS)
}

pub fn schema_certificate_permissions() -> Attribute {
    permissions(CERTIFICATE_PERMISSIONS)
}

pub fn schema_storage_permissions() -> Attribute {
    permissions(STORAGE_PERMISSIONS)
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default()
}

fn str_field<'a>(block: &'a Map<String, Value>, key: &str) -> &'a str {
    block.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// One `access_policy` block (or the access policy resource's attributes).
pub fn expand_access_policy(block: &Map<String, Value>) -> AccessPolicyEntry {
    let application_id = str_field(block, "application_id");
    AccessPolicyEntry {
        tenant_id: str_field(block, "tenant_id").to_string(),
        object_id: str_field(block, "object_id").to_string(),
        application_id: (!application_id.is_empty()).then(|| application_id.to_string()),
        permissions: Permissions {
            keys: Some(strings(block.get("key_permissions"))),
            secrets: Some(strings(block.get("secret_permissions"))),
            certificates: Some(strings(block.get("certificate_permissions"))),
            storage: Some(strings(block.get("storage_permissions"))),
        },
    }
}

pub fn expand_access_policies(input: &[Value]) -> Vec<AccessPolicyEntry> {
    input
        .iter()
        .filter_map(Value::as_object)
        .map(expand_access_policy)
        .collect()
}

pub fn flatten_access_policy(policy: &AccessPolicyEntry) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("tenant_id".into(), json!(policy.tenant_id));
    out.insert("object_id".into(), json!(policy.object_id));
    out.insert(
        "application_id".into(),
        json!(policy.application_id.clone().unwrap_or_default()),
    );
    let p = &policy.permissions;
    out.insert("key_permissions".into(), json!(p.keys.clone().unwrap_or_default()));
    out.insert("secret_permissions".into(), json!(p.secrets.clone().unwrap_or_default()));
    out.insert(
        "certificate_permissions".into(),
        json!(p.certificates.clone().unwrap_or_default()),
    );
    out.insert("storage_permissions".into(), json!(p.storage.clone().unwrap_or_default()));
    out
}

pub fn flatten_access_policies(policies: Option<&Vec<AccessPolicyEntry>>) -> Vec<Value> {
    policies
        .map(|list| list.iter().map(|p| Value::Object(flatten_access_policy(p))).collect())
        .unwrap_or_default()
}

/// The policy for `object_id`/`application_id`; object ids compare case-insensitively.
pub fn find_key_vault_access_policy<'a>(
    policies: Option<&'a Vec<AccessPolicyEntry>>,
    object_id: &str,
    application_id: &str,
) -> Option<&'a AccessPolicyEntry> {
    policies?.iter().find(|p| {
        p.object_id.eq_ignore_ascii_case(object_id)
            && p.application_id.as_deref().unwrap_or_default().eq_ignore_ascii_case(application_id)
    })
}

#[derive(Debug, Clone, Copy)]
enum PolicyOperation {
    Add,
    Replace,
    Remove,
}

impl fmt::Display for PolicyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PolicyOperation::Add => "add",
            PolicyOperation::Replace => "replace",
            PolicyOperation::Remove => "remove",
        };
        write!(f, "{s}")
    }
}

async fn update_access_policy(
    client: &Client,
    ctx: &OperationContext,
    vault_id: &VaultId,
    operation: PolicyOperation,
    entry: AccessPolicyEntry,
) -> Result<()> {
    let params = VaultAccessPolicyParameters {
        properties: VaultAccessPolicyProperties {
            access_policies: vec![entry],
        },
    };
    let path = format!("{}/accessPolicies/{operation}", vault_id.id());
    let _: Value = client.arm.put(ctx, &path, KEY_VAULT_API_VERSION, &params).await?;
    Ok(())
}

async fn get_vault_for_policy(client: &Client, ctx: &OperationContext, vault_id: &VaultId) -> Result<Vault> {
    match client.key_vault.get_vault(ctx, vault_id).await {
        Ok(vault) => Ok(vault),
        Err(e) if e.was_not_found() => Err(Error::Validation(format!("{vault_id} was not found"))),
        Err(e) => Err(e.context(format!("retrieving {vault_id}"))),
    }
}

pub struct KeyVaultAccessPolicyResource;

#[async_trait]
impl Resource for KeyVaultAccessPolicyResource {
    fn resource_type(&self) -> &'static str {
        "azurestack_key_vault_access_policy"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "key_vault_id",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::resource_id),
            )
            .attr(
                "tenant_id",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::is_uuid),
            )
            .attr(
                "object_id",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::string_is_not_empty),
            )
            .attr(
                "application_id",
                Attribute::optional(ValueType::String)
                    .force_new()
                    .validate(validate::is_uuid_or_empty),
            )
            .attr("certificate_permissions", schema_certificate_permissions())
            .attr("key_permissions", schema_key_permissions())
            .attr("secret_permissions", schema_secret_permissions())
            .attr("storage_permissions", schema_storage_permissions())
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_context();
        let vault_id = VaultId::parse(d.get_str("key_vault_id"))?;
        let object_id = d.get_str("object_id").to_string();
        let application_id = d.get_str("application_id").to_string();
        let id = AccessPolicyId::new(vault_id.clone(), &object_id, &application_id);

        let _lock = client.locks.by_name(&vault_id.name, KEY_VAULT_RESOURCE_NAME).await;

        let vault = get_vault_for_policy(client, &ctx, &vault_id).await?;
        let existing = vault.properties.as_ref().and_then(|p| p.access_policies.as_ref());
        if find_key_vault_access_policy(existing, &object_id, &application_id).is_some() {
            return Err(Error::import_as_exists(self.resource_type(), id.id()));
        }

        let entry = expand_access_policy(d.attributes());
        update_access_policy(client, &ctx, &vault_id, PolicyOperation::Add, entry)
            .await
            .with_context(|| format!("creating {id}"))?;

        log::debug!("[DEBUG] Waiting for {id} to become available");
        let conf = StateChangeConf::new(&["notfound", "vaultnotfound"], &["found"])
            .poll_interval(client.key_vault.timing().nested_item_poll_interval)
            .continuous_target_occurence(3)
            .timeout(ctx.remaining());
        let (object_id, application_id) = (&object_id, &application_id);
        let (ctx_ref, vault_ref) = (&ctx, &vault_id);
        conf.wait_for_state(move || async move {
            let state = match client.key_vault.get_vault(ctx_ref, vault_ref).await {
                Ok(vault) => {
                    let policies = vault.properties.as_ref().and_then(|p| p.access_policies.as_ref());
                    if find_key_vault_access_policy(policies, object_id, application_id).is_some() {
                        "found"
                    } else {
                        "notfound"
                    }
                }
                Err(e) if e.was_not_found() => "vaultnotfound",
                Err(e) => return Err(e.context(format!("retrieving {vault_ref}"))),
            };
            Ok(Some(((), state.to_string())))
        })
        .await
        .with_context(|| format!("waiting for {id} to become available"))?;

        d.set_id(id.id());
        self.read(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = AccessPolicyId::parse(d.id())?;

        let vault = match client.key_vault.get_vault(&ctx, &id.vault).await {
            Ok(vault) => vault,
            Err(e) if e.was_not_found() => {
                log::debug!("[DEBUG] {} was not found - removing from state!", id.vault);
                d.set_id("");
                return Ok(());
            }
            Err(e) => return Err(e.context(format!("retrieving {}", id.vault))),
        };

        let policies = vault.properties.as_ref().and_then(|p| p.access_policies.as_ref());
        let Some(policy) = find_key_vault_access_policy(policies, &id.object_id, &id.application_id) else {
            log::debug!("[DEBUG] {id} was not found - removing from state!");
            d.set_id("");
            return Ok(());
        };

        d.set("key_vault_id", id.vault.id());
        for (key, value) in flatten_access_policy(policy) {
            d.set(&key, value);
        }
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.update_context();
        let id = AccessPolicyId::parse(d.id())?;
        let _lock = client.locks.by_name(&id.vault.name, KEY_VAULT_RESOURCE_NAME).await;

        let entry = expand_access_policy(d.attributes());
        update_access_policy(client, &ctx, &id.vault, PolicyOperation::Replace, entry)
            .await
            .with_context(|| format!("updating {id}"))?;

        self.read(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = AccessPolicyId::parse(d.id())?;
        let _lock = client.locks.by_name(&id.vault.name, KEY_VAULT_RESOURCE_NAME).await;

        match client.key_vault.get_vault(&ctx, &id.vault).await {
            Ok(_) => {}
            Err(e) if e.was_not_found() => return Ok(()),
            Err(e) => return Err(e.context(format!("retrieving {}", id.vault))),
        }

        let entry = AccessPolicyEntry {
            tenant_id: d.get_str("tenant_id").to_string(),
            object_id: id.object_id.clone(),
            application_id: (!id.application_id.is_empty()).then(|| id.application_id.clone()),
            permissions: Permissions::default(),
        };
        update_access_policy(client, &ctx, &id.vault, PolicyOperation::Remove, entry)
            .await
            .with_context(|| format!("removing {id}"))
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        AccessPolicyId::parse(id).map(|_| ())
    }
}

/// Canned permission sets by name.
const ACCESS_POLICY_NAMES: &[&str] = &[
    "Key Management",
    "Secret Management",
    "Certificate Management",
    "Key & Secret Management",
    "Key & Certificate Management",
    "Secret & Certificate Management",
    "Key, Secret, & Certificate Management",
];

const MANAGEMENT_KEY_PERMISSIONS: &[&str] =
    &["get", "list", "update", "create", "import", "delete", "recover", "backup", "restore"];

const MANAGEMENT_SECRET_PERMISSIONS: &[&str] =
    &["get", "list", "set", "delete", "recover", "backup", "restore"];

const MANAGEMENT_CERTIFICATE_PERMISSIONS: &[&str] = &[
    "get", "list", "update", "create", "import", "delete", "managecontacts", "manageissuers",
    "getissuers", "listissuers", "setissuers", "deleteissuers",
];

fn pick(name: &str, component: &str, values: &'static [&'static str]) -> &'static [&'static str] {
    if name.contains(component) {
        values
    } else {
        &[]
    }
}

pub struct KeyVaultAccessPolicyDataSource;

#[async_trait]
impl DataSource for KeyVaultAccessPolicyDataSource {
    fn resource_type(&self) -> &'static str {
        "azurestack_key_vault_access_policy"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String)
                    .validate(validate::string_in_slice(ACCESS_POLICY_NAMES, false)),
            )
            .attr("key_permissions", Attribute::computed(ValueType::List).elem(Attribute::computed(ValueType::String)))
            .attr("secret_permissions", Attribute::computed(ValueType::List).elem(Attribute::computed(ValueType::String)))
            .attr(
                "certificate_permissions",
                Attribute::computed(ValueType::List).elem(Attribute::computed(ValueType::String)),
            )
    }

    async fn read(&self, _client: &Client, d: &mut ResourceData) -> Result<()> {
        let name = d.get_str("name").to_string();
        d.set("key_permissions", json!(pick(&name, "Key", MANAGEMENT_KEY_PERMISSIONS)));
        d.set("secret_permissions", json!(pick(&name, "Secret", MANAGEMENT_SECRET_PERMISSIONS)));
        d.set(
            "certificate_permissions",
            json!(pick(&name, "Certificate", MANAGEMENT_CERTIFICATE_PERMISSIONS)),
        );
        d.set_id(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(object_id: &str, application_id: Option<&str>) -> AccessPolicyEntry {
        AccessPolicyEntry {
            tenant_id: "t".into(),
            object_id: object_id.into(),
            application_id: application_id.map(String::from),
            permissions: Permissions::default(),
        }
    }

    #[test]
    fn test_find_policy_matches_object_and_application() {
        let policies = vec![entry("ABC", None), entry("abc", Some("app1"))];
        let found = find_key_vault_access_policy(Some(&policies), "abc", "").unwrap();
        assert_eq!(found.object_id, "ABC");
        let found = find_key_vault_access_policy(Some(&policies), "abc", "APP1").unwrap();
        assert_eq!(found.application_id.as_deref(), Some("app1"));
        assert!(find_key_vault_access_policy(Some(&policies), "def", "").is_none());
        assert!(find_key_vault_access_policy(None, "abc", "").is_none());
    }

    #[test]
    fn test_access_policy_expand_flatten() {
        let block = json!({
            "tenant_id": "00000000-0000-0000-0000-000000000001",
            "object_id": "obj",
            "application_id": "",
            "key_permissions": ["get", "list"],
            "secret_permissions": ["set"],
        });
        let expanded = expand_access_policy(block.as_object().unwrap());
        assert_eq!(expanded.application_id, None);
        assert_eq!(expanded.permissions.keys, Some(vec!["get".to_string(), "list".to_string()]));
        assert_eq!(expanded.permissions.certificates, Some(vec![]));

        let flattened = flatten_access_policy(&expanded);
        assert_eq!(flattened["application_id"], json!(""));
        assert_eq!(flattened["key_permissions"], json!(["get", "list"]));
        assert_eq!(expand_access_policy(&flattened), expanded);
    }

    #[test]
    fn test_permission_validation_ignores_case() {
        let schema = KeyVaultAccessPolicyResource.schema();
        let config = json!({
            "key_vault_id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/v1",
            "tenant_id": "00000000-0000-0000-0000-000000000001",
            "object_id": "obj",
            "key_permissions": ["Get", "UNWRAPKEY"],
        });
        schema.validate(config.as_object().unwrap()).unwrap();

        let bad = json!({
            "key_vault_id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/v1",
            "tenant_id": "00000000-0000-0000-0000-000000000001",
            "object_id": "obj",
            "secret_permissions": ["sign"],
        });
        assert!(schema.validate(bad.as_object().unwrap()).is_err());
    }

    #[tokio::test]
    async fn test_data_source_picks_permission_sets() {
        let client = crate::clients::testing::offline_client();
        let mut d = ResourceData::new(
            json!({"name": "Key & Certificate Management"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        KeyVaultAccessPolicyDataSource.read(&client, &mut d).await.unwrap();
        assert_eq!(d.id(), "Key & Certificate Management");
        assert_eq!(d.get_strings("key_permissions").len(), MANAGEMENT_KEY_PERMISSIONS.len());
        assert!(d.get_strings("secret_permissions").is_empty());
        assert!(d.get_strings("certificate_permissions").contains(&"managecontacts".to_string()));
    }
}
