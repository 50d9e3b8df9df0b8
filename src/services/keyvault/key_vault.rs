//! `azurestack_key_vault` resource and data source.

use super::key_vault_access_policy::{
    expand_access_policies, flatten_access_policies, schema_certificate_permissions,
    schema_key_permissions, schema_secret_permissions, schema_storage_permissions,
};
use crate::clients::Client;
use crate::config::KEY_VAULT_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use crate::ids::{SubnetId, VaultId};
use crate::locks::{KEY_VAULT_RESOURCE_NAME, VIRTUAL_NETWORK_RESOURCE_NAME};
use crate::models::ipv4::normalize_ip_rule;
use crate::models::keyvault::{
    IpRule, NetworkRuleSet, Sku, Vault, VaultCreateOrUpdateParameters, VaultPatchParameters,
    VaultProperties, VirtualNetworkRule,
};
use crate::models::{expand_tags, flatten_tags, normalize_location};
use crate::poll::StateChangeConf;
use crate::schema::{common, validate, Attribute, DataSource, Resource, ResourceData, Schema, ValueType};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// The only sku family the API accepts.
const SKU_FAMILY: &str = "A";

const SKU_NAMES: &[&str] = &["standard", "premium"];

fn access_policy_block() -> Schema {
    Schema::new()
        .attr(
            "tenant_id",
            Attribute::required(ValueType::String).validate(validate::is_uuid),
        )
        .attr("object_id", Attribute::required(ValueType::String))
        .attr(
            "application_id",
            Attribute::optional(ValueType::String).validate(validate::is_uuid_or_empty),
        )
        .attr("certificate_permissions", schema_certificate_permissions())
        .attr("key_permissions", schema_key_permissions())
        .attr("secret_permissions", schema_secret_permissions())
        .attr("storage_permissions", schema_storage_permissions())
}

fn access_policy_block_computed() -> Schema {
    Schema::new()
        .attr("tenant_id", common::computed_string())
        .attr("object_id", common::computed_string())
        .attr("application_id", common::computed_string())
        .attr("certificate_permissions", common::computed_strings())
        .attr("key_permissions", common::computed_strings())
        .attr("secret_permissions", common::computed_strings())
        .attr("storage_permissions", common::computed_strings())
}

fn network_acls_block() -> Schema {
    Schema::new()
        .attr(
            "default_action",
            Attribute::required(ValueType::String)
                .validate(validate::string_in_slice(&["Allow", "Deny"], false)),
        )
        .attr(
            "bypass",
            Attribute::required(ValueType::String)
                .validate(validate::string_in_slice(&["None", "AzureServices"], false)),
        )
        .attr(
            "ip_rules",
            Attribute::optional(ValueType::Set)
                .elem(Attribute::optional(ValueType::String).validate(validate::ipv4_or_cidr)),
        )
        .attr(
            "virtual_network_subnet_ids",
            Attribute::optional(ValueType::Set).elem(Attribute::optional(ValueType::String)),
        )
}

/// The ACL rule set and the subnet ids it references.
pub fn expand_key_vault_network_acls(input: &[Value]) -> (Option<NetworkRuleSet>, Vec<String>) {
    let Some(block) = input.first().and_then(Value::as_object) else {
        return (None, Vec::new());
    };
    let str_list = |key: &str| -> Vec<String> {
        block
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default()
    };

    let ip_rules = str_list("ip_rules")
        .into_iter()
        .map(|value| IpRule { value })
        .collect();
    let subnet_ids = str_list("virtual_network_subnet_ids");
    let network_rules = subnet_ids
        .iter()
        .map(|id| VirtualNetworkRule { id: id.clone() })
        .collect();

    let rule_set = NetworkRuleSet {
        bypass: block.get("bypass").and_then(Value::as_str).map(String::from),
        default_action: block.get("default_action").and_then(Value::as_str).map(String::from),
        ip_rules: Some(ip_rules),
        virtual_network_rules: Some(network_rules),
    };
    (Some(rule_set), subnet_ids)
}

/// Missing ACLs flatten to what the service applies by default.
pub fn flatten_key_vault_network_acls(input: Option<&NetworkRuleSet>) -> Vec<Value> {
    let Some(input) = input else {
        return vec![json!({
            "bypass": "AzureServices",
            "default_action": "Allow",
            "ip_rules": [],
            "virtual_network_subnet_ids": [],
        })];
    };

    let ip_rules: Vec<String> = input
        .ip_rules
        .iter()
        .flatten()
        .map(|rule| normalize_ip_rule(&rule.value))
        .collect();
    let subnet_ids: Vec<String> = input
        .virtual_network_rules
        .iter()
        .flatten()
        .map(|rule| match SubnetId::parse_insensitively(&rule.id) {
            Ok(id) => id.id(),
            Err(_) => rule.id.clone(),
        })
        .collect();

    vec![json!({
        "bypass": input.bypass.clone().unwrap_or_default(),
        "default_action": input.default_action.clone().unwrap_or_default(),
        "ip_rules": ip_rules,
        "virtual_network_subnet_ids": subnet_ids,
    })]
}

/// Virtual network names of `subnet_ids`, without duplicates.
fn virtual_network_names<S: AsRef<str>>(subnet_ids: &[S]) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for raw in subnet_ids {
        let id = SubnetId::parse_insensitively(raw.as_ref())?;
        if !names.contains(&id.virtual_network_name) {
            names.push(id.virtual_network_name);
        }
    }
    Ok(names)
}

fn normalize_sku_name(name: &str) -> String {
    SKU_NAMES
        .iter()
        .find(|s| s.eq_ignore_ascii_case(name))
        .map(|s| s.to_string())
        .unwrap_or_default()
}

fn sku(name: &str) -> Sku {
    Sku {
        family: SKU_FAMILY.to_string(),
        name: name.to_string(),
    }
}

fn flatten_vault(d: &mut ResourceData, id: &VaultId, vault: &Vault) -> Result<()> {
    let props = vault
        .properties
        .as_ref()
        .ok_or_else(|| Error::Validation(format!("retrieving {id}: `properties` was nil")))?;
    let vault_uri = props
        .vault_uri
        .as_deref()
        .ok_or_else(|| Error::Validation(format!("retrieving {id}: `properties.VaultUri` was nil")))?;

    d.set("name", id.name.as_str());
    d.set("resource_group_name", id.resource_group.as_str());
    d.set(
        "location",
        normalize_location(vault.location.as_deref().unwrap_or_default()),
    );
    d.set("tenant_id", props.tenant_id.clone().unwrap_or_default());
    d.set("enabled_for_deployment", props.enabled_for_deployment.unwrap_or_default());
    d.set("enabled_for_disk_encryption", props.enabled_for_disk_encryption.unwrap_or_default());
    d.set(
        "enabled_for_template_deployment",
        props.enabled_for_template_deployment.unwrap_or_default(),
    );
    d.set("vault_uri", vault_uri);
    d.set(
        "sku_name",
        normalize_sku_name(props.sku.as_ref().map(|s| s.name.as_str()).unwrap_or_default()),
    );
    d.set("network_acls", flatten_key_vault_network_acls(props.network_acls.as_ref()));
    d.set("access_policy", flatten_access_policies(props.access_policies.as_ref()));
    d.set("tags", flatten_tags(vault.tags.as_ref()));
    Ok(())
}

pub struct KeyVaultResource;

impl KeyVaultResource {
    /// Wait until the new vault answers HTTP requests at its URI.
    async fn wait_for_availability(
        &self,
        client: &Client,
        id: &VaultId,
        vault_uri: &str,
        remaining: Duration,
    ) -> Result<()> {
        log::debug!("[DEBUG] Waiting for {id} to become available");
        let timing = client.key_vault.timing();
        let conf = StateChangeConf::new(&["pending"], &["available"])
            .delay(timing.availability_delay)
            .poll_interval(timing.availability_poll_interval)
            .continuous_target_occurence(timing.availability_occurrences)
            .timeout(remaining);
        let http = client.key_vault.http();
        conf.wait_for_state(move || async move {
            log::debug!("[DEBUG] Checking to see if KeyVault {vault_uri:?} is available..");
            let state = match http.get(vault_uri).send().await {
                Ok(_) => {
                    log::debug!("[DEBUG] Found KeyVault at {vault_uri:?}");
                    "available"
                }
                Err(e) => {
                    log::debug!("[DEBUG] Didn't find KeyVault at {vault_uri:?}: {e}");
                    "pending"
                }
            };
            Ok(Some(((), state.to_string())))
        })
        .await
        .with_context(|| format!("waiting for {id} to become available"))?;
        Ok(())
    }
}

#[async_trait]
impl Resource for KeyVaultResource {
    fn resource_type(&self) -> &'static str {
        KEY_VAULT_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::vault_name),
            )
            .attr("location", common::location())
            .attr("resource_group_name", common::resource_group_name())
            .attr(
                "sku_name",
                Attribute::required(ValueType::String)
                    .validate(validate::string_in_slice(&["standard"], false)),
            )
            .attr(
                "tenant_id",
                Attribute::required(ValueType::String).validate(validate::is_uuid),
            )
            .attr(
                "access_policy",
                Attribute::optional_computed(ValueType::List)
                    .max_items(1024)
                    .block(access_policy_block()),
            )
            .attr("enabled_for_deployment", Attribute::optional(ValueType::Bool))
            .attr("enabled_for_disk_encryption", Attribute::optional(ValueType::Bool))
            .attr("enabled_for_template_deployment", Attribute::optional(ValueType::Bool))
            .attr("enable_rbac_authorization", Attribute::optional(ValueType::Bool))
            .attr(
                "network_acls",
                Attribute::optional_computed(ValueType::List)
                    .max_items(1)
                    .block(network_acls_block()),
            )
            .attr("tags", common::tags())
            .attr("vault_uri", common::computed_string())
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_context();
        let id = VaultId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));
        let location = normalize_location(d.get_str("location"));

        let _lock = client.locks.by_name(&id.name, KEY_VAULT_RESOURCE_NAME).await;

        match client.key_vault.get_vault(&ctx, &id).await {
            Ok(_) => return Err(Error::import_as_exists(self.resource_type(), id.id())),
            Err(e) if e.was_not_found() => {}
            Err(e) => return Err(e.context(format!("checking for presence of existing {id}"))),
        }

        let (network_acls, subnet_ids) = expand_key_vault_network_acls(d.get_list("network_acls"));
        let parameters = VaultCreateOrUpdateParameters {
            location,
            tags: expand_tags(d.get("tags")),
            properties: VaultProperties {
                tenant_id: Some(d.get_str("tenant_id").to_string()),
                sku: Some(sku(d.get_str("sku_name"))),
                access_policies: Some(expand_access_policies(d.get_list("access_policy"))),
                enabled_for_deployment: Some(d.get_bool("enabled_for_deployment")),
                enabled_for_disk_encryption: Some(d.get_bool("enabled_for_disk_encryption")),
                enabled_for_template_deployment: Some(d.get_bool("enabled_for_template_deployment")),
                enable_rbac_authorization: Some(d.get_bool("enable_rbac_authorization")),
                network_acls,
                // soft delete is not supported on AzureStack Hub
                enable_soft_delete: Some(false),
                vault_uri: None,
            },
        };

        let names = virtual_network_names(&subnet_ids)?;
        let _network_locks = client
            .locks
            .multiple_by_name(&names, VIRTUAL_NETWORK_RESOURCE_NAME)
            .await;

        let _: Value = client
            .arm
            .put(&ctx, &id.id(), KEY_VAULT_API_VERSION, &parameters)
            .await
            .with_context(|| format!("creating {id}"))?;

        let read = client
            .key_vault
            .get_vault(&ctx, &id)
            .await
            .with_context(|| format!("retrieving {id}"))?;
        let vault_uri = read
            .properties
            .and_then(|p| p.vault_uri)
            .ok_or_else(|| Error::Validation(format!("retrieving {id}: `properties.VaultUri` was nil")))?;
        d.set_id(id.id());
        client.key_vault.add_to_cache(&id, &vault_uri);

        self.wait_for_availability(client, &id, &vault_uri, ctx.remaining())
            .await?;

        self.read(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = VaultId::parse(d.id())?;

        let vault = match client.key_vault.get_vault(&ctx, &id).await {
            Ok(vault) => vault,
            Err(e) if e.was_not_found() => {
                log::debug!("[DEBUG] {id} was not found - removing from state!");
                d.set_id("");
                return Ok(());
            }
            Err(e) => return Err(e.context(format!("retrieving {id}"))),
        };
        if let Some(uri) = vault.properties.as_ref().and_then(|p| p.vault_uri.as_deref()) {
            client.key_vault.add_to_cache(&id, uri);
        }

        flatten_vault(d, &id, &vault)?;
        let rbac = vault
            .properties
            .as_ref()
            .and_then(|p| p.enable_rbac_authorization)
            .unwrap_or_default();
        d.set("enable_rbac_authorization", rbac);
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.update_context();
        let id = VaultId::parse(d.id())?;

        let _lock = client.locks.by_name(&id.name, KEY_VAULT_RESOURCE_NAME).await;

        let existing = client
            .key_vault
            .get_vault(&ctx, &id)
            .await
            .with_context(|| format!("retrieving {id}"))?;
        if existing.properties.is_none() {
            return Err(Error::Validation(format!("retrieving {id}: `properties` was nil")));
        }

        let mut update = VaultPatchParameters::default();
        let mut props = VaultProperties::default();
        let mut changed = false;

        if d.has_change("access_policy") {
            props.access_policies = Some(expand_access_policies(d.get_list("access_policy")));
            changed = true;
        }
        for (key, field) in [
            ("enabled_for_deployment", &mut props.enabled_for_deployment),
            ("enabled_for_disk_encryption", &mut props.enabled_for_disk_encryption),
            ("enabled_for_template_deployment", &mut props.enabled_for_template_deployment),
            ("enable_rbac_authorization", &mut props.enable_rbac_authorization),
        ] {
            if d.has_change(key) {
                *field = Some(d.get_bool(key));
                changed = true;
            }
        }

        let mut _network_locks = Vec::new();
        if d.has_change("network_acls") {
            let (network_acls, subnet_ids) = expand_key_vault_network_acls(d.get_list("network_acls"));
            let names = virtual_network_names(&subnet_ids)?;
            _network_locks = client
                .locks
                .multiple_by_name(&names, VIRTUAL_NETWORK_RESOURCE_NAME)
                .await;
            props.network_acls = network_acls;
            changed = true;
        }
        if d.has_change("sku_name") {
            props.sku = Some(sku(d.get_str("sku_name")));
            changed = true;
        }
        if d.has_change("tenant_id") {
            props.tenant_id = Some(d.get_str("tenant_id").to_string());
            changed = true;
        }
        if changed {
            update.properties = Some(props);
        }
        if d.has_change("tags") {
            update.tags = Some(expand_tags(d.get("tags")).unwrap_or_default());
        }

        let _: Value = client
            .arm
            .patch(&ctx, &id.id(), KEY_VAULT_API_VERSION, &update)
            .await
            .with_context(|| format!("updating {id}"))?;

        self.read(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = VaultId::parse(d.id())?;

        let _lock = client.locks.by_name(&id.name, KEY_VAULT_RESOURCE_NAME).await;

        let read = match client.key_vault.get_vault(&ctx, &id).await {
            Ok(vault) => vault,
            Err(e) if e.was_not_found() => return Ok(()),
            Err(e) => return Err(e.context(format!("retrieving {id}"))),
        };
        let props = read
            .properties
            .ok_or_else(|| Error::Validation(format!("retrieving {id}: `properties` was nil")))?;

        let subnet_ids: Vec<String> = props
            .network_acls
            .and_then(|acls| acls.virtual_network_rules)
            .unwrap_or_default()
            .into_iter()
            .map(|rule| rule.id)
            .collect();
        let names = virtual_network_names(&subnet_ids)?;
        let _network_locks = client
            .locks
            .multiple_by_name(&names, VIRTUAL_NETWORK_RESOURCE_NAME)
            .await;

        match client.arm.delete(&ctx, &id.id(), KEY_VAULT_API_VERSION).await {
            Ok(()) => {}
            Err(e) if e.was_not_found() => {}
            Err(e) => return Err(e.context(format!("deleting {id}"))),
        }

        client.key_vault.purge(&id);
        Ok(())
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        VaultId::parse(id).map(|_| ())
    }
}

pub struct KeyVaultDataSource;

#[async_trait]
impl DataSource for KeyVaultDataSource {
    fn resource_type(&self) -> &'static str {
        KEY_VAULT_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        let network_acls = Schema::new()
            .attr("default_action", common::computed_string())
            .attr("bypass", common::computed_string())
            .attr("ip_rules", common::computed_strings())
            .attr("virtual_network_subnet_ids", common::computed_strings());
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String).validate(validate::vault_name),
            )
            .attr("resource_group_name", common::resource_group_name_for_data_source())
            .attr("location", common::location_computed())
            .attr("sku_name", common::computed_string())
            .attr("tenant_id", common::computed_string())
            .attr(
                "access_policy",
                Attribute::computed(ValueType::List).block(access_policy_block_computed()),
            )
            .attr("enabled_for_deployment", common::computed_bool())
            .attr("enabled_for_disk_encryption", common::computed_bool())
            .attr("enabled_for_template_deployment", common::computed_bool())
            .attr("network_acls", Attribute::computed(ValueType::List).block(network_acls))
            .attr("vault_uri", common::computed_string())
            .attr("tags", common::tags_computed())
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = VaultId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));

        let vault: Vault = crate::services::get_existing(client, &ctx, &id.id(), &id, KEY_VAULT_API_VERSION).await?;
        d.set_id(id.id());
        if let Some(uri) = vault.properties.as_ref().and_then(|p| p.vault_uri.as_deref()) {
            client.key_vault.add_to_cache(&id, uri);
        }
        flatten_vault(d, &id, &vault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn acl_block(bypass: &str, action: &str, ips: &[&str], subnets: &[&str]) -> Vec<Value> {
        let mut block = Map::new();
        block.insert("bypass".into(), json!(bypass));
        block.insert("default_action".into(), json!(action));
        block.insert("ip_rules".into(), json!(ips));
        block.insert("virtual_network_subnet_ids".into(), json!(subnets));
        vec![Value::Object(block)]
    }

    const SUBNET: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/sn1";

    #[test]
    fn test_network_acls_round_trip() {
        let input = acl_block("None", "Deny", &["10.0.0.0/24", "1.2.3.4"], &[SUBNET]);
        let (rule_set, subnet_ids) = expand_key_vault_network_acls(&input);
        assert_eq!(subnet_ids, vec![SUBNET.to_string()]);
        let rule_set = rule_set.unwrap();
        assert_eq!(rule_set.ip_rules.as_ref().unwrap().len(), 2);

        let flattened = flatten_key_vault_network_acls(Some(&rule_set));
        assert_eq!(flattened, input);
        let (again, _) = expand_key_vault_network_acls(&flattened);
        assert_eq!(again.unwrap(), rule_set);
    }

    #[test]
    fn test_network_acls_default_when_missing() {
        let flattened = flatten_key_vault_network_acls(None);
        assert_eq!(flattened, acl_block("AzureServices", "Allow", &[], &[]));
        assert_eq!(expand_key_vault_network_acls(&[]), (None, vec![]));
    }

    #[test]
    fn test_flatten_normalises_subnet_ids_and_ips() {
        let rule_set = NetworkRuleSet {
            bypass: Some("AzureServices".into()),
            default_action: Some("Deny".into()),
            ip_rules: Some(vec![IpRule { value: "1.2.3.4/32".into() }]),
            virtual_network_rules: Some(vec![VirtualNetworkRule {
                id: SUBNET.replace("resourceGroups", "resourcegroups").replace("subnets", "Subnets"),
            }]),
        };
        let flattened = flatten_key_vault_network_acls(Some(&rule_set));
        assert_eq!(flattened, acl_block("AzureServices", "Deny", &["1.2.3.4"], &[SUBNET]));
    }

    #[test]
    fn test_virtual_network_names_are_unique() {
        let other = SUBNET.replace("sn1", "sn2");
        let names = virtual_network_names(&[SUBNET.to_string(), other]).unwrap();
        assert_eq!(names, vec!["vnet1".to_string()]);
        assert!(virtual_network_names(&["not-an-id"]).is_err());
    }

    #[test]
    fn test_sku_name_casing() {
        assert_eq!(normalize_sku_name("Standard"), "standard");
        assert_eq!(normalize_sku_name("PREMIUM"), "premium");
        assert_eq!(normalize_sku_name("gold"), "");
    }

    #[test]
    fn test_schema_rejects_bad_acl_action() {
        let schema = KeyVaultResource.schema();
        let mut config = json!({
            "name": "vault1",
            "location": "local",
            "resource_group_name": "rg",
            "sku_name": "standard",
            "tenant_id": "00000000-0000-0000-0000-000000000001",
        });
        schema.validate(config.as_object().unwrap()).unwrap();
        config["network_acls"] = Value::Array(acl_block("AzureServices", "Block", &[], &[]));
        assert!(schema.validate(config.as_object().unwrap()).is_err());
    }
}
