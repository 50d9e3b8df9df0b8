//! `azurestack_network_security_group` resource and data source.
//!
//! Inline `security_rule` blocks share their expand/flatten with the
//! standalone `azurestack_network_security_rule` resource.

use super::{block_i64, block_str, block_strings, delete_resource};
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use crate::ids::NetworkSecurityGroupId;
use crate::locks::NETWORK_SECURITY_GROUP_RESOURCE_NAME;
use crate::models::network::{
    NetworkSecurityGroup, NetworkSecurityGroupProperties, SecurityRule, SecurityRuleProperties,
};
use crate::models::{expand_tags, flatten_tags, normalize_location};
use crate::schema::{common, validate, Attribute, DataSource, Resource, ResourceData, Schema, ValueType};
use crate::services::{ensure_not_exists, get_existing, get_or_clear};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub const PROTOCOLS: &[&str] = &["*", "Tcp", "Udp"];
pub const ACCESS: &[&str] = &["Allow", "Deny"];
pub const DIRECTIONS: &[&str] = &["Inbound", "Outbound"];

fn description_length(value: &Value, path: &str) -> std::result::Result<(), String> {
    let s = value.as_str().unwrap_or_default();
    if s.chars().count() > 140 {
        return Err(format!("expected length of {path} to be in the range (0 - 140), got {s}"));
    }
    Ok(())
}

fn string_set() -> Attribute {
    Attribute::optional(ValueType::Set).elem(Attribute::optional(ValueType::String))
}

/// Fields shared by the inline block and the standalone rule resource.
pub fn security_rule_fields(schema: Schema) -> Schema {
    schema
        .attr(
            "description",
            Attribute::optional(ValueType::String).validate(description_length),
        )
        .attr(
            "protocol",
            Attribute::required(ValueType::String).validate(validate::string_in_slice(PROTOCOLS, true)),
        )
        .attr("source_port_range", Attribute::optional(ValueType::String))
        .attr("source_port_ranges", string_set())
        .attr("destination_port_range", Attribute::optional(ValueType::String))
        .attr("destination_port_ranges", string_set())
        .attr("source_address_prefix", Attribute::optional(ValueType::String))
        .attr("source_address_prefixes", string_set())
        .attr("destination_address_prefix", Attribute::optional(ValueType::String))
        .attr("destination_address_prefixes", string_set())
        .attr(
            "access",
            Attribute::required(ValueType::String).validate(validate::string_in_slice(ACCESS, true)),
        )
        .attr(
            "priority",
            Attribute::required(ValueType::Int).validate(validate::int_between(100, 4096)),
        )
        .attr(
            "direction",
            Attribute::required(ValueType::String).validate(validate::string_in_slice(DIRECTIONS, true)),
        )
}

fn security_rule_block_computed() -> Schema {
    let mut schema = Schema::new().attr("name", common::computed_string());
    for key in [
        "description",
        "protocol",
        "source_port_range",
        "destination_port_range",
        "source_address_prefix",
        "destination_address_prefix",
        "access",
        "direction",
    ] {
        schema = schema.attr(key, common::computed_string());
    }
    for key in [
        "source_port_ranges",
        "destination_port_ranges",
        "source_address_prefixes",
        "destination_address_prefixes",
    ] {
        schema = schema.attr(key, common::computed_strings());
    }
    schema.attr("priority", common::computed_int())
}

/// A singular field and its plural counterpart are mutually exclusive.
fn check_conflicts(block: &Map<String, Value>, path: &str) -> Result<()> {
    for (single, plural) in [
        ("source_port_range", "source_port_ranges"),
        ("destination_port_range", "destination_port_ranges"),
        ("source_address_prefix", "source_address_prefixes"),
        ("destination_address_prefix", "destination_address_prefixes"),
    ] {
        if !block_str(block, single).is_empty() && !block_strings(block, plural).is_empty() {
            return Err(Error::Validation(format!(
                "{path}: `{single}` conflicts with `{plural}`"
            )));
        }
    }
    Ok(())
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Rule properties from a rule block (or the rule resource's attributes).
pub fn expand_security_rule_properties(block: &Map<String, Value>) -> SecurityRuleProperties {
    let description = block_str(block, "description");
    SecurityRuleProperties {
        description: (!description.is_empty()).then(|| description.to_string()),
        protocol: Some(block_str(block, "protocol").to_string()),
        source_port_range: Some(block_str(block, "source_port_range").to_string()),
        source_port_ranges: non_empty(block_strings(block, "source_port_ranges")),
        destination_port_range: Some(block_str(block, "destination_port_range").to_string()),
        destination_port_ranges: non_empty(block_strings(block, "destination_port_ranges")),
        source_address_prefix: Some(block_str(block, "source_address_prefix").to_string()),
        source_address_prefixes: non_empty(block_strings(block, "source_address_prefixes")),
        destination_address_prefix: Some(block_str(block, "destination_address_prefix").to_string()),
        destination_address_prefixes: non_empty(block_strings(block, "destination_address_prefixes")),
        access: Some(block_str(block, "access").to_string()),
        priority: block_i64(block, "priority"),
        direction: Some(block_str(block, "direction").to_string()),
        provisioning_state: None,
    }
}

pub fn expand_network_security_rules(input: &[Value]) -> Result<Vec<SecurityRule>> {
    let mut rules = Vec::with_capacity(input.len());
    for (i, block) in input.iter().filter_map(Value::as_object).enumerate() {
        check_conflicts(block, &format!("security_rule.{i}"))?;
        rules.push(SecurityRule {
            name: Some(block_str(block, "name").to_string()),
            properties: Some(expand_security_rule_properties(block)),
            ..Default::default()
        });
    }
    Ok(rules)
}

/// Rule properties as attributes, without the rule name.
pub fn flatten_security_rule_properties(props: &SecurityRuleProperties) -> Map<String, Value> {
    let strings = |v: &Option<Vec<String>>| v.clone().unwrap_or_default();
    let value = json!({
        "description": props.description.clone().unwrap_or_default(),
        "protocol": props.protocol.clone().unwrap_or_default(),
        "source_port_range": props.source_port_range.clone().unwrap_or_default(),
        "source_port_ranges": strings(&props.source_port_ranges),
        "destination_port_range": props.destination_port_range.clone().unwrap_or_default(),
        "destination_port_ranges": strings(&props.destination_port_ranges),
        "source_address_prefix": props.source_address_prefix.clone().unwrap_or_default(),
        "source_address_prefixes": strings(&props.source_address_prefixes),
        "destination_address_prefix": props.destination_address_prefix.clone().unwrap_or_default(),
        "destination_address_prefixes": strings(&props.destination_address_prefixes),
        "access": props.access.clone().unwrap_or_default(),
        "priority": props.priority.unwrap_or_default(),
        "direction": props.direction.clone().unwrap_or_default(),
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn flatten_network_security_rules(input: Option<&Vec<SecurityRule>>) -> Vec<Value> {
    input
        .into_iter()
        .flatten()
        .map(|rule| {
            let mut block = rule
                .properties
                .as_ref()
                .map(flatten_security_rule_properties)
                .unwrap_or_default();
            block.insert("name".to_string(), json!(rule.name.clone().unwrap_or_default()));
            Value::Object(block)
        })
        .collect()
}

pub struct NetworkSecurityGroupResource;

impl NetworkSecurityGroupResource {
    async fn create_update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();
        log::info!("[INFO] preparing arguments for Network Security Group creation.");

        let id = NetworkSecurityGroupId::new(
            &client.subscription_id,
            d.get_str("resource_group_name"),
            d.get_str("name"),
        );
        if d.is_new_resource() {
            ensure_not_exists(client, &ctx, self.resource_type(), &id.id(), &id, NETWORK_API_VERSION).await?;
        }

        let rules = expand_network_security_rules(d.get_list("security_rule"))?;
        let group = NetworkSecurityGroup {
            name: Some(id.name.clone()),
            location: Some(normalize_location(d.get_str("location"))),
            tags: expand_tags(d.get("tags")),
            properties: Some(NetworkSecurityGroupProperties {
                security_rules: Some(rules),
                ..Default::default()
            }),
            ..Default::default()
        };

        let _lock = client
            .locks
            .by_name(&id.name, NETWORK_SECURITY_GROUP_RESOURCE_NAME)
            .await;

        let _: Value = client
            .arm
            .put(&ctx, &id.id(), NETWORK_API_VERSION, &group)
            .await
            .with_context(|| format!("creating/updating {id}"))?;

        d.set_id(id.id());
        self.read(client, d).await
    }
}

#[async_trait]
impl Resource for NetworkSecurityGroupResource {
    fn resource_type(&self) -> &'static str {
        NETWORK_SECURITY_GROUP_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        let rule = security_rule_fields(Schema::new().attr(
            "name",
            Attribute::required(ValueType::String).validate(validate::string_is_not_empty),
        ));
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::string_is_not_empty),
            )
            .attr("location", common::location())
            .attr("resource_group_name", common::resource_group_name())
            .attr(
                "security_rule",
                Attribute::optional_computed(ValueType::Set).block(rule),
            )
            .attr("tags", common::tags())
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = NetworkSecurityGroupId::parse(d.id())?;

        let Some(group) =
            get_or_clear::<NetworkSecurityGroup>(client, &ctx, d, &id.id(), &id, NETWORK_API_VERSION).await?
        else {
            return Ok(());
        };

        d.set("name", id.name.as_str());
        d.set("resource_group_name", id.resource_group.as_str());
        d.set("location", normalize_location(group.location.as_deref().unwrap_or_default()));
        if let Some(props) = &group.properties {
            d.set("security_rule", flatten_network_security_rules(props.security_rules.as_ref()));
        }
        d.set("tags", flatten_tags(group.tags.as_ref()));
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = NetworkSecurityGroupId::parse(d.id())?;

        let _lock = client
            .locks
            .by_name(&id.name, NETWORK_SECURITY_GROUP_RESOURCE_NAME)
            .await;
        delete_resource(client, &ctx, &id.id(), &id).await
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        NetworkSecurityGroupId::parse(id).map(|_| ())
    }
}

pub struct NetworkSecurityGroupDataSource;

#[async_trait]
impl DataSource for NetworkSecurityGroupDataSource {
    fn resource_type(&self) -> &'static str {
        NETWORK_SECURITY_GROUP_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr("name", Attribute::required(ValueType::String))
            .attr("resource_group_name", common::resource_group_name_for_data_source())
            .attr("location", common::location_computed())
            .attr(
                "security_rule",
                Attribute::computed(ValueType::List).block(security_rule_block_computed()),
            )
            .attr("tags", common::tags_computed())
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = NetworkSecurityGroupId::new(
            &client.subscription_id,
            d.get_str("resource_group_name"),
            d.get_str("name"),
        );

        let group: NetworkSecurityGroup = get_existing(client, &ctx, &id.id(), &id, NETWORK_API_VERSION).await?;
        if group.id.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::Validation(format!("reading request on {id}: `id` was empty")));
        }
        d.set_id(id.id());

        d.set("name", group.name.clone().unwrap_or_default());
        d.set("resource_group_name", id.resource_group.as_str());
        d.set("location", normalize_location(group.location.as_deref().unwrap_or_default()));
        if let Some(props) = &group.properties {
            d.set("security_rule", flatten_network_security_rules(props.security_rules.as_ref()));
        }
        d.set("tags", flatten_tags(group.tags.as_ref()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_block() -> Value {
        json!({
            "name": "ssh",
            "description": "allow ssh",
            "protocol": "Tcp",
            "source_port_range": "*",
            "source_port_ranges": [],
            "destination_port_range": "",
            "destination_port_ranges": ["22", "2222"],
            "source_address_prefix": "*",
            "source_address_prefixes": [],
            "destination_address_prefix": "VirtualNetwork",
            "destination_address_prefixes": [],
            "access": "Allow",
            "priority": 100,
            "direction": "Inbound",
        })
    }

    #[test]
    fn test_security_rules_round_trip() {
        let blocks = vec![rule_block()];
        let rules = expand_network_security_rules(&blocks).unwrap();
        let props = rules[0].properties.as_ref().unwrap();
        assert_eq!(props.priority, Some(100));
        assert!(props.source_port_ranges.is_none());
        assert_eq!(
            props.destination_port_ranges.as_deref(),
            Some(&["22".to_string(), "2222".to_string()][..])
        );
        assert_eq!(flatten_network_security_rules(Some(&rules)), blocks);
    }

    #[test]
    fn test_singular_and_plural_conflict() {
        let mut block = rule_block();
        block["destination_port_range"] = json!("22");
        let err = expand_network_security_rules(&[block]).unwrap_err();
        assert!(err.to_string().contains("`destination_port_range` conflicts with `destination_port_ranges`"));
    }

    #[test]
    fn test_schema_rejects_invalid_priority_and_protocol() {
        let schema = NetworkSecurityGroupResource.schema();
        let mut block = rule_block();
        block["priority"] = json!(5000);
        block["protocol"] = json!("Icmp");
        let attrs = json!({
            "name": "nsg",
            "location": "local",
            "resource_group_name": "rg",
            "security_rule": [block],
        });
        let err = schema.validate(attrs.as_object().unwrap()).unwrap_err().to_string();
        assert!(err.contains("priority"), "{err}");
        assert!(err.contains("protocol"), "{err}");
    }

    #[test]
    fn test_protocol_is_case_insensitive() {
        let schema = NetworkSecurityGroupResource.schema();
        let mut block = rule_block();
        block["protocol"] = json!("tcp");
        let attrs = json!({
            "name": "nsg",
            "location": "local",
            "resource_group_name": "rg",
            "security_rule": [block],
        });
        assert!(schema.validate(attrs.as_object().unwrap()).is_ok());
    }
}
