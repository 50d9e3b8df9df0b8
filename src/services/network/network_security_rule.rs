//! `azurestack_network_security_rule` resource.

use super::delete_resource;
use super::network_security_group::{
    expand_security_rule_properties, flatten_security_rule_properties, security_rule_fields,
};
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use crate::ids::SecurityRuleId;
use crate::locks::NETWORK_SECURITY_GROUP_RESOURCE_NAME;
use crate::models::network::SecurityRule;
use crate::schema::{common, Attribute, Resource, ResourceData, Schema, ValueType};
use crate::services::{ensure_not_exists, get_or_clear};
use async_trait::async_trait;
use serde_json::Value;

pub struct NetworkSecurityRuleResource;

impl NetworkSecurityRuleResource {
    async fn create_update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();

        let id = SecurityRuleId::new(
            &client.subscription_id,
            d.get_str("resource_group_name"),
            d.get_str("network_security_group_name"),
            d.get_str("name"),
        );
        if d.is_new_resource() {
            ensure_not_exists(client, &ctx, self.resource_type(), &id.id(), &id, NETWORK_API_VERSION).await?;
        }

        for (single, plural) in [
            ("source_port_range", "source_port_ranges"),
            ("destination_port_range", "destination_port_ranges"),
            ("source_address_prefix", "source_address_prefixes"),
            ("destination_address_prefix", "destination_address_prefixes"),
        ] {
            if d.get_ok(single).is_some() && !d.get_list(plural).is_empty() {
                return Err(Error::Validation(format!("`{single}` conflicts with `{plural}`")));
            }
        }

        let rule = SecurityRule {
            name: Some(id.name.clone()),
            properties: Some(expand_security_rule_properties(d.attributes())),
            ..Default::default()
        };

        let _lock = client
            .locks
            .by_name(&id.network_security_group_name, NETWORK_SECURITY_GROUP_RESOURCE_NAME)
            .await;

        let _: Value = client
            .arm
            .put(&ctx, &id.id(), NETWORK_API_VERSION, &rule)
            .await
            .with_context(|| format!("creating/updating {id}"))?;

        d.set_id(id.id());
        self.read(client, d).await
    }
}

#[async_trait]
impl Resource for NetworkSecurityRuleResource {
    fn resource_type(&self) -> &'static str {
        "azurestack_network_security_rule"
    }

    fn schema(&self) -> Schema {
        security_rule_fields(
            Schema::new()
                .attr("name", Attribute::required(ValueType::String).force_new())
                .attr("resource_group_name", common::resource_group_name())
                .attr(
                    "network_security_group_name",
                    Attribute::required(ValueType::String).force_new(),
                ),
        )
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = SecurityRuleId::parse(d.id())?;

        let Some(rule) = get_or_clear::<SecurityRule>(client, &ctx, d, &id.id(), &id, NETWORK_API_VERSION).await?
        else {
            return Ok(());
        };

        d.set("name", id.name.as_str());
        d.set("resource_group_name", id.resource_group.as_str());
        d.set("network_security_group_name", id.network_security_group_name.as_str());
        if let Some(props) = &rule.properties {
            for (key, value) in flatten_security_rule_properties(props) {
                d.set(&key, value);
            }
        }
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = SecurityRuleId::parse(d.id())?;

        let _lock = client
            .locks
            .by_name(&id.network_security_group_name, NETWORK_SECURITY_GROUP_RESOURCE_NAME)
            .await;
        delete_resource(client, &ctx, &id.id(), &id).await
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        SecurityRuleId::parse(id).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::testing::offline_client;
    use serde_json::json;

    #[tokio::test]
    async fn test_conflicting_port_ranges_are_rejected_before_any_call() {
        let client = offline_client();
        let attrs = json!({
            "name": "rule1",
            "resource_group_name": "rg",
            "network_security_group_name": "nsg1",
            "protocol": "Tcp",
            "source_port_range": "*",
            "destination_port_range": "22",
            "destination_port_ranges": ["22"],
            "access": "Allow",
            "priority": 100,
            "direction": "Inbound",
        });
        let mut d = ResourceData::from_state(
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/networkSecurityGroups/nsg1/securityRules/rule1",
            attrs.as_object().unwrap().clone(),
            serde_json::Map::new(),
        );
        let err = NetworkSecurityRuleResource.update(&client, &mut d).await.unwrap_err();
        assert!(err.to_string().contains("conflicts with `destination_port_ranges`"));
    }

    #[test]
    fn test_schema_has_rule_fields() {
        let schema = NetworkSecurityRuleResource.schema();
        for key in ["protocol", "priority", "direction", "access", "network_security_group_name"] {
            assert!(schema.get(key).is_some(), "missing {key}");
        }
    }
}
