//! `azurestack_subnet` resource and data source.

use super::{delete_resource, require_properties, wait_for_provisioning_state};
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Result, ResultExt};
use crate::ids::{SubnetId, VirtualNetworkId};
use crate::locks::{SUBNET_RESOURCE_NAME, VIRTUAL_NETWORK_RESOURCE_NAME};
use crate::models::network::{Subnet, SubnetProperties};
use crate::models::sub_resource_id;
use crate::schema::{common, validate, Attribute, DataSource, Resource, ResourceData, Schema, ValueType};
use crate::services::{ensure_not_exists, get_existing, get_or_clear};
use crate::timeouts::OperationContext;
use async_trait::async_trait;
use serde_json::Value;

pub struct SubnetResource;

impl SubnetResource {
    /// Both the subnet and its virtual network must settle before the next change.
    async fn wait_for_subnet_and_network(&self, client: &Client, ctx: &OperationContext, id: &SubnetId) -> Result<()> {
        wait_for_provisioning_state(client, ctx, &id.id(), id).await?;

        let vnet_id = VirtualNetworkId::new(&id.subscription_id, &id.resource_group, &id.virtual_network_name);
        wait_for_provisioning_state(client, ctx, &vnet_id.id(), &vnet_id)
            .await
            .with_context(|| format!("waiting for provisioning state of virtual network for {id}"))
    }
}

#[async_trait]
impl Resource for SubnetResource {
    fn resource_type(&self) -> &'static str {
        SUBNET_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr("name", Attribute::required(ValueType::String).force_new())
            .attr("resource_group_name", common::resource_group_name())
            .attr(
                "virtual_network_name",
                Attribute::required(ValueType::String).force_new(),
            )
            .attr(
                "address_prefix",
                Attribute::required(ValueType::String).validate(validate::string_is_not_empty),
            )
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();
        log::info!("[INFO] preparing arguments for Azure ARM Subnet creation.");

        let id = SubnetId::new(
            &client.subscription_id,
            d.get_str("resource_group_name"),
            d.get_str("virtual_network_name"),
            d.get_str("name"),
        );
        ensure_not_exists(client, &ctx, self.resource_type(), &id.id(), &id, NETWORK_API_VERSION).await?;

        let _lock = client
            .locks
            .by_name(&id.virtual_network_name, VIRTUAL_NETWORK_RESOURCE_NAME)
            .await;

        let subnet = Subnet {
            name: Some(id.name.clone()),
            properties: Some(SubnetProperties {
                address_prefix: d.get_ok("address_prefix").and_then(Value::as_str).map(String::from),
                ..Default::default()
            }),
            ..Default::default()
        };
        let _: Value = client
            .arm
            .put(&ctx, &id.id(), NETWORK_API_VERSION, &subnet)
            .await
            .with_context(|| format!("creating {id}"))?;

        self.wait_for_subnet_and_network(client, &ctx, &id).await?;

        d.set_id(id.id());
        self.read(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = SubnetId::parse(d.id())?;

        let Some(subnet) = get_or_clear::<Subnet>(client, &ctx, d, &id.id(), &id, NETWORK_API_VERSION).await? else {
            return Ok(());
        };

        d.set("name", id.name.as_str());
        d.set("virtual_network_name", id.virtual_network_name.as_str());
        d.set("resource_group_name", id.resource_group.as_str());
        if let Some(props) = subnet.properties {
            d.set("address_prefix", props.address_prefix);
        }
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.update_context();
        let id = SubnetId::parse(d.id())?;

        let _vnet_lock = client
            .locks
            .by_name(&id.virtual_network_name, VIRTUAL_NETWORK_RESOURCE_NAME)
            .await;
        let _subnet_lock = client.locks.by_name(&id.name, SUBNET_RESOURCE_NAME).await;

        let existing: Subnet = client
            .arm
            .get(&ctx, &id.id(), NETWORK_API_VERSION)
            .await
            .with_context(|| format!("retrieving {id}"))?;
        let mut props = require_properties(&existing.properties, &id)?.clone();

        if d.has_change("address_prefix") {
            props.address_prefix = Some(d.get_str("address_prefix").to_string());
        }
        // read-only on the wire
        props.provisioning_state = None;
        props.ip_configurations = None;

        let subnet = Subnet {
            name: Some(id.name.clone()),
            properties: Some(props),
            ..Default::default()
        };
        let _: Value = client
            .arm
            .put(&ctx, &id.id(), NETWORK_API_VERSION, &subnet)
            .await
            .with_context(|| format!("updating {id}"))?;

        self.wait_for_subnet_and_network(client, &ctx, &id).await?;

        self.read(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = SubnetId::parse(d.id())?;

        let _vnet_lock = client
            .locks
            .by_name(&id.virtual_network_name, VIRTUAL_NETWORK_RESOURCE_NAME)
            .await;
        let _subnet_lock = client.locks.by_name(&id.name, SUBNET_RESOURCE_NAME).await;

        delete_resource(client, &ctx, &id.id(), &id).await
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        SubnetId::parse(id).map(|_| ())
    }
}

pub struct SubnetDataSource;

#[async_trait]
impl DataSource for SubnetDataSource {
    fn resource_type(&self) -> &'static str {
        SUBNET_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String).validate(validate::string_is_not_empty),
            )
            .attr(
                "virtual_network_name",
                Attribute::required(ValueType::String).validate(validate::string_is_not_empty),
            )
            .attr("resource_group_name", common::resource_group_name_for_data_source())
            .attr("address_prefix", common::computed_string())
            .attr("network_security_group_id", common::computed_string())
            .attr("route_table_id", common::computed_string())
            .attr("ip_configurations", common::computed_strings())
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = SubnetId::new(
            &client.subscription_id,
            d.get_str("resource_group_name"),
            d.get_str("virtual_network_name"),
            d.get_str("name"),
        );

        let subnet: Subnet = get_existing(client, &ctx, &id.id(), &id, NETWORK_API_VERSION).await?;
        d.set_id(id.id());

        d.set("name", id.name.as_str());
        d.set("virtual_network_name", id.virtual_network_name.as_str());
        d.set("resource_group_name", id.resource_group.as_str());
        if let Some(props) = subnet.properties {
            d.set("address_prefix", props.address_prefix.unwrap_or_default());
            d.set("network_security_group_id", sub_resource_id(&props.network_security_group));
            d.set("route_table_id", sub_resource_id(&props.route_table));
            let ip_configurations: Vec<String> = props
                .ip_configurations
                .unwrap_or_default()
                .into_iter()
                .filter_map(|c| c.id)
                .collect();
            d.set("ip_configurations", ip_configurations);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_requires_address_prefix() {
        let schema = SubnetResource.schema();
        let attrs = json!({
            "name": "subnet1",
            "resource_group_name": "rg",
            "virtual_network_name": "vnet1",
        });
        assert!(schema.validate(attrs.as_object().unwrap()).is_err());

        let attrs = json!({
            "name": "subnet1",
            "resource_group_name": "rg",
            "virtual_network_name": "vnet1",
            "address_prefix": "10.0.1.0/24",
        });
        assert!(schema.validate(attrs.as_object().unwrap()).is_ok());
    }

    #[test]
    fn test_validate_import_id() {
        let resource = SubnetResource;
        assert!(resource
            .validate_import_id("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v/subnets/s1")
            .is_ok());
        assert!(resource
            .validate_import_id("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v")
            .is_err());
    }
}
