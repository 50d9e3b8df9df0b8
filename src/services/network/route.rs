//! `azurestack_route` resource.

use super::delete_resource;
use super::route_table::{expand_route_properties, NEXT_HOP_TYPES};
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Result, ResultExt};
use crate::ids::RouteId;
use crate::locks::ROUTE_TABLE_RESOURCE_NAME;
use crate::models::network::Route;
use crate::schema::{common, validate, Attribute, Resource, ResourceData, Schema, ValueType};
use crate::services::{ensure_not_exists, get_or_clear};
use async_trait::async_trait;
use serde_json::Value;

pub struct RouteResource;

impl RouteResource {
    async fn create_update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();

        let id = RouteId::new(
            &client.subscription_id,
            d.get_str("resource_group_name"),
            d.get_str("route_table_name"),
            d.get_str("name"),
        );
        if d.is_new_resource() {
            ensure_not_exists(client, &ctx, self.resource_type(), &id.id(), &id, NETWORK_API_VERSION).await?;
        }

        let route = Route {
            name: Some(id.name.clone()),
            properties: Some(expand_route_properties(
                d.get_str("address_prefix"),
                d.get_str("next_hop_type"),
                d.get_str("next_hop_in_ip_address"),
            )),
            ..Default::default()
        };

        let _lock = client
            .locks
            .by_name(&id.route_table_name, ROUTE_TABLE_RESOURCE_NAME)
            .await;

        let _: Value = client
            .arm
            .put(&ctx, &id.id(), NETWORK_API_VERSION, &route)
            .await
            .with_context(|| format!("creating/updating {id}"))?;

        d.set_id(id.id());
        self.read(client, d).await
    }
}

#[async_trait]
impl Resource for RouteResource {
    fn resource_type(&self) -> &'static str {
        "azurestack_route"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::string_is_not_empty),
            )
            .attr("resource_group_name", common::resource_group_name())
            .attr(
                "route_table_name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::string_is_not_empty),
            )
            .attr(
                "address_prefix",
                Attribute::required(ValueType::String).validate(validate::string_is_not_empty),
            )
            .attr(
                "next_hop_type",
                Attribute::required(ValueType::String).validate(validate::string_in_slice(NEXT_HOP_TYPES, true)),
            )
            .attr(
                "next_hop_in_ip_address",
                Attribute::optional(ValueType::String).validate(validate::string_is_not_empty),
            )
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = RouteId::parse(d.id())?;

        let Some(route) = get_or_clear::<Route>(client, &ctx, d, &id.id(), &id, NETWORK_API_VERSION).await? else {
            return Ok(());
        };

        d.set("name", id.name.as_str());
        d.set("resource_group_name", id.resource_group.as_str());
        d.set("route_table_name", id.route_table_name.as_str());
        if let Some(props) = route.properties {
            d.set("address_prefix", props.address_prefix.unwrap_or_default());
            d.set("next_hop_type", props.next_hop_type.unwrap_or_default());
            d.set("next_hop_in_ip_address", props.next_hop_ip_address);
        }
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = RouteId::parse(d.id())?;

        let _lock = client
            .locks
            .by_name(&id.route_table_name, ROUTE_TABLE_RESOURCE_NAME)
            .await;
        delete_resource(client, &ctx, &id.id(), &id).await
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        RouteId::parse(id).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_next_hop_type_validation() {
        let schema = RouteResource.schema();
        let mut attrs = json!({
            "name": "r1",
            "resource_group_name": "rg",
            "route_table_name": "rt",
            "address_prefix": "10.1.0.0/16",
            "next_hop_type": "vnetlocal",
        });
        assert!(schema.validate(attrs.as_object().unwrap()).is_ok());

        attrs["next_hop_type"] = json!("Gateway");
        assert!(schema.validate(attrs.as_object().unwrap()).is_err());
    }
}
