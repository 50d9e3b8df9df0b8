//! `azurestack_route_table` resource.

use super::{block_str, delete_resource};
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Result, ResultExt};
use crate::ids::RouteTableId;
use crate::locks::ROUTE_TABLE_RESOURCE_NAME;
use crate::models::network::{Route, RouteProperties, RouteTable, RouteTableProperties};
use crate::models::{expand_tags, flatten_tags, normalize_location, SubResource};
use crate::schema::{common, validate, Attribute, Resource, ResourceData, Schema, ValueType};
use crate::services::{ensure_not_exists, get_or_clear};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const NEXT_HOP_TYPES: &[&str] = &[
    "VirtualNetworkGateway",
    "VnetLocal",
    "Internet",
    "VirtualAppliance",
    "None",
];

pub fn expand_route_properties(address_prefix: &str, next_hop_type: &str, next_hop_in_ip_address: &str) -> RouteProperties {
    RouteProperties {
        address_prefix: Some(address_prefix.to_string()),
        next_hop_type: Some(next_hop_type.to_string()),
        next_hop_ip_address: (!next_hop_in_ip_address.is_empty()).then(|| next_hop_in_ip_address.to_string()),
        provisioning_state: None,
    }
}

pub fn expand_route_table_routes(input: &[Value]) -> Vec<Route> {
    input
        .iter()
        .filter_map(Value::as_object)
        .map(|block| Route {
            name: Some(block_str(block, "name").to_string()),
            properties: Some(expand_route_properties(
                block_str(block, "address_prefix"),
                block_str(block, "next_hop_type"),
                block_str(block, "next_hop_in_ip_address"),
            )),
            ..Default::default()
        })
        .collect()
}

pub fn flatten_route_table_routes(input: Option<&Vec<Route>>) -> Vec<Value> {
    input
        .into_iter()
        .flatten()
        .map(|route| {
            let mut block = json!({ "name": route.name.clone().unwrap_or_default() });
            if let Some(props) = &route.properties {
                block["address_prefix"] = json!(props.address_prefix.clone().unwrap_or_default());
                block["next_hop_type"] = json!(props.next_hop_type.clone().unwrap_or_default());
                if let Some(ip) = &props.next_hop_ip_address {
                    block["next_hop_in_ip_address"] = json!(ip);
                }
            }
            block
        })
        .collect()
}

fn flatten_route_table_subnets(input: Option<&Vec<SubResource>>) -> Vec<String> {
    input
        .into_iter()
        .flatten()
        .filter_map(|s| s.id.clone())
        .collect()
}

fn route_block() -> Schema {
    Schema::new()
        .attr(
            "name",
            Attribute::required(ValueType::String).validate(validate::string_is_not_empty),
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

pub struct RouteTableResource;

impl RouteTableResource {
    async fn create_update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();
        log::info!("[INFO] preparing arguments for azurestack Route Table creation.");

        let id = RouteTableId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));
        if d.is_new_resource() {
            ensure_not_exists(client, &ctx, self.resource_type(), &id.id(), &id, NETWORK_API_VERSION).await?;
        }

        let table = RouteTable {
            name: Some(id.name.clone()),
            location: Some(normalize_location(d.get_str("location"))),
            tags: expand_tags(d.get("tags")),
            properties: Some(RouteTableProperties {
                routes: Some(expand_route_table_routes(d.get_list("route"))),
                disable_bgp_route_propagation: Some(d.get_bool("disable_bgp_route_propagation")),
                ..Default::default()
            }),
            ..Default::default()
        };

        let _lock = client.locks.by_name(&id.name, ROUTE_TABLE_RESOURCE_NAME).await;

        let _: Value = client
            .arm
            .put(&ctx, &id.id(), NETWORK_API_VERSION, &table)
            .await
            .with_context(|| format!("creating/updating {id}"))?;

        d.set_id(id.id());
        self.read(client, d).await
    }
}

#[async_trait]
impl Resource for RouteTableResource {
    fn resource_type(&self) -> &'static str {
        ROUTE_TABLE_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
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
                "route",
                Attribute::optional_computed(ValueType::List).block(route_block()),
            )
            .attr(
                "disable_bgp_route_propagation",
                Attribute::optional(ValueType::Bool).default(false),
            )
            .attr("subnets", common::computed_strings())
            .attr("tags", common::tags())
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = RouteTableId::parse(d.id())?;

        let Some(table) = get_or_clear::<RouteTable>(client, &ctx, d, &id.id(), &id, NETWORK_API_VERSION).await?
        else {
            return Ok(());
        };

        d.set("name", id.name.as_str());
        d.set("resource_group_name", id.resource_group.as_str());
        d.set("location", normalize_location(table.location.as_deref().unwrap_or_default()));
        if let Some(props) = &table.properties {
            d.set(
                "disable_bgp_route_propagation",
                props.disable_bgp_route_propagation.unwrap_or_default(),
            );
            d.set("route", flatten_route_table_routes(props.routes.as_ref()));
            d.set("subnets", flatten_route_table_subnets(props.subnets.as_ref()));
        }
        d.set("tags", flatten_tags(table.tags.as_ref()));
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = RouteTableId::parse(d.id())?;

        let _lock = client.locks.by_name(&id.name, ROUTE_TABLE_RESOURCE_NAME).await;
        delete_resource(client, &ctx, &id.id(), &id).await
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        RouteTableId::parse(id).map(|_| ())
    }
}
