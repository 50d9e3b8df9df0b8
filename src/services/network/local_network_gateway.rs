//! `azurestack_local_network_gateway` resource and data source.

use super::{block_i64, block_str, delete_resource};
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Result, ResultExt};
use crate::ids::LocalNetworkGatewayId;
use crate::models::network::{AddressSpace, BgpSettings, LocalNetworkGateway, LocalNetworkGatewayProperties};
use crate::models::{expand_tags, flatten_tags, normalize_location};
use crate::schema::{common, validate, Attribute, DataSource, Resource, ResourceData, Schema, ValueType};
use crate::services::{ensure_not_exists, get_existing, get_or_clear};
use async_trait::async_trait;
use serde_json::{json, Value};

const RESOURCE_TYPE: &str = "azurestack_local_network_gateway";

pub fn expand_local_network_gateway_bgp_settings(input: &[Value]) -> Option<BgpSettings> {
    let block = input.first()?.as_object()?;
    Some(BgpSettings {
        asn: block_i64(block, "asn"),
        bgp_peering_address: Some(block_str(block, "bgp_peering_address").to_string()),
        peer_weight: block_i64(block, "peer_weight"),
    })
}

pub fn flatten_local_network_gateway_bgp_settings(input: Option<&BgpSettings>) -> Vec<Value> {
    let Some(settings) = input else {
        return Vec::new();
    };
    vec![json!({
        "asn": settings.asn.unwrap_or_default(),
        "bgp_peering_address": settings.bgp_peering_address.clone().unwrap_or_default(),
        "peer_weight": settings.peer_weight.unwrap_or_default(),
    })]
}

fn flatten_address_prefixes(input: Option<&AddressSpace>) -> Vec<String> {
    input
        .and_then(|space| space.address_prefixes.clone())
        .unwrap_or_default()
}

fn flatten_local_network_gateway(d: &mut ResourceData, gateway: &LocalNetworkGateway) {
    d.set("location", normalize_location(gateway.location.as_deref().unwrap_or_default()));
    if let Some(props) = &gateway.properties {
        d.set("gateway_address", props.gateway_ip_address.clone().unwrap_or_default());
        d.set(
            "address_space",
            flatten_address_prefixes(props.local_network_address_space.as_ref()),
        );
        d.set(
            "bgp_settings",
            flatten_local_network_gateway_bgp_settings(props.bgp_settings.as_ref()),
        );
    }
    d.set("tags", flatten_tags(gateway.tags.as_ref()));
}

fn bgp_settings_block() -> Schema {
    Schema::new()
        .attr("asn", Attribute::required(ValueType::Int))
        .attr(
            "bgp_peering_address",
            Attribute::required(ValueType::String).validate(validate::string_is_not_empty),
        )
        .attr("peer_weight", Attribute::optional_computed(ValueType::Int))
}

pub struct LocalNetworkGatewayResource;

impl LocalNetworkGatewayResource {
    async fn create_update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();

        let id = LocalNetworkGatewayId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));
        if d.is_new_resource() {
            ensure_not_exists(client, &ctx, self.resource_type(), &id.id(), &id, NETWORK_API_VERSION).await?;
        }

        let mut gateway = LocalNetworkGateway {
            name: Some(id.name.clone()),
            location: Some(normalize_location(d.get_str("location"))),
            tags: expand_tags(d.get("tags")),
            properties: Some(LocalNetworkGatewayProperties {
                gateway_ip_address: Some(d.get_str("gateway_address").to_string()),
                local_network_address_space: Some(AddressSpace {
                    address_prefixes: Some(Vec::new()),
                }),
                bgp_settings: expand_local_network_gateway_bgp_settings(d.get_list("bgp_settings")),
                ..Default::default()
            }),
            ..Default::default()
        };

        // the API rejects an in-place change of the address space; it has to be emptied first
        if !d.is_new_resource() && d.has_change("address_space") {
            log::debug!("[DEBUG] clearing the address space of {id} before updating it");
            let _: Value = client
                .arm
                .put(&ctx, &id.id(), NETWORK_API_VERSION, &gateway)
                .await
                .with_context(|| format!("removing the address space of {id}"))?;
        }

        if let Some(props) = gateway.properties.as_mut() {
            props.local_network_address_space = Some(AddressSpace {
                address_prefixes: Some(d.get_strings("address_space")),
            });
        }
        let _: Value = client
            .arm
            .put(&ctx, &id.id(), NETWORK_API_VERSION, &gateway)
            .await
            .with_context(|| format!("creating/updating {id}"))?;

        d.set_id(id.id());
        self.read(client, d).await
    }
}

#[async_trait]
impl Resource for LocalNetworkGatewayResource {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
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
                "gateway_address",
                Attribute::required(ValueType::String).validate(validate::string_is_not_empty),
            )
            .attr("address_space", common::optional_strings())
            .attr(
                "bgp_settings",
                Attribute::optional(ValueType::List)
                    .max_items(1)
                    .block(bgp_settings_block()),
            )
            .attr("tags", common::tags())
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = LocalNetworkGatewayId::parse(d.id())?;

        let Some(gateway) =
            get_or_clear::<LocalNetworkGateway>(client, &ctx, d, &id.id(), &id, NETWORK_API_VERSION).await?
        else {
            return Ok(());
        };

        d.set("name", id.name.as_str());
        d.set("resource_group_name", id.resource_group.as_str());
        flatten_local_network_gateway(d, &gateway);
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = LocalNetworkGatewayId::parse(d.id())?;
        delete_resource(client, &ctx, &id.id(), &id).await
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        LocalNetworkGatewayId::parse(id).map(|_| ())
    }
}

pub struct LocalNetworkGatewayDataSource;

#[async_trait]
impl DataSource for LocalNetworkGatewayDataSource {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String).validate(validate::string_is_not_empty),
            )
            .attr("resource_group_name", common::resource_group_name_for_data_source())
            .attr("location", common::location_computed())
            .attr("gateway_address", common::computed_string())
            .attr("address_space", common::computed_strings())
            .attr(
                "bgp_settings",
                Attribute::computed(ValueType::List).block(
                    Schema::new()
                        .attr("asn", common::computed_int())
                        .attr("bgp_peering_address", common::computed_string())
                        .attr("peer_weight", common::computed_int()),
                ),
            )
            .attr("tags", common::tags_computed())
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = LocalNetworkGatewayId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));

        let gateway: LocalNetworkGateway = get_existing(client, &ctx, &id.id(), &id, NETWORK_API_VERSION).await?;
        d.set_id(id.id());
        flatten_local_network_gateway(d, &gateway);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgp_settings_round_trip() {
        let blocks = vec![json!({"asn": 65010, "bgp_peering_address": "10.51.255.254", "peer_weight": 0})];
        let settings = expand_local_network_gateway_bgp_settings(&blocks).unwrap();
        assert_eq!(settings.asn, Some(65010));
        assert_eq!(flatten_local_network_gateway_bgp_settings(Some(&settings)), blocks);
    }

    #[test]
    fn test_bgp_settings_absent() {
        assert!(expand_local_network_gateway_bgp_settings(&[]).is_none());
        assert!(flatten_local_network_gateway_bgp_settings(None).is_empty());
    }

    #[test]
    fn test_flatten_gateway() {
        let gateway: LocalNetworkGateway = serde_json::from_value(json!({
            "location": "local",
            "tags": {"env": "test"},
            "properties": {
                "gatewayIpAddress": "168.62.225.23",
                "localNetworkAddressSpace": {"addressPrefixes": ["10.1.1.0/24"]}
            }
        }))
        .unwrap();
        let mut d = ResourceData::from_id("id");
        flatten_local_network_gateway(&mut d, &gateway);
        assert_eq!(d.get_str("gateway_address"), "168.62.225.23");
        assert_eq!(d.get_strings("address_space"), vec!["10.1.1.0/24"]);
        assert!(d.get_list("bgp_settings").is_empty());
        assert_eq!(d.get("tags"), Some(&json!({"env": "test"})));
    }

    #[test]
    fn test_bgp_settings_allows_one_block() {
        let schema = LocalNetworkGatewayResource.schema();
        let block = json!({"asn": 1, "bgp_peering_address": "10.0.0.1"});
        let attrs = json!({
            "name": "lng",
            "location": "local",
            "resource_group_name": "rg",
            "gateway_address": "1.2.3.4",
            "bgp_settings": [block.clone(), block],
        });
        assert!(schema.validate(attrs.as_object().unwrap()).is_err());
    }
}
