//! `azurestack_virtual_network` resource and data source.

use super::{block_str, delete_resource, wait_for_provisioning_state};
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Result, ResultExt};
use crate::ids::{NetworkSecurityGroupId, VirtualNetworkId};
use crate::locks::{NETWORK_SECURITY_GROUP_RESOURCE_NAME, VIRTUAL_NETWORK_RESOURCE_NAME};
use crate::models::network::{
    AddressSpace, DhcpOptions, Subnet, SubnetProperties, VirtualNetwork, VirtualNetworkPeering,
    VirtualNetworkProperties,
};
use crate::models::{expand_tags, flatten_tags, normalize_location, sub_resource_id, SubResource};
use crate::schema::{common, validate, Attribute, DataSource, Resource, ResourceData, Schema, ValueType};
use crate::services::{ensure_not_exists, get_existing, get_or_clear};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub fn expand_address_space(prefixes: Vec<String>) -> AddressSpace {
    AddressSpace {
        address_prefixes: Some(prefixes),
    }
}

pub fn flatten_address_space(input: Option<&AddressSpace>) -> Vec<String> {
    input
        .and_then(|space| space.address_prefixes.clone())
        .unwrap_or_default()
}

/// Inline `subnet` blocks.
pub fn expand_virtual_network_subnets(input: &[Value]) -> Vec<Subnet> {
    input
        .iter()
        .filter_map(Value::as_object)
        .map(|block| {
            let security_group = block_str(block, "security_group");
            Subnet {
                name: Some(block_str(block, "name").to_string()),
                properties: Some(SubnetProperties {
                    address_prefix: Some(block_str(block, "address_prefix").to_string()),
                    network_security_group: SubResource::from_optional(security_group),
                    ..Default::default()
                }),
                ..Default::default()
            }
        })
        .collect()
}

pub fn flatten_virtual_network_subnets(input: Option<&Vec<Subnet>>) -> Vec<Value> {
    input
        .into_iter()
        .flatten()
        .map(|subnet| {
            let props = subnet.properties.clone().unwrap_or_default();
            json!({
                "id": subnet.id.clone().unwrap_or_default(),
                "name": subnet.name.clone().unwrap_or_default(),
                "address_prefix": props.address_prefix.unwrap_or_default(),
                "security_group": sub_resource_id(&props.network_security_group),
            })
        })
        .collect()
}

/// Names of the security groups referenced by inline subnets, without duplicates.
fn network_security_group_names(input: &[Value]) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for block in input.iter().filter_map(Value::as_object) {
        let raw = block_str(block, "security_group");
        if raw.is_empty() {
            continue;
        }
        let id = NetworkSecurityGroupId::parse_insensitively(raw)?;
        if !names.contains(&id.name) {
            names.push(id.name);
        }
    }
    Ok(names)
}

fn flatten_peerings(input: Option<&Vec<VirtualNetworkPeering>>) -> Map<String, Value> {
    let mut output = Map::new();
    for peering in input.into_iter().flatten() {
        let remote = peering
            .properties
            .as_ref()
            .and_then(|p| p.remote_virtual_network.as_ref())
            .and_then(|r| r.id.clone());
        if let (Some(name), Some(remote)) = (peering.name.clone(), remote) {
            output.insert(name, Value::String(remote));
        }
    }
    output
}

fn subnet_block() -> Schema {
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
            "security_group",
            Attribute::optional(ValueType::String).validate(validate::resource_id_or_empty),
        )
        .attr("id", common::computed_string())
}

pub struct VirtualNetworkResource;

impl VirtualNetworkResource {
    async fn create_update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();
        log::info!("[INFO] preparing arguments for Azure ARM virtual network creation.");

        let id = VirtualNetworkId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));
        if d.is_new_resource() {
            ensure_not_exists(client, &ctx, self.resource_type(), &id.id(), &id, NETWORK_API_VERSION).await?;
        }

        let subnets = d.get_list("subnet");
        let nsg_names = network_security_group_names(subnets)?;
        let vnet = VirtualNetwork {
            name: Some(id.name.clone()),
            location: Some(normalize_location(d.get_str("location"))),
            tags: expand_tags(d.get("tags")),
            properties: Some(VirtualNetworkProperties {
                address_space: Some(expand_address_space(d.get_strings("address_space"))),
                dhcp_options: Some(DhcpOptions {
                    dns_servers: Some(d.get_strings("dns_servers")),
                }),
                subnets: Some(expand_virtual_network_subnets(subnets)),
                ..Default::default()
            }),
            ..Default::default()
        };

        let _lock = client.locks.by_name(&id.name, VIRTUAL_NETWORK_RESOURCE_NAME).await;
        let _nsg_locks = client
            .locks
            .multiple_by_name(&nsg_names, NETWORK_SECURITY_GROUP_RESOURCE_NAME)
            .await;

        let _: Value = client
            .arm
            .put(&ctx, &id.id(), NETWORK_API_VERSION, &vnet)
            .await
            .with_context(|| format!("creating/updating {id}"))?;

        wait_for_provisioning_state(client, &ctx, &id.id(), &id).await?;

        d.set_id(id.id());
        self.read(client, d).await
    }
}

#[async_trait]
impl Resource for VirtualNetworkResource {
    fn resource_type(&self) -> &'static str {
        VIRTUAL_NETWORK_RESOURCE_NAME
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
            .attr("location", common::location())
            .attr(
                "address_space",
                Attribute::required(ValueType::List)
                    .min_items(1)
                    .elem(Attribute::required(ValueType::String).validate(validate::string_is_not_empty)),
            )
            .attr(
                "dns_servers",
                Attribute::optional(ValueType::List)
                    .elem(Attribute::optional(ValueType::String).validate(validate::string_is_not_empty)),
            )
            .attr(
                "subnet",
                Attribute::optional_computed(ValueType::Set).block(subnet_block()),
            )
            .attr("guid", common::computed_string())
            .attr("tags", common::tags())
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = VirtualNetworkId::parse(d.id())?;

        let Some(vnet) =
            get_or_clear::<VirtualNetwork>(client, &ctx, d, &id.id(), &id, NETWORK_API_VERSION).await?
        else {
            return Ok(());
        };

        d.set("name", id.name.as_str());
        d.set("resource_group_name", id.resource_group.as_str());
        d.set("location", normalize_location(vnet.location.as_deref().unwrap_or_default()));

        if let Some(props) = &vnet.properties {
            d.set("guid", props.resource_guid.clone().unwrap_or_default());
            d.set("address_space", flatten_address_space(props.address_space.as_ref()));
            let dns_servers = props
                .dhcp_options
                .as_ref()
                .and_then(|o| o.dns_servers.clone())
                .unwrap_or_default();
            d.set("dns_servers", dns_servers);
            d.set("subnet", flatten_virtual_network_subnets(props.subnets.as_ref()));
        }
        d.set("tags", flatten_tags(vnet.tags.as_ref()));
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = VirtualNetworkId::parse(d.id())?;

        let nsg_names = network_security_group_names(d.get_list("subnet"))?;
        let _lock = client.locks.by_name(&id.name, VIRTUAL_NETWORK_RESOURCE_NAME).await;
        let _nsg_locks = client
            .locks
            .multiple_by_name(&nsg_names, NETWORK_SECURITY_GROUP_RESOURCE_NAME)
            .await;

        delete_resource(client, &ctx, &id.id(), &id).await
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        VirtualNetworkId::parse(id).map(|_| ())
    }
}

pub struct VirtualNetworkDataSource;

#[async_trait]
impl DataSource for VirtualNetworkDataSource {
    fn resource_type(&self) -> &'static str {
        VIRTUAL_NETWORK_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String).validate(validate::string_is_not_empty),
            )
            .attr("resource_group_name", common::resource_group_name_for_data_source())
            .attr("location", common::location_computed())
            .attr("address_space", common::computed_strings())
            .attr("dns_servers", common::computed_strings())
            .attr("guid", common::computed_string())
            .attr("subnets", common::computed_strings())
            .attr(
                "vnet_peerings",
                Attribute::computed(ValueType::Map).elem(Attribute::computed(ValueType::String)),
            )
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = VirtualNetworkId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));

        let vnet: VirtualNetwork = get_existing(client, &ctx, &id.id(), &id, NETWORK_API_VERSION).await?;
        d.set_id(id.id());
        d.set("location", normalize_location(vnet.location.as_deref().unwrap_or_default()));

        if let Some(props) = vnet.properties {
            d.set("guid", props.resource_guid.unwrap_or_default());
            d.set("address_space", flatten_address_space(props.address_space.as_ref()));
            d.set(
                "dns_servers",
                props.dhcp_options.and_then(|o| o.dns_servers).unwrap_or_default(),
            );
            let subnet_names: Vec<String> = props
                .subnets
                .iter()
                .flatten()
                .filter_map(|s| s.name.clone())
                .collect();
            d.set("subnets", subnet_names);
            d.set("vnet_peerings", flatten_peerings(props.virtual_network_peerings.as_ref()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::network::VirtualNetworkPeeringProperties;

    const NSG: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkSecurityGroups/nsg1";

    #[test]
    fn test_subnets_round_trip() {
        let blocks = vec![
            json!({"name": "a", "address_prefix": "10.0.1.0/24", "security_group": NSG, "id": ""}),
            json!({"name": "b", "address_prefix": "10.0.2.0/24", "security_group": "", "id": ""}),
        ];
        let subnets = expand_virtual_network_subnets(&blocks);
        assert_eq!(subnets.len(), 2);
        assert!(subnets[1].properties.as_ref().unwrap().network_security_group.is_none());
        assert_eq!(flatten_virtual_network_subnets(Some(&subnets)), blocks);
    }

    #[test]
    fn test_address_space() {
        let prefixes = vec!["10.0.0.0/16".to_string(), "10.10.0.0/16".to_string()];
        let space = expand_address_space(prefixes.clone());
        assert_eq!(flatten_address_space(Some(&space)), prefixes);
        assert!(flatten_address_space(None).is_empty());
    }

    #[test]
    fn test_security_group_names_are_unique() {
        let blocks = vec![
            json!({"name": "a", "security_group": NSG}),
            json!({"name": "b", "security_group": NSG}),
            json!({"name": "c"}),
        ];
        assert_eq!(network_security_group_names(&blocks).unwrap(), vec!["nsg1"]);
        assert!(network_security_group_names(&[json!({"security_group": "not-an-id"})]).is_err());
    }

    #[test]
    fn test_flatten_peerings_skips_incomplete() {
        let peerings = vec![
            VirtualNetworkPeering {
                name: Some("peer1".into()),
                properties: Some(VirtualNetworkPeeringProperties {
                    remote_virtual_network: Some(SubResource::new("/remote")),
                    ..Default::default()
                }),
                ..Default::default()
            },
            VirtualNetworkPeering {
                name: Some("peer2".into()),
                ..Default::default()
            },
        ];
        let flat = flatten_peerings(Some(&peerings));
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["peer1"], json!("/remote"));
    }
}
