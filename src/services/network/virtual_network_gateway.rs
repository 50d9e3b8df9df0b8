//! `azurestack_virtual_network_gateway` resource and data source.

use super::{block_i64, block_str, block_strings, delete_resource, require_properties};
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use crate::ids::{SubnetId, VirtualNetworkGatewayId};
use crate::models::network::{
    AddressSpace, BgpSettings, VirtualNetworkGateway, VirtualNetworkGatewayIpConfiguration,
    VirtualNetworkGatewayIpConfigurationProperties, VirtualNetworkGatewayProperties, VirtualNetworkGatewaySku,
    VpnClientConfiguration, VpnClientRevokedCertificate, VpnClientRevokedCertificateProperties,
    VpnClientRootCertificate, VpnClientRootCertificateProperties,
};
use crate::models::{expand_tags, flatten_tags, normalize_location, sub_resource_id, SubResource};
use crate::schema::{common, validate, Attribute, DataSource, Resource, ResourceData, Schema, ValueType};
use crate::services::{ensure_not_exists, get_existing, get_or_clear};
use crate::timeouts::Timeouts;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;

const RESOURCE_TYPE: &str = "azurestack_virtual_network_gateway";
const DEFAULT_IP_CONFIGURATION_NAME: &str = "vnetGatewayConfig";

pub const GATEWAY_TYPES: &[&str] = &["ExpressRoute", "Vpn"];
pub const VPN_TYPES: &[&str] = &["RouteBased", "PolicyBased"];
pub const SKUS: &[&str] = &[
    "Basic",
    "Standard",
    "HighPerformance",
    "UltraPerformance",
    "VpnGw1",
    "VpnGw2",
    "VpnGw3",
];
const POLICY_BASED_SKUS: &[&str] = &["Basic"];
const ROUTE_BASED_SKUS: &[&str] = &["Basic", "Standard", "HighPerformance", "VpnGw1", "VpnGw2", "VpnGw3"];
const EXPRESS_ROUTE_SKUS: &[&str] = &["Standard", "HighPerformance", "UltraPerformance"];

/// The gateway type and VPN type each restrict the usable SKUs.
pub fn validate_gateway_sku(gateway_type: &str, vpn_type: &str, sku: &str) -> Result<()> {
    let (valid, describe) = if gateway_type.eq_ignore_ascii_case("ExpressRoute") {
        (EXPRESS_ROUTE_SKUS, "`type` is set to `ExpressRoute`")
    } else if vpn_type.eq_ignore_ascii_case("PolicyBased") {
        (POLICY_BASED_SKUS, "`type` is set to `Vpn` and `vpn_type` is set to `PolicyBased`")
    } else {
        (ROUTE_BASED_SKUS, "`type` is set to `Vpn` and `vpn_type` is set to `RouteBased`")
    };
    if valid.iter().any(|v| v.eq_ignore_ascii_case(sku)) {
        return Ok(());
    }
    Err(Error::Validation(format!(
        "`sku` must be one of {valid:?} when {describe}, got {sku:?}"
    )))
}

/// A gateway can only be placed in the subnet called `GatewaySubnet`.
fn gateway_subnet_id(value: &Value, path: &str) -> std::result::Result<(), String> {
    let raw = value.as_str().unwrap_or_default();
    let id = SubnetId::parse(raw).map_err(|e| format!("{path}: {e}"))?;
    if id.name != "GatewaySubnet" {
        return Err(format!(
            "{path} must reference a subnet named `GatewaySubnet`, got {:?}",
            id.name
        ));
    }
    Ok(())
}

pub fn expand_ip_configurations(input: &[Value]) -> Vec<VirtualNetworkGatewayIpConfiguration> {
    input
        .iter()
        .filter_map(Value::as_object)
        .map(|block| {
            let name = match block_str(block, "name") {
                "" => DEFAULT_IP_CONFIGURATION_NAME,
                name => name,
            };
            let allocation = match block_str(block, "private_ip_address_allocation") {
                "" => "Dynamic",
                method => method,
            };
            VirtualNetworkGatewayIpConfiguration {
                name: Some(name.to_string()),
                properties: Some(VirtualNetworkGatewayIpConfigurationProperties {
                    private_ip_allocation_method: Some(allocation.to_string()),
                    subnet: SubResource::from_optional(block_str(block, "subnet_id")),
                    public_ip_address: SubResource::from_optional(block_str(block, "public_ip_address_id")),
                }),
                ..Default::default()
            }
        })
        .collect()
}

pub fn flatten_ip_configurations(input: Option<&Vec<VirtualNetworkGatewayIpConfiguration>>) -> Vec<Value> {
    input
        .into_iter()
        .flatten()
        .map(|config| {
            let props = config.properties.clone().unwrap_or_default();
            json!({
                "name": config.name.clone().unwrap_or_default(),
                "private_ip_address_allocation": props.private_ip_allocation_method.unwrap_or_default(),
                "subnet_id": sub_resource_id(&props.subnet),
                "public_ip_address_id": sub_resource_id(&props.public_ip_address),
            })
        })
        .collect()
}

fn blocks<'a>(block: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    block
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

pub fn expand_vpn_client_configuration(input: &[Value]) -> Option<VpnClientConfiguration> {
    let block = input.first()?.as_object()?;

    let root_certificates = blocks(block, "root_certificate")
        .map(|cert| VpnClientRootCertificate {
            name: Some(block_str(cert, "name").to_string()),
            properties: Some(VpnClientRootCertificateProperties {
                public_cert_data: block_str(cert, "public_cert_data").to_string(),
            }),
            ..Default::default()
        })
        .collect();
    let revoked_certificates = blocks(block, "revoked_certificate")
        .map(|cert| VpnClientRevokedCertificate {
            name: Some(block_str(cert, "name").to_string()),
            properties: Some(VpnClientRevokedCertificateProperties {
                thumbprint: block_str(cert, "thumbprint").to_string(),
            }),
            ..Default::default()
        })
        .collect();

    let non_empty = |key: &str| Some(block_str(block, key)).filter(|s| !s.is_empty()).map(String::from);
    Some(VpnClientConfiguration {
        vpn_client_address_pool: Some(AddressSpace {
            address_prefixes: Some(block_strings(block, "address_space")),
        }),
        vpn_client_root_certificates: Some(root_certificates),
        vpn_client_revoked_certificates: Some(revoked_certificates),
        vpn_client_protocols: Some(block_strings(block, "vpn_client_protocols")),
        radius_server_address: non_empty("radius_server_address"),
        radius_server_secret: non_empty("radius_server_secret"),
    })
}

pub fn flatten_vpn_client_configuration(input: Option<&VpnClientConfiguration>) -> Vec<Value> {
    let Some(config) = input else {
        return Vec::new();
    };

    let address_space = config
        .vpn_client_address_pool
        .as_ref()
        .and_then(|pool| pool.address_prefixes.clone())
        .unwrap_or_default();
    let root_certificates: Vec<Value> = config
        .vpn_client_root_certificates
        .iter()
        .flatten()
        .map(|cert| {
            json!({
                "name": cert.name.clone().unwrap_or_default(),
                "public_cert_data": cert.properties.as_ref().map(|p| p.public_cert_data.clone()).unwrap_or_default(),
            })
        })
        .collect();
    let revoked_certificates: Vec<Value> = config
        .vpn_client_revoked_certificates
        .iter()
        .flatten()
        .map(|cert| {
            json!({
                "name": cert.name.clone().unwrap_or_default(),
                "thumbprint": cert.properties.as_ref().map(|p| p.thumbprint.clone()).unwrap_or_default(),
            })
        })
        .collect();

    let mut block = json!({
        "address_space": address_space,
        "root_certificate": root_certificates,
        "revoked_certificate": revoked_certificates,
        "vpn_client_protocols": config.vpn_client_protocols.clone().unwrap_or_default(),
    });
    if let Some(address) = &config.radius_server_address {
        block["radius_server_address"] = json!(address);
    }
    if let Some(secret) = &config.radius_server_secret {
        block["radius_server_secret"] = json!(secret);
    }
    vec![block]
}

pub fn expand_gateway_bgp_settings(input: &[Value]) -> Option<BgpSettings> {
    let block = input.first()?.as_object()?;
    Some(BgpSettings {
        asn: block_i64(block, "asn"),
        bgp_peering_address: Some(block_str(block, "peering_address"))
            .filter(|s| !s.is_empty())
            .map(String::from),
        peer_weight: block_i64(block, "peer_weight"),
    })
}

/// Only reported when BGP is enabled on the gateway.
pub fn flatten_gateway_bgp_settings(input: Option<&BgpSettings>) -> Vec<Value> {
    let Some(settings) = input else {
        return Vec::new();
    };
    vec![json!({
        "asn": settings.asn.unwrap_or_default(),
        "peering_address": settings.bgp_peering_address.clone().unwrap_or_default(),
        "peer_weight": settings.peer_weight.unwrap_or_default(),
    })]
}

fn expand_virtual_network_gateway(d: &ResourceData) -> Result<VirtualNetworkGateway> {
    let gateway_type = d.get_str("type");
    let vpn_type = d.get_str("vpn_type");
    let sku = d.get_str("sku");
    validate_gateway_sku(gateway_type, vpn_type, sku)?;

    let enable_bgp = d.get_bool("enable_bgp");
    Ok(VirtualNetworkGateway {
        name: Some(d.get_str("name").to_string()),
        location: Some(normalize_location(d.get_str("location"))),
        tags: expand_tags(d.get("tags")),
        properties: Some(VirtualNetworkGatewayProperties {
            gateway_type: Some(gateway_type.to_string()),
            vpn_type: Some(vpn_type.to_string()),
            enable_bgp: Some(enable_bgp),
            active_active: Some(d.get_bool("active_active")),
            sku: Some(VirtualNetworkGatewaySku {
                name: Some(sku.to_string()),
                tier: Some(sku.to_string()),
            }),
            ip_configurations: Some(expand_ip_configurations(d.get_list("ip_configuration"))),
            vpn_client_configuration: expand_vpn_client_configuration(d.get_list("vpn_client_configuration")),
            bgp_settings: if enable_bgp {
                expand_gateway_bgp_settings(d.get_list("bgp_settings"))
            } else {
                None
            },
            gateway_default_site: SubResource::from_optional(d.get_str("default_local_network_gateway_id")),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn flatten_virtual_network_gateway(d: &mut ResourceData, gateway: &VirtualNetworkGateway, display: &VirtualNetworkGatewayId) -> Result<()> {
    d.set("location", normalize_location(gateway.location.as_deref().unwrap_or_default()));
    let props = require_properties(&gateway.properties, display)?;

    d.set("type", props.gateway_type.clone().unwrap_or_default());
    d.set("vpn_type", props.vpn_type.clone().unwrap_or_default());
    d.set("enable_bgp", props.enable_bgp.unwrap_or_default());
    d.set("active_active", props.active_active.unwrap_or_default());
    d.set(
        "sku",
        props.sku.as_ref().and_then(|s| s.name.clone()).unwrap_or_default(),
    );
    d.set("default_local_network_gateway_id", sub_resource_id(&props.gateway_default_site));
    d.set("ip_configuration", flatten_ip_configurations(props.ip_configurations.as_ref()));
    d.set(
        "vpn_client_configuration",
        flatten_vpn_client_configuration(props.vpn_client_configuration.as_ref()),
    );
    let bgp = if props.enable_bgp.unwrap_or_default() {
        flatten_gateway_bgp_settings(props.bgp_settings.as_ref())
    } else {
        Vec::new()
    };
    d.set("bgp_settings", bgp);
    d.set("tags", flatten_tags(gateway.tags.as_ref()));
    Ok(())
}

fn ip_configuration_block() -> Schema {
    Schema::new()
        .attr(
            "name",
            Attribute::optional(ValueType::String).default(DEFAULT_IP_CONFIGURATION_NAME),
        )
        .attr(
            "private_ip_address_allocation",
            Attribute::optional(ValueType::String)
                .default("Dynamic")
                .validate(validate::string_in_slice(&["Static", "Dynamic"], false)),
        )
        .attr(
            "subnet_id",
            Attribute::required(ValueType::String).validate(gateway_subnet_id),
        )
        .attr(
            "public_ip_address_id",
            Attribute::required(ValueType::String).validate(validate::resource_id),
        )
}

fn vpn_client_configuration_block() -> Schema {
    Schema::new()
        .attr(
            "address_space",
            Attribute::required(ValueType::List).elem(Attribute::optional(ValueType::String)),
        )
        .attr(
            "root_certificate",
            Attribute::optional(ValueType::Set).block(
                Schema::new()
                    .attr("name", Attribute::required(ValueType::String))
                    .attr("public_cert_data", Attribute::required(ValueType::String)),
            ),
        )
        .attr(
            "revoked_certificate",
            Attribute::optional(ValueType::Set).block(
                Schema::new()
                    .attr("name", Attribute::required(ValueType::String))
                    .attr("thumbprint", Attribute::required(ValueType::String)),
            ),
        )
        .attr(
            "radius_server_address",
            Attribute::optional(ValueType::String).validate(validate::ipv4_address),
        )
        .attr("radius_server_secret", Attribute::optional(ValueType::String))
        .attr(
            "vpn_client_protocols",
            Attribute::optional_computed(ValueType::Set).elem(
                Attribute::optional(ValueType::String).validate(validate::string_in_slice(&["IkeV2", "SSTP"], true)),
            ),
        )
}

fn bgp_settings_block() -> Schema {
    Schema::new()
        .attr("asn", Attribute::optional(ValueType::Int))
        .attr("peering_address", Attribute::optional_computed(ValueType::String))
        .attr("peer_weight", Attribute::optional(ValueType::Int))
}

fn gateway_timeouts() -> Timeouts {
    Timeouts {
        create: Duration::from_secs(60 * 60),
        read: Duration::from_secs(5 * 60),
        update: Duration::from_secs(60 * 60),
        delete: Duration::from_secs(60 * 60),
    }
}

pub struct VirtualNetworkGatewayResource;

impl VirtualNetworkGatewayResource {
    async fn create_update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();
        log::info!("[INFO] preparing arguments for AzureStack Virtual Network Gateway creation.");

        let id = VirtualNetworkGatewayId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));
        if d.is_new_resource() {
            ensure_not_exists(client, &ctx, self.resource_type(), &id.id(), &id, NETWORK_API_VERSION).await?;
        }

        let gateway = expand_virtual_network_gateway(d)?;
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
impl Resource for VirtualNetworkGatewayResource {
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
            .attr("resource_group_name", common::resource_group_name())
            .attr("location", common::location())
            .attr(
                "type",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::string_in_slice(GATEWAY_TYPES, true)),
            )
            .attr(
                "vpn_type",
                Attribute::optional(ValueType::String)
                    .force_new()
                    .default("RouteBased")
                    .validate(validate::string_in_slice(VPN_TYPES, true)),
            )
            .attr("enable_bgp", Attribute::optional_computed(ValueType::Bool))
            .attr("active_active", Attribute::optional_computed(ValueType::Bool))
            .attr(
                "sku",
                Attribute::required(ValueType::String).validate(validate::string_in_slice(SKUS, true)),
            )
            .attr(
                "ip_configuration",
                Attribute::required(ValueType::List)
                    .max_items(3)
                    .block(ip_configuration_block()),
            )
            .attr(
                "vpn_client_configuration",
                Attribute::optional(ValueType::List)
                    .max_items(1)
                    .block(vpn_client_configuration_block()),
            )
            .attr(
                "bgp_settings",
                Attribute::optional_computed(ValueType::List)
                    .max_items(1)
                    .block(bgp_settings_block()),
            )
            .attr(
                "default_local_network_gateway_id",
                Attribute::optional(ValueType::String).validate(validate::resource_id_or_empty),
            )
            .attr("tags", common::tags())
    }

    fn timeouts(&self) -> Timeouts {
        gateway_timeouts()
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = VirtualNetworkGatewayId::parse(d.id())?;

        let Some(gateway) =
            get_or_clear::<VirtualNetworkGateway>(client, &ctx, d, &id.id(), &id, NETWORK_API_VERSION).await?
        else {
            return Ok(());
        };

        d.set("name", id.name.as_str());
        d.set("resource_group_name", id.resource_group.as_str());
        flatten_virtual_network_gateway(d, &gateway, &id)
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = VirtualNetworkGatewayId::parse(d.id())?;
        delete_resource(client, &ctx, &id.id(), &id).await
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        VirtualNetworkGatewayId::parse(id).map(|_| ())
    }
}

pub struct VirtualNetworkGatewayDataSource;

#[async_trait]
impl DataSource for VirtualNetworkGatewayDataSource {
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
            .attr("type", common::computed_string())
            .attr("vpn_type", common::computed_string())
            .attr("enable_bgp", common::computed_bool())
            .attr("active_active", common::computed_bool())
            .attr("sku", common::computed_string())
            .attr(
                "ip_configuration",
                Attribute::computed(ValueType::List).block(
                    Schema::new()
                        .attr("name", common::computed_string())
                        .attr("private_ip_address_allocation", common::computed_string())
                        .attr("subnet_id", common::computed_string())
                        .attr("public_ip_address_id", common::computed_string()),
                ),
            )
            .attr(
                "vpn_client_configuration",
                Attribute::computed(ValueType::List).block(
                    Schema::new()
                        .attr("address_space", common::computed_strings())
                        .attr("root_certificate", Attribute::computed(ValueType::Set))
                        .attr("revoked_certificate", Attribute::computed(ValueType::Set))
                        .attr("radius_server_address", common::computed_string())
                        .attr("radius_server_secret", common::computed_string())
                        .attr("vpn_client_protocols", common::computed_strings()),
                ),
            )
            .attr(
                "bgp_settings",
                Attribute::computed(ValueType::List).block(
                    Schema::new()
                        .attr("asn", common::computed_int())
                        .attr("peering_address", common::computed_string())
                        .attr("peer_weight", common::computed_int()),
                ),
            )
            .attr("default_local_network_gateway_id", common::computed_string())
            .attr("tags", common::tags_computed())
    }

    fn timeouts(&self) -> Timeouts {
        gateway_timeouts()
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = VirtualNetworkGatewayId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));

        let gateway: VirtualNetworkGateway = get_existing(client, &ctx, &id.id(), &id, NETWORK_API_VERSION).await?;
        d.set_id(id.id());
        flatten_virtual_network_gateway(d, &gateway, &id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBNET: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/GatewaySubnet";
    const PUBLIC_IP: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/pip1";

    #[test]
    fn test_validate_gateway_sku() {
        assert!(validate_gateway_sku("Vpn", "PolicyBased", "Basic").is_ok());
        assert!(validate_gateway_sku("Vpn", "PolicyBased", "VpnGw1").is_err());
        assert!(validate_gateway_sku("Vpn", "RouteBased", "vpngw2").is_ok());
        assert!(validate_gateway_sku("Vpn", "RouteBased", "UltraPerformance").is_err());
        assert!(validate_gateway_sku("ExpressRoute", "RouteBased", "Standard").is_ok());
        let err = validate_gateway_sku("ExpressRoute", "RouteBased", "Basic").unwrap_err();
        assert!(err.to_string().contains("`ExpressRoute`"));
    }

    #[test]
    fn test_ip_configuration_defaults() {
        let configs = expand_ip_configurations(&[json!({
            "subnet_id": SUBNET,
            "public_ip_address_id": PUBLIC_IP,
        })]);
        assert_eq!(configs[0].name.as_deref(), Some("vnetGatewayConfig"));
        let props = configs[0].properties.as_ref().unwrap();
        assert_eq!(props.private_ip_allocation_method.as_deref(), Some("Dynamic"));
        assert_eq!(sub_resource_id(&props.subnet), SUBNET);

        assert_eq!(
            flatten_ip_configurations(Some(&configs)),
            vec![json!({
                "name": "vnetGatewayConfig",
                "private_ip_address_allocation": "Dynamic",
                "subnet_id": SUBNET,
                "public_ip_address_id": PUBLIC_IP,
            })]
        );
    }

    #[test]
    fn test_vpn_client_configuration_round_trip() {
        let blocks = vec![json!({
            "address_space": ["10.2.0.0/24"],
            "root_certificate": [{"name": "root", "public_cert_data": "MIIC5z"}],
            "revoked_certificate": [{"name": "revoked", "thumbprint": "ABCDEF"}],
            "vpn_client_protocols": ["SSTP", "IkeV2"],
        })];
        let config = expand_vpn_client_configuration(&blocks).unwrap();
        assert!(config.radius_server_address.is_none());
        let wire = serde_json::to_value(&config).unwrap();
        assert_eq!(
            wire["vpnClientRootCertificates"][0]["properties"]["publicCertData"],
            json!("MIIC5z")
        );
        assert_eq!(flatten_vpn_client_configuration(Some(&config)), blocks);
    }

    #[test]
    fn test_bgp_settings_only_when_enabled() {
        let d = ResourceData::new(
            json!({
                "name": "gw",
                "location": "local",
                "type": "Vpn",
                "vpn_type": "RouteBased",
                "sku": "VpnGw1",
                "enable_bgp": false,
                "bgp_settings": [{"asn": 65000, "peering_address": "10.0.0.4", "peer_weight": 1}],
                "ip_configuration": [{"subnet_id": SUBNET, "public_ip_address_id": PUBLIC_IP}],
            })
            .as_object()
            .unwrap()
            .clone(),
        );
        let gateway = expand_virtual_network_gateway(&d).unwrap();
        let props = gateway.properties.unwrap();
        assert!(props.bgp_settings.is_none());
        assert_eq!(props.sku.unwrap().tier.as_deref(), Some("VpnGw1"));

        let settings = expand_gateway_bgp_settings(d.get_list("bgp_settings")).unwrap();
        assert_eq!(
            flatten_gateway_bgp_settings(Some(&settings)),
            vec![json!({"asn": 65000, "peering_address": "10.0.0.4", "peer_weight": 1})]
        );
    }

    #[test]
    fn test_gateway_subnet_id() {
        assert!(gateway_subnet_id(&json!(SUBNET), "subnet_id").is_ok());
        let other = SUBNET.replace("GatewaySubnet", "internal");
        assert!(gateway_subnet_id(&json!(other), "subnet_id").is_err());
        assert!(gateway_subnet_id(&json!("not-an-id"), "subnet_id").is_err());
    }

    #[test]
    fn test_timeouts() {
        let timeouts = VirtualNetworkGatewayResource.timeouts();
        assert_eq!(timeouts.create, Duration::from_secs(3600));
        assert_eq!(timeouts.read, Duration::from_secs(300));
    }
}
