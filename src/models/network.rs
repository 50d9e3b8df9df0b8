//! `Microsoft.Network` payloads (API version 2018-11-01).

use super::{SubResource, Tags};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level resource envelope shared by every network resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedResource<P> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<P>,
}

/// Child resource (subnet, rule, route, ip configuration).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child<P> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<P>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhcpOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_servers: Option<Vec<String>>,
}

pub type VirtualNetwork = TrackedResource<VirtualNetworkProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_space: Option<AddressSpace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_options: Option<DhcpOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnets: Option<Vec<Subnet>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_network_peerings: Option<Vec<VirtualNetworkPeering>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type Subnet = Child<SubnetProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_table: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_configurations: Option<Vec<SubResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type NetworkSecurityGroup = TrackedResource<NetworkSecurityGroupProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSecurityGroupProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_rules: Option<Vec<SecurityRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnets: Option<Vec<SubResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interfaces: Option<Vec<SubResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type SecurityRule = Child<SecurityRuleProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRuleProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port_ranges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port_ranges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address_prefixes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_address_prefixes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type RouteTable = TrackedResource<RouteTableProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<Route>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnets: Option<Vec<SubResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_bgp_route_propagation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type Route = Child<RouteProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop_type: Option<String>,
    #[serde(rename = "nextHopIpAddress", skip_serializing_if = "Option::is_none")]
    pub next_hop_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type PublicIpAddress = TrackedResource<PublicIpAddressProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicIpAddressProperties {
    #[serde(rename = "publicIPAllocationMethod", skip_serializing_if = "Option::is_none")]
    pub public_ip_allocation_method: Option<String>,
    #[serde(rename = "publicIPAddressVersion", skip_serializing_if = "Option::is_none")]
    pub public_ip_address_version: Option<String>,
    #[serde(rename = "idleTimeoutInMinutes", skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<i64>,
    #[serde(rename = "dnsSettings", skip_serializing_if = "Option::is_none")]
    pub dns_settings: Option<PublicIpAddressDnsSettings>,
    #[serde(rename = "ipAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "provisioningState", skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressDnsSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_name_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse_fqdn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BgpSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgp_peering_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_weight: Option<i64>,
}

pub type LocalNetworkGateway = TrackedResource<LocalNetworkGatewayProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalNetworkGatewayProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_network_address_space: Option<AddressSpace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgp_settings: Option<BgpSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type VirtualNetworkGateway = TrackedResource<VirtualNetworkGatewayProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkGatewayProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_bgp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<VirtualNetworkGatewaySku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_configurations: Option<Vec<VirtualNetworkGatewayIpConfiguration>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_client_configuration: Option<VpnClientConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgp_settings: Option<BgpSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_default_site: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkGatewaySku {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

pub type VirtualNetworkGatewayIpConfiguration = Child<VirtualNetworkGatewayIpConfigurationProperties>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualNetworkGatewayIpConfigurationProperties {
    #[serde(rename = "privateIPAllocationMethod", skip_serializing_if = "Option::is_none")]
    pub private_ip_allocation_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<SubResource>,
    #[serde(rename = "publicIPAddress", skip_serializing_if = "Option::is_none")]
    pub public_ip_address: Option<SubResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnClientConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_client_address_pool: Option<AddressSpace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_client_root_certificates: Option<Vec<VpnClientRootCertificate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_client_revoked_certificates: Option<Vec<VpnClientRevokedCertificate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_client_protocols: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius_server_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius_server_secret: Option<String>,
}

pub type VpnClientRootCertificate = Child<VpnClientRootCertificateProperties>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnClientRootCertificateProperties {
    pub public_cert_data: String,
}

pub type VpnClientRevokedCertificate = Child<VpnClientRevokedCertificateProperties>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnClientRevokedCertificateProperties {
    pub thumbprint: String,
}

pub type NetworkInterface = TrackedResource<NetworkInterfaceProperties>;

/// Only the security group is modelled; the rest of the body is sent back as read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceProperties {
    /// Serialised as `null` when unset so a PUT detaches the group.
    #[serde(default)]
    pub network_security_group: Option<SubResource>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

pub type VirtualNetworkGatewayConnection = TrackedResource<VirtualNetworkGatewayConnectionProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkGatewayConnectionProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_network_gateway1: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_network_gateway2: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_network_gateway2: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_bgp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_policy_based_traffic_selectors: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_weight: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipsec_policies: Option<Vec<IpsecPolicy>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_bytes_transferred: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub egress_bytes_transferred: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpsecPolicy {
    #[serde(rename = "saLifeTimeSeconds")]
    pub sa_life_time_seconds: i64,
    #[serde(rename = "saDataSizeKilobytes")]
    pub sa_data_size_kilobytes: i64,
    pub ipsec_encryption: String,
    pub ipsec_integrity: String,
    pub ike_encryption: String,
    pub ike_integrity: String,
    pub dh_group: String,
    pub pfs_group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSharedKey {
    pub value: String,
}

pub type VirtualNetworkPeering = Child<VirtualNetworkPeeringProperties>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkPeeringProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_virtual_network_access: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_forwarded_traffic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_gateway_transit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_remote_gateways: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_virtual_network: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peering_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_public_ip_wire_names() {
        let pip: PublicIpAddress = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/pip",
            "name": "pip",
            "location": "local",
            "properties": {
                "publicIPAllocationMethod": "Static",
                "ipAddress": "1.2.3.4",
                "dnsSettings": {"domainNameLabel": "label", "fqdn": "label.local.cloudapp"},
                "provisioningState": "Succeeded"
            }
        }))
        .unwrap();
        let props = pip.properties.unwrap();
        assert_eq!(props.public_ip_allocation_method.as_deref(), Some("Static"));
        assert_eq!(props.ip_address.as_deref(), Some("1.2.3.4"));
        assert_eq!(props.dns_settings.unwrap().fqdn.as_deref(), Some("label.local.cloudapp"));
    }

    #[test]
    fn test_network_interface_keeps_unmodelled_properties() {
        let mut nic: NetworkInterface = serde_json::from_value(json!({
            "id": "/nic1",
            "location": "local",
            "properties": {
                "networkSecurityGroup": {"id": "/nsg1"},
                "ipConfigurations": [{"name": "internal"}],
                "enableIPForwarding": false
            }
        }))
        .unwrap();
        let props = nic.properties.as_mut().unwrap();
        assert_eq!(props.network_security_group, Some(SubResource::new("/nsg1")));
        props.network_security_group = None;

        let wire = serde_json::to_value(&nic).unwrap();
        assert_eq!(wire["properties"]["networkSecurityGroup"], Value::Null);
        assert!(wire["properties"].as_object().unwrap().contains_key("networkSecurityGroup"));
        assert_eq!(wire["properties"]["ipConfigurations"][0]["name"], json!("internal"));
        assert_eq!(wire["properties"]["enableIPForwarding"], json!(false));
    }

    #[test]
    fn test_gateway_connection_wire_names() {
        let props = VirtualNetworkGatewayConnectionProperties {
            connection_type: Some("IPsec".into()),
            virtual_network_gateway1: Some(SubResource::new("/gw1")),
            local_network_gateway2: Some(SubResource::new("/lgw")),
            routing_weight: Some(10),
            ipsec_policies: Some(vec![IpsecPolicy {
                sa_life_time_seconds: 27000,
                sa_data_size_kilobytes: 102400000,
                ipsec_encryption: "AES256".into(),
                ipsec_integrity: "SHA256".into(),
                ike_encryption: "AES256".into(),
                ike_integrity: "SHA256".into(),
                dh_group: "DHGroup14".into(),
                pfs_group: "PFS2048".into(),
            }]),
            ..Default::default()
        };
        let value = serde_json::to_value(&props).unwrap();
        assert_eq!(value["virtualNetworkGateway1"]["id"], json!("/gw1"));
        assert_eq!(value["localNetworkGateway2"]["id"], json!("/lgw"));
        assert_eq!(value["ipsecPolicies"][0]["saLifeTimeSeconds"], json!(27000));
        assert_eq!(value["ipsecPolicies"][0]["dhGroup"], json!("DHGroup14"));
    }

    #[test]
    fn test_gateway_ip_configuration_wire_names() {
        let ipc = VirtualNetworkGatewayIpConfiguration {
            name: Some("vnetGatewayConfig".into()),
            properties: Some(VirtualNetworkGatewayIpConfigurationProperties {
                private_ip_allocation_method: Some("Dynamic".into()),
                subnet: Some(SubResource::new("/subnet")),
                public_ip_address: Some(SubResource::new("/pip")),
            }),
            ..Default::default()
        };
        let value = serde_json::to_value(&ipc).unwrap();
        assert_eq!(value["properties"]["privateIPAllocationMethod"], json!("Dynamic"));
        assert_eq!(value["properties"]["publicIPAddress"]["id"], json!("/pip"));
    }
}
