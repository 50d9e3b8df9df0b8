//! `azurestack_virtual_network_gateway_connection` resource and data source.

use super::{block_i64, block_str, delete_resource, require_properties};
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use crate::ids::{LocalNetworkGatewayId, NetworkGatewayConnectionId, VirtualNetworkGatewayId};
use crate::models::network::{
    ConnectionSharedKey, IpsecPolicy, VirtualNetworkGatewayConnection, VirtualNetworkGatewayConnectionProperties,
};
use crate::models::{expand_tags, flatten_tags, normalize_location, SubResource};
use crate::schema::{common, validate, Attribute, DataSource, Resource, ResourceData, Schema, ValueType};
use crate::services::{ensure_not_exists, get_existing, get_or_clear};
use async_trait::async_trait;
use serde_json::{json, Value};

const CONNECTION_TYPES: &[&str] = &["ExpressRoute", "IPsec", "Vnet2Vnet"];
const DH_GROUPS: &[&str] = &["DHGroup1", "DHGroup14", "DHGroup2", "DHGroup2048", "DHGroup24", "ECP256", "ECP384", "None"];
const IKE_ENCRYPTIONS: &[&str] = &["AES128", "AES192", "AES256", "DES", "DES3"];
const IKE_INTEGRITIES: &[&str] = &["MD5", "SHA1", "SHA256", "SHA384"];
const IPSEC_ENCRYPTIONS: &[&str] = &[
    "AES128", "AES192", "AES256", "DES", "DES3", "GCMAES128", "GCMAES192", "GCMAES256", "None",
];
const IPSEC_INTEGRITIES: &[&str] = &["GCMAES128", "GCMAES192", "GCMAES256", "MD5", "SHA1", "SHA256"];
const PFS_GROUPS: &[&str] = &["ECP256", "ECP384", "None", "PFS1", "PFS2", "PFS2048", "PFS24"];

fn int_at_least(min: i64) -> impl Fn(&Value, &str) -> std::result::Result<(), String> + Send + Sync + 'static {
    move |value, path| match value.as_i64() {
        Some(n) if n >= min => Ok(()),
        Some(n) => Err(format!("expected {path} to be at least ({min}), got {n}")),
        None => Err(format!("expected type of {path} to be integer")),
    }
}

pub fn expand_ipsec_policies(input: &[Value]) -> Vec<IpsecPolicy> {
    input
        .iter()
        .filter_map(Value::as_object)
        .map(|block| IpsecPolicy {
            dh_group: block_str(block, "dh_group").to_string(),
            ike_encryption: block_str(block, "ike_encryption").to_string(),
            ike_integrity: block_str(block, "ike_integrity").to_string(),
            ipsec_encryption: block_str(block, "ipsec_encryption").to_string(),
            ipsec_integrity: block_str(block, "ipsec_integrity").to_string(),
            pfs_group: block_str(block, "pfs_group").to_string(),
            sa_data_size_kilobytes: block_i64(block, "sa_datasize").unwrap_or_default(),
            sa_life_time_seconds: block_i64(block, "sa_lifetime").unwrap_or_default(),
        })
        .collect()
}

pub fn flatten_ipsec_policies(input: Option<&Vec<IpsecPolicy>>) -> Vec<Value> {
    input
        .into_iter()
        .flatten()
        .map(|policy| {
            json!({
                "dh_group": policy.dh_group,
                "ike_encryption": policy.ike_encryption,
                "ike_integrity": policy.ike_integrity,
                "ipsec_encryption": policy.ipsec_encryption,
                "ipsec_integrity": policy.ipsec_integrity,
                "pfs_group": policy.pfs_group,
                "sa_datasize": policy.sa_data_size_kilobytes,
                "sa_lifetime": policy.sa_life_time_seconds,
            })
        })
        .collect()
}

fn optional_str<'a>(d: &'a ResourceData, key: &str) -> Option<&'a str> {
    d.get_ok(key).and_then(Value::as_str)
}

/// Connection properties, checking that the endpoint required by `type` is present.
pub fn expand_connection_properties(d: &ResourceData) -> Result<VirtualNetworkGatewayConnectionProperties> {
    let connection_type = d.get_str("type");

    let mut props = VirtualNetworkGatewayConnectionProperties {
        connection_type: Some(connection_type.to_string()),
        enable_bgp: Some(d.get_bool("enable_bgp")),
        use_policy_based_traffic_selectors: Some(d.get_bool("use_policy_based_traffic_selectors")),
        authorization_key: optional_str(d, "authorization_key").map(String::from),
        peer: optional_str(d, "express_route_circuit_id").map(SubResource::new),
        routing_weight: d.get_ok("routing_weight").and_then(Value::as_i64),
        shared_key: optional_str(d, "shared_key").map(String::from),
        ..Default::default()
    };

    if let Some(raw) = optional_str(d, "virtual_network_gateway_id") {
        let gateway = VirtualNetworkGatewayId::parse(raw)?;
        props.virtual_network_gateway1 = Some(SubResource::new(gateway.id()));
    }
    if let Some(raw) = optional_str(d, "peer_virtual_network_gateway_id") {
        let gateway = VirtualNetworkGatewayId::parse(raw)?;
        props.virtual_network_gateway2 = Some(SubResource::new(gateway.id()));
    }
    if let Some(raw) = optional_str(d, "local_network_gateway_id") {
        let gateway = LocalNetworkGatewayId::parse(raw)?;
        props.local_network_gateway2 = Some(SubResource::new(gateway.id()));
    }
    let policies = d.get_list("ipsec_policy");
    if !policies.is_empty() {
        props.ipsec_policies = Some(expand_ipsec_policies(policies));
    }

    let (present, field) = if connection_type.eq_ignore_ascii_case("ExpressRoute") {
        (props.peer.is_some(), "express_route_circuit_id")
    } else if connection_type.eq_ignore_ascii_case("IPsec") {
        (props.local_network_gateway2.is_some(), "local_network_gateway_id")
    } else if connection_type.eq_ignore_ascii_case("Vnet2Vnet") {
        (props.virtual_network_gateway2.is_some(), "peer_virtual_network_gateway_id")
    } else {
        (true, "")
    };
    if !present {
        return Err(Error::Validation(format!(
            "`{field}` must be specified when `type` is set to `{connection_type}`"
        )));
    }

    Ok(props)
}

fn ipsec_policy_block() -> Schema {
    let one_of = |valid: &'static [&'static str]| {
        Attribute::required(ValueType::String).validate(validate::string_in_slice(valid, true))
    };
    Schema::new()
        .attr("dh_group", one_of(DH_GROUPS))
        .attr("ike_encryption", one_of(IKE_ENCRYPTIONS))
        .attr("ike_integrity", one_of(IKE_INTEGRITIES))
        .attr("ipsec_encryption", one_of(IPSEC_ENCRYPTIONS))
        .attr("ipsec_integrity", one_of(IPSEC_INTEGRITIES))
        .attr("pfs_group", one_of(PFS_GROUPS))
        .attr(
            "sa_datasize",
            Attribute::optional_computed(ValueType::Int).validate(int_at_least(1024)),
        )
        .attr(
            "sa_lifetime",
            Attribute::optional_computed(ValueType::Int).validate(int_at_least(300)),
        )
}

pub struct VirtualNetworkGatewayConnectionResource;

impl VirtualNetworkGatewayConnectionResource {
    async fn create_update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();
        log::info!("[INFO] preparing arguments for AzureStack Virtual Network Gateway Connection creation.");

        let id = NetworkGatewayConnectionId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));
        if d.is_new_resource() {
            ensure_not_exists(client, &ctx, self.resource_type(), &id.id(), &id, NETWORK_API_VERSION).await?;
        }

        let properties = expand_connection_properties(d)?;
        let shared_key = properties.shared_key.clone();
        let connection = VirtualNetworkGatewayConnection {
            name: Some(id.name.clone()),
            location: Some(normalize_location(d.get_str("location"))),
            tags: expand_tags(d.get("tags")),
            properties: Some(properties),
            ..Default::default()
        };

        let _: Value = client
            .arm
            .put(&ctx, &id.id(), NETWORK_API_VERSION, &connection)
            .await
            .with_context(|| format!("creating/updating {id}"))?;

        // a changed key is not applied by the connection PUT once the connection exists
        if let Some(value) = shared_key.filter(|_| !d.is_new_resource()) {
            let _: Value = client
                .arm
                .put(
                    &ctx,
                    &format!("{}/sharedkey", id.id()),
                    NETWORK_API_VERSION,
                    &ConnectionSharedKey { value },
                )
                .await
                .with_context(|| format!("updating Shared Key for {id}"))?;
        }

        d.set_id(id.id());
        self.read(client, d).await
    }
}

#[async_trait]
impl Resource for VirtualNetworkGatewayConnectionResource {
    fn resource_type(&self) -> &'static str {
        "azurestack_virtual_network_gateway_connection"
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
                    .validate(validate::string_in_slice(CONNECTION_TYPES, true)),
            )
            .attr(
                "virtual_network_gateway_id",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::resource_id),
            )
            .attr(
                "authorization_key",
                Attribute::optional(ValueType::String)
                    .sensitive()
                    .validate(validate::string_is_not_empty),
            )
            .attr(
                "express_route_circuit_id",
                Attribute::optional(ValueType::String)
                    .force_new()
                    .validate(validate::resource_id_or_empty),
            )
            .attr(
                "peer_virtual_network_gateway_id",
                Attribute::optional(ValueType::String)
                    .force_new()
                    .validate(validate::resource_id_or_empty),
            )
            .attr(
                "local_network_gateway_id",
                Attribute::optional(ValueType::String)
                    .force_new()
                    .validate(validate::resource_id_or_empty),
            )
            .attr("enable_bgp", Attribute::optional_computed(ValueType::Bool))
            .attr(
                "use_policy_based_traffic_selectors",
                Attribute::optional_computed(ValueType::Bool),
            )
            .attr(
                "routing_weight",
                Attribute::optional_computed(ValueType::Int).validate(validate::int_between(0, 32000)),
            )
            .attr(
                "shared_key",
                Attribute::optional_computed(ValueType::String).sensitive(),
            )
            .attr(
                "ipsec_policy",
                Attribute::optional(ValueType::List)
                    .max_items(1)
                    .block(ipsec_policy_block()),
            )
            .attr("tags", common::tags())
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = NetworkGatewayConnectionId::parse(d.id())?;

        let Some(connection) =
            get_or_clear::<VirtualNetworkGatewayConnection>(client, &ctx, d, &id.id(), &id, NETWORK_API_VERSION)
                .await?
        else {
            return Ok(());
        };
        let props = require_properties(&connection.properties, &id)?;

        d.set("name", connection.name.clone().unwrap_or_else(|| id.name.clone()));
        d.set("resource_group_name", id.resource_group.as_str());
        d.set(
            "location",
            normalize_location(connection.location.as_deref().unwrap_or_default()),
        );

        let references = [
            ("virtual_network_gateway_id", &props.virtual_network_gateway1),
            ("express_route_circuit_id", &props.peer),
            ("peer_virtual_network_gateway_id", &props.virtual_network_gateway2),
            ("local_network_gateway_id", &props.local_network_gateway2),
        ];
        for (key, reference) in references {
            if let Some(target) = reference.as_ref().and_then(|r| r.id.clone()) {
                d.set(key, target);
            }
        }
        if let Some(connection_type) = props.connection_type.clone().filter(|t| !t.is_empty()) {
            d.set("type", connection_type);
        }
        if let Some(key) = &props.authorization_key {
            d.set("authorization_key", key.as_str());
        }
        if let Some(enable_bgp) = props.enable_bgp {
            d.set("enable_bgp", enable_bgp);
        }
        if let Some(selectors) = props.use_policy_based_traffic_selectors {
            d.set("use_policy_based_traffic_selectors", selectors);
        }
        if let Some(weight) = props.routing_weight {
            d.set("routing_weight", weight);
        }
        if let Some(key) = &props.shared_key {
            d.set("shared_key", key.as_str());
        }
        if props.ipsec_policies.is_some() {
            d.set("ipsec_policy", flatten_ipsec_policies(props.ipsec_policies.as_ref()));
        }
        d.set("tags", flatten_tags(connection.tags.as_ref()));
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = NetworkGatewayConnectionId::parse(d.id())?;
        delete_resource(client, &ctx, &id.id(), &id).await
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        NetworkGatewayConnectionId::parse(id).map(|_| ())
    }
}

pub struct VirtualNetworkGatewayConnectionDataSource;

fn flatten_connection_data_source(d: &mut ResourceData, connection: &VirtualNetworkGatewayConnection) {
    d.set(
        "location",
        normalize_location(connection.location.as_deref().unwrap_or_default()),
    );
    d.set("tags", flatten_tags(connection.tags.as_ref()));
    let Some(props) = &connection.properties else {
        return;
    };

    let reference = |r: &Option<SubResource>| r.as_ref().and_then(|r| r.id.clone()).unwrap_or_default();
    d.set("type", props.connection_type.clone().unwrap_or_default());
    d.set("virtual_network_gateway_id", reference(&props.virtual_network_gateway1));
    d.set("peer_virtual_network_gateway_id", reference(&props.virtual_network_gateway2));
    d.set("local_network_gateway_id", reference(&props.local_network_gateway2));
    d.set("express_route_circuit_id", reference(&props.peer));
    d.set("authorization_key", props.authorization_key.clone().unwrap_or_default());
    d.set("shared_key", props.shared_key.clone().unwrap_or_default());
    d.set("enable_bgp", props.enable_bgp.unwrap_or_default());
    d.set(
        "use_policy_based_traffic_selectors",
        props.use_policy_based_traffic_selectors.unwrap_or_default(),
    );
    d.set("routing_weight", props.routing_weight.unwrap_or_default());
    d.set("ingress_bytes_transferred", props.ingress_bytes_transferred.unwrap_or_default());
    d.set("egress_bytes_transferred", props.egress_bytes_transferred.unwrap_or_default());
    d.set("resource_guid", props.resource_guid.clone().unwrap_or_default());
    d.set("ipsec_policy", flatten_ipsec_policies(props.ipsec_policies.as_ref()));
}

#[async_trait]
impl DataSource for VirtualNetworkGatewayConnectionDataSource {
    fn resource_type(&self) -> &'static str {
        "azurestack_virtual_network_gateway_connection"
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
            .attr("virtual_network_gateway_id", common::computed_string())
            .attr("authorization_key", common::computed_string().sensitive())
            .attr("express_route_circuit_id", common::computed_string())
            .attr("peer_virtual_network_gateway_id", common::computed_string())
            .attr("local_network_gateway_id", common::computed_string())
            .attr("enable_bgp", common::computed_bool())
            .attr("use_policy_based_traffic_selectors", common::computed_bool())
            .attr("routing_weight", common::computed_int())
            .attr("shared_key", common::computed_string().sensitive())
            .attr("ingress_bytes_transferred", common::computed_int())
            .attr("egress_bytes_transferred", common::computed_int())
            .attr("resource_guid", common::computed_string())
            .attr(
                "ipsec_policy",
                Attribute::computed(ValueType::List).block(
                    Schema::new()
                        .attr("dh_group", common::computed_string())
                        .attr("ike_encryption", common::computed_string())
                        .attr("ike_integrity", common::computed_string())
                        .attr("ipsec_encryption", common::computed_string())
                        .attr("ipsec_integrity", common::computed_string())
                        .attr("pfs_group", common::computed_string())
                        .attr("sa_datasize", common::computed_int())
                        .attr("sa_lifetime", common::computed_int()),
                ),
            )
            .attr("tags", common::tags_computed())
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = NetworkGatewayConnectionId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));

        let connection: VirtualNetworkGatewayConnection =
            get_existing(client, &ctx, &id.id(), &id, NETWORK_API_VERSION).await?;
        d.set_id(id.id());
        flatten_connection_data_source(d, &connection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GATEWAY: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/virtualNetworkGateways/gw1";
    const LOCAL_GATEWAY: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/localNetworkGateways/onprem";

    fn data(attrs: Value) -> ResourceData {
        ResourceData::new(attrs.as_object().unwrap().clone())
    }

    #[test]
    fn test_ipsec_requires_local_gateway() {
        let d = data(json!({"type": "IPsec", "virtual_network_gateway_id": GATEWAY}));
        let err = expand_connection_properties(&d).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`local_network_gateway_id` must be specified when `type` is set to `IPsec`"
        );
    }

    #[test]
    fn test_vnet2vnet_and_express_route_require_their_peer() {
        let d = data(json!({"type": "Vnet2Vnet", "virtual_network_gateway_id": GATEWAY}));
        assert!(expand_connection_properties(&d)
            .unwrap_err()
            .to_string()
            .starts_with("`peer_virtual_network_gateway_id` must be specified"));

        let d = data(json!({"type": "ExpressRoute", "virtual_network_gateway_id": GATEWAY}));
        assert!(expand_connection_properties(&d)
            .unwrap_err()
            .to_string()
            .starts_with("`express_route_circuit_id` must be specified"));
    }

    #[test]
    fn test_ipsec_connection_properties() {
        let d = data(json!({
            "type": "IPsec",
            "virtual_network_gateway_id": GATEWAY,
            "local_network_gateway_id": LOCAL_GATEWAY,
            "shared_key": "4-v3ry-53cr37-1p53c-5h4r3d-k3y",
            "routing_weight": 0,
            "ipsec_policy": [{
                "dh_group": "DHGroup14",
                "ike_encryption": "AES256",
                "ike_integrity": "SHA256",
                "ipsec_encryption": "AES256",
                "ipsec_integrity": "SHA256",
                "pfs_group": "PFS2048",
                "sa_datasize": 102400000,
                "sa_lifetime": 27000,
            }],
        }));
        let props = expand_connection_properties(&d).unwrap();
        assert!(props.routing_weight.is_none());
        assert_eq!(props.local_network_gateway2, Some(SubResource::new(LOCAL_GATEWAY)));
        assert_eq!(props.shared_key.as_deref(), Some("4-v3ry-53cr37-1p53c-5h4r3d-k3y"));

        let wire = serde_json::to_value(&props).unwrap();
        assert_eq!(wire["ipsecPolicies"][0]["saLifeTimeSeconds"], json!(27000));
        assert_eq!(wire["ipsecPolicies"][0]["dhGroup"], json!("DHGroup14"));
        assert_eq!(
            flatten_ipsec_policies(props.ipsec_policies.as_ref()),
            d.get_list("ipsec_policy").to_vec()
        );
    }

    #[test]
    fn test_invalid_gateway_id() {
        let d = data(json!({
            "type": "IPsec",
            "virtual_network_gateway_id": "/subscriptions/x/resourceGroups/rg",
            "local_network_gateway_id": LOCAL_GATEWAY,
        }));
        assert!(expand_connection_properties(&d).is_err());
    }

    #[test]
    fn test_ipsec_policy_limits() {
        let validate = int_at_least(300);
        assert!(validate(&json!(300), "sa_lifetime").is_ok());
        assert!(validate(&json!(299), "sa_lifetime").is_err());
    }

    #[test]
    fn test_data_source_flatten() {
        let connection: VirtualNetworkGatewayConnection = serde_json::from_value(json!({
            "location": "Local",
            "tags": {"env": "test"},
            "properties": {
                "connectionType": "IPsec",
                "virtualNetworkGateway1": {"id": GATEWAY},
                "localNetworkGateway2": {"id": LOCAL_GATEWAY},
                "routingWeight": 10,
                "sharedKey": "k3y",
                "ingressBytesTransferred": 2048,
                "egressBytesTransferred": 1024,
                "resourceGuid": "4c0c2f4e-0000-0000-0000-000000000000"
            }
        }))
        .unwrap();
        let mut d = ResourceData::from_id("id");
        flatten_connection_data_source(&mut d, &connection);
        assert_eq!(d.get_str("location"), "local");
        assert_eq!(d.get_str("type"), "IPsec");
        assert_eq!(d.get_str("virtual_network_gateway_id"), GATEWAY);
        assert_eq!(d.get_str("local_network_gateway_id"), LOCAL_GATEWAY);
        assert_eq!(d.get_str("peer_virtual_network_gateway_id"), "");
        assert_eq!(d.get_str("express_route_circuit_id"), "");
        assert_eq!(d.get("ingress_bytes_transferred"), Some(&json!(2048)));
        assert_eq!(d.get("egress_bytes_transferred"), Some(&json!(1024)));
        assert_eq!(d.get("enable_bgp"), Some(&json!(false)));
        assert!(d.get_list("ipsec_policy").is_empty());
    }
}
