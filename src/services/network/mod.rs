//! Network service.
//!
//! - [`local_network_gateway`] - `azurestack_local_network_gateway`
//! - [`network_interface_security_group_association`] - `azurestack_network_interface_security_group_association`
//! - [`network_security_group`] - `azurestack_network_security_group`
//! - [`network_security_rule`] - `azurestack_network_security_rule`
//! - [`public_ip`] - `azurestack_public_ip`
//! - [`route`] - `azurestack_route`
//! - [`route_table`] - `azurestack_route_table`
//! - [`subnet`] - `azurestack_subnet`
//! - [`virtual_network`] - `azurestack_virtual_network`
//! - [`virtual_network_gateway`] - `azurestack_virtual_network_gateway`
//! - [`virtual_network_gateway_connection`] - `azurestack_virtual_network_gateway_connection` (resource and data source)
//! - [`virtual_network_peering`] - `azurestack_virtual_network_peering`

pub mod local_network_gateway;
pub mod network_interface_security_group_association;
pub mod network_security_group;
pub mod network_security_rule;
pub mod public_ip;
pub mod route;
pub mod route_table;
pub mod subnet;
pub mod virtual_network;
pub mod virtual_network_gateway;
pub mod virtual_network_gateway_connection;
pub mod virtual_network_peering;

use super::ServiceRegistration;
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use crate::poll::StateChangeConf;
use crate::schema::{DataSource, Resource};
use crate::timeouts::OperationContext;
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

pub struct Registration;

impl ServiceRegistration for Registration {
    fn name(&self) -> &'static str {
        "Network"
    }

    fn website_categories(&self) -> Vec<&'static str> {
        vec!["Network"]
    }

    fn supported_data_sources(&self) -> Vec<Arc<dyn DataSource>> {
        vec![
            Arc::new(local_network_gateway::LocalNetworkGatewayDataSource),
            Arc::new(network_security_group::NetworkSecurityGroupDataSource),
            Arc::new(public_ip::PublicIpDataSource),
            Arc::new(subnet::SubnetDataSource),
            Arc::new(virtual_network::VirtualNetworkDataSource),
            Arc::new(virtual_network_gateway::VirtualNetworkGatewayDataSource),
            Arc::new(virtual_network_gateway_connection::VirtualNetworkGatewayConnectionDataSource),
        ]
    }

    fn supported_resources(&self) -> Vec<Arc<dyn Resource>> {
        vec![
            Arc::new(local_network_gateway::LocalNetworkGatewayResource),
            Arc::new(
                network_interface_security_group_association::NetworkInterfaceSecurityGroupAssociationResource,
            ),
            Arc::new(network_security_group::NetworkSecurityGroupResource),
            Arc::new(network_security_rule::NetworkSecurityRuleResource),
            Arc::new(public_ip::PublicIpResource),
            Arc::new(route::RouteResource),
            Arc::new(route_table::RouteTableResource),
            Arc::new(subnet::SubnetResource),
            Arc::new(virtual_network::VirtualNetworkResource),
            Arc::new(virtual_network_gateway::VirtualNetworkGatewayResource),
            Arc::new(virtual_network_gateway_connection::VirtualNetworkGatewayConnectionResource),
            Arc::new(virtual_network_peering::VirtualNetworkPeeringResource),
        ]
    }
}

/// `properties.provisioningState` of any network resource body.
fn provisioning_state(body: &Value) -> String {
    body.pointer("/properties/provisioningState")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Wait until the resource at `id` reports `Succeeded`.
pub(crate) async fn wait_for_provisioning_state(
    client: &Client,
    ctx: &OperationContext,
    id: &str,
    display: impl Display,
) -> Result<()> {
    let conf = StateChangeConf::new(&["Updating"], &["Succeeded"])
        .min_timeout(Duration::from_secs(60))
        .timeout(ctx.remaining());
    let display = display.to_string();
    let polled = display.as_str();
    conf.wait_for_state(move || async move {
        let body: Value = client
            .arm
            .get(ctx, id, NETWORK_API_VERSION)
            .await
            .with_context(|| format!("polling for {polled}"))?;
        let state = provisioning_state(&body);
        Ok(Some(((), state)))
    })
    .await
    .with_context(|| format!("waiting for provisioning state of {display}"))?;
    Ok(())
}

/// Delete `id`; a resource that is already gone counts as deleted.
pub(crate) async fn delete_resource(
    client: &Client,
    ctx: &OperationContext,
    id: &str,
    display: impl Display,
) -> Result<()> {
    match client.arm.delete(ctx, id, NETWORK_API_VERSION).await {
        Ok(()) => Ok(()),
        Err(e) if e.was_not_found() => Ok(()),
        Err(e) => Err(e.context(format!("deleting {display}"))),
    }
}

/// `properties` of a response, which every network resource is expected to carry.
pub(crate) fn require_properties<'a, P>(properties: &'a Option<P>, display: impl Display) -> Result<&'a P> {
    properties
        .as_ref()
        .ok_or_else(|| Error::Validation(format!("retrieving {display}: `properties` was nil")))
}

/// String elements of a nested block field.
pub(crate) fn block_strings(block: &serde_json::Map<String, Value>, key: &str) -> Vec<String> {
    block
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default()
}

pub(crate) fn block_str<'a>(block: &'a serde_json::Map<String, Value>, key: &str) -> &'a str {
    block.get(key).and_then(Value::as_str).unwrap_or_default()
}

pub(crate) fn block_i64(block: &serde_json::Map<String, Value>, key: &str) -> Option<i64> {
    block.get(key).and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_provisioning_state() {
        assert_eq!(
            provisioning_state(&json!({"properties": {"provisioningState": "Updating"}})),
            "Updating"
        );
        assert_eq!(provisioning_state(&json!({"name": "x"})), "");
    }

    #[test]
    fn test_registration_has_unique_type_names() {
        let registration = Registration;
        let resources: HashSet<_> = registration
            .supported_resources()
            .iter()
            .map(|r| r.resource_type())
            .collect();
        assert_eq!(resources.len(), 11);
        assert!(resources.contains("azurestack_virtual_network_peering"));

        let data_sources: HashSet<_> = registration
            .supported_data_sources()
            .iter()
            .map(|r| r.resource_type())
            .collect();
        assert_eq!(data_sources.len(), 6);
        assert!(data_sources.contains("azurestack_subnet"));
    }

    #[test]
    fn test_block_helpers() {
        let block = json!({"a": ["x", "y"], "b": "z", "c": 4});
        let block = block.as_object().unwrap();
        assert_eq!(block_strings(block, "a"), vec!["x", "y"]);
        assert_eq!(block_str(block, "b"), "z");
        assert_eq!(block_str(block, "missing"), "");
        assert_eq!(block_i64(block, "c"), Some(4));
    }
}
