//! `azurestack_virtual_network_peering` resource.
//!
//! Peerings on either side of a pair conflict with each other, so every
//! peering operation in the provider is serialised on one lock and retried
//! while the remote network is still provisioning.

use super::delete_resource;
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use crate::ids::VirtualNetworkPeeringId;
use crate::locks::PEERING_LOCK_ID;
use crate::models::network::{VirtualNetworkPeering, VirtualNetworkPeeringProperties};
use crate::models::{sub_resource_id, SubResource};
use crate::retry::{retry, RetryError};
use crate::schema::{common, validate, Attribute, Resource, ResourceData, Schema, ValueType};
use crate::services::{ensure_not_exists, get_or_clear};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const PEERING_RETRY_TIMEOUT: Duration = Duration::from_secs(300);

/// A remote network that is still provisioning is worth another attempt.
fn classify_peering_error(err: Error) -> RetryError {
    if err.was_bad_request() && err.to_string().contains("ReferencedResourceNotProvisioned") {
        log::debug!("[DEBUG] remote virtual network is not provisioned yet: {err}");
        return RetryError::Retryable(err);
    }
    RetryError::from_error(err)
}

fn expand_peering_properties(d: &ResourceData) -> VirtualNetworkPeeringProperties {
    VirtualNetworkPeeringProperties {
        allow_virtual_network_access: Some(d.get_bool("allow_virtual_network_access")),
        allow_forwarded_traffic: Some(d.get_bool("allow_forwarded_traffic")),
        allow_gateway_transit: Some(d.get_bool("allow_gateway_transit")),
        use_remote_gateways: Some(d.get_bool("use_remote_gateways")),
        remote_virtual_network: Some(SubResource::new(d.get_str("remote_virtual_network_id"))),
        ..Default::default()
    }
}

pub struct VirtualNetworkPeeringResource;

impl VirtualNetworkPeeringResource {
    async fn create_update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();
        log::info!("[INFO] preparing arguments for Azure ARM virtual network peering creation.");

        let id = VirtualNetworkPeeringId::new(
            &client.subscription_id,
            d.get_str("resource_group_name"),
            d.get_str("virtual_network_name"),
            d.get_str("name"),
        );
        if d.is_new_resource() {
            ensure_not_exists(client, &ctx, self.resource_type(), &id.id(), &id, NETWORK_API_VERSION).await?;
        }

        let peering = VirtualNetworkPeering {
            name: Some(id.name.clone()),
            properties: Some(expand_peering_properties(d)),
            ..Default::default()
        };

        let _lock = client.locks.by_id(PEERING_LOCK_ID).await;

        let resource_id = id.id();
        let (ctx, resource_id, peering) = (&ctx, resource_id.as_str(), &peering);
        retry(PEERING_RETRY_TIMEOUT.min(ctx.remaining()), move || async move {
            client
                .arm
                .put::<_, Value>(ctx, resource_id, NETWORK_API_VERSION, peering)
                .await
                .map_err(classify_peering_error)
        })
        .await
        .with_context(|| format!("creating/updating {id}"))?;

        d.set_id(id.id());
        self.read(client, d).await
    }
}

#[async_trait]
impl Resource for VirtualNetworkPeeringResource {
    fn resource_type(&self) -> &'static str {
        "azurestack_virtual_network_peering"
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
                "virtual_network_name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::string_is_not_empty),
            )
            .attr(
                "remote_virtual_network_id",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::resource_id),
            )
            .attr(
                "allow_virtual_network_access",
                Attribute::optional(ValueType::Bool).default(true),
            )
            .attr("allow_forwarded_traffic", Attribute::optional_computed(ValueType::Bool))
            .attr("allow_gateway_transit", Attribute::optional_computed(ValueType::Bool))
            .attr("use_remote_gateways", Attribute::optional_computed(ValueType::Bool))
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = VirtualNetworkPeeringId::parse(d.id())?;

        let Some(peering) =
            get_or_clear::<VirtualNetworkPeering>(client, &ctx, d, &id.id(), &id, NETWORK_API_VERSION).await?
        else {
            return Ok(());
        };

        d.set("name", id.name.as_str());
        d.set("resource_group_name", id.resource_group.as_str());
        d.set("virtual_network_name", id.virtual_network_name.as_str());
        if let Some(props) = &peering.properties {
            d.set(
                "allow_virtual_network_access",
                props.allow_virtual_network_access.unwrap_or_default(),
            );
            d.set("allow_forwarded_traffic", props.allow_forwarded_traffic.unwrap_or_default());
            d.set("allow_gateway_transit", props.allow_gateway_transit.unwrap_or_default());
            d.set("use_remote_gateways", props.use_remote_gateways.unwrap_or_default());
            d.set("remote_virtual_network_id", sub_resource_id(&props.remote_virtual_network));
        }
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = VirtualNetworkPeeringId::parse(d.id())?;

        let _lock = client.locks.by_id(PEERING_LOCK_ID).await;
        delete_resource(client, &ctx, &id.id(), &id).await
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        VirtualNetworkPeeringId::parse(id).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api_error(status: u16, code: &str) -> Error {
        Error::Api {
            status,
            code: code.into(),
            message: "Referenced resource is not provisioned yet".into(),
        }
    }

    #[test]
    fn test_classify_peering_error() {
        assert!(matches!(
            classify_peering_error(api_error(400, "ReferencedResourceNotProvisioned")),
            RetryError::Retryable(_)
        ));
        assert!(matches!(
            classify_peering_error(api_error(400, "InvalidRequestFormat")),
            RetryError::NonRetryable(_)
        ));
        assert!(matches!(
            classify_peering_error(Error::Validation("bad".into())),
            RetryError::NonRetryable(_)
        ));
    }

    #[test]
    fn test_expand_peering_properties() {
        let d = ResourceData::new(
            json!({
                "remote_virtual_network_id": "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/remote",
                "allow_virtual_network_access": true,
                "use_remote_gateways": false,
            })
            .as_object()
            .unwrap()
            .clone(),
        );
        let props = expand_peering_properties(&d);
        assert_eq!(props.allow_virtual_network_access, Some(true));
        assert_eq!(props.allow_forwarded_traffic, Some(false));
        assert!(sub_resource_id(&props.remote_virtual_network).ends_with("/virtualNetworks/remote"));
    }

    #[test]
    fn test_remote_network_must_be_a_resource_id() {
        let schema = VirtualNetworkPeeringResource.schema();
        let attrs = json!({
            "name": "peer",
            "resource_group_name": "rg",
            "virtual_network_name": "vnet1",
            "remote_virtual_network_id": "vnet2",
        });
        assert!(schema.validate(attrs.as_object().unwrap()).is_err());
    }
}
