//! `azurestack_network_interface_security_group_association` resource.
//!
//! The association has no ARM object of its own: it is the
//! `networkSecurityGroup` reference on the network interface. Its id joins the
//! two resource ids with `|`.

use super::require_properties;
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use crate::ids::{NetworkInterfaceId, NetworkSecurityGroupId};
use crate::locks::{NETWORK_INTERFACE_RESOURCE_NAME, NETWORK_SECURITY_GROUP_RESOURCE_NAME};
use crate::models::network::NetworkInterface;
use crate::models::SubResource;
use crate::schema::{validate, Attribute, Resource, ResourceData, Schema, ValueType};
use crate::services::{get_existing, get_or_clear};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const RESOURCE_TYPE: &str = "azurestack_network_interface_security_group_association";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Association {
    network_interface_id: String,
    network_security_group_id: String,
}

pub fn association_id(nic: &NetworkInterfaceId, nsg: &NetworkSecurityGroupId) -> String {
    format!("{}|{}", nic.id(), nsg.id())
}

/// Split `{networkInterfaceId}|{networkSecurityGroupId}`.
pub fn parse_association_id(input: &str) -> Result<(NetworkInterfaceId, NetworkSecurityGroupId)> {
    let parts: Vec<&str> = input.split('|').collect();
    let [nic, nsg] = parts.as_slice() else {
        return Err(Error::Validation(format!(
            "Expected ID to be in the format {{networkInterfaceId}}|{{networkSecurityGroupId}} but got {input:?}"
        )));
    };
    Ok((NetworkInterfaceId::parse(nic)?, NetworkSecurityGroupId::parse(nsg)?))
}

pub struct NetworkInterfaceSecurityGroupAssociationResource;

#[async_trait]
impl Resource for NetworkInterfaceSecurityGroupAssociationResource {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "network_interface_id",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::network_interface_id),
            )
            .attr(
                "network_security_group_id",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::network_security_group_id),
            )
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();
        log::info!("[INFO] preparing arguments for Network Interface <-> Network Security Group Association creation.");

        let args: Association = d.decode()?;
        let nic_id = NetworkInterfaceId::parse(&args.network_interface_id)?;
        let nsg_id = NetworkSecurityGroupId::parse(&args.network_security_group_id)?;

        let _nic_lock = client.locks.by_name(&nic_id.name, NETWORK_INTERFACE_RESOURCE_NAME).await;
        let _nsg_lock = client
            .locks
            .by_name(&nsg_id.name, NETWORK_SECURITY_GROUP_RESOURCE_NAME)
            .await;

        let mut nic: NetworkInterface = get_existing(client, &ctx, &nic_id.id(), &nic_id, NETWORK_API_VERSION).await?;
        let mut props = require_properties(&nic.properties, &nic_id)?.clone();

        let id = association_id(&nic_id, &nsg_id);
        if props.network_security_group.is_some() {
            return Err(Error::import_as_exists(RESOURCE_TYPE, id));
        }

        props.network_security_group = Some(SubResource::new(nsg_id.id()));
        nic.properties = Some(props);
        let _: Value = client
            .arm
            .put(&ctx, &nic_id.id(), NETWORK_API_VERSION, &nic)
            .await
            .with_context(|| format!("updating Security Group Association for {nic_id}"))?;

        d.set_id(id);
        self.read(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let (nic_id, _) = parse_association_id(d.id())?;

        let Some(nic) = get_or_clear::<NetworkInterface>(client, &ctx, d, &nic_id.id(), &nic_id, NETWORK_API_VERSION).await?
        else {
            return Ok(());
        };
        let props = require_properties(&nic.properties, &nic_id)?;

        let Some(nsg) = props.network_security_group.as_ref().and_then(|nsg| nsg.id.clone()) else {
            log::debug!("[DEBUG] {nic_id} doesn't have a Network Security Group attached - removing from state!");
            d.set_id("");
            return Ok(());
        };

        d.encode(&Association {
            network_interface_id: nic.id.clone().unwrap_or_else(|| nic_id.id()),
            network_security_group_id: nsg,
        })
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        // every attribute forces a new association
        self.read(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let (nic_id, _) = parse_association_id(d.id())?;

        let _nic_lock = client.locks.by_name(&nic_id.name, NETWORK_INTERFACE_RESOURCE_NAME).await;

        let mut nic: NetworkInterface = get_existing(client, &ctx, &nic_id.id(), &nic_id, NETWORK_API_VERSION).await?;
        let mut props = require_properties(&nic.properties, &nic_id)?.clone();
        props.network_security_group = None;
        nic.properties = Some(props);

        let _: Value = client
            .arm
            .put(&ctx, &nic_id.id(), NETWORK_API_VERSION, &nic)
            .await
            .with_context(|| format!("removing Security Group Association for {nic_id}"))?;
        Ok(())
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        parse_association_id(id).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NIC: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/nic1";
    const NSG: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/networkSecurityGroups/nsg1";

    #[test]
    fn test_association_id_round_trip() {
        let id = format!("{NIC}|{NSG}");
        let (nic, nsg) = parse_association_id(&id).unwrap();
        assert_eq!(nic.name, "nic1");
        assert_eq!(nsg.name, "nsg1");
        assert_eq!(association_id(&nic, &nsg), id);
    }

    #[test]
    fn test_association_id_rejects_bad_input() {
        let err = parse_association_id(NIC).unwrap_err();
        assert!(err.to_string().starts_with("Expected ID to be in the format"), "{err}");
        assert!(parse_association_id(&format!("{NIC}|{NSG}|{NSG}")).is_err());
        // halves in the wrong order
        assert!(parse_association_id(&format!("{NSG}|{NIC}")).is_err());
    }

    #[test]
    fn test_import_validates_both_halves() {
        let resource = NetworkInterfaceSecurityGroupAssociationResource;
        assert!(resource.validate_import_id(&format!("{NIC}|{NSG}")).is_ok());
        assert!(resource.validate_import_id(&format!("{NIC}|/subscriptions/x")).is_err());
    }

    #[test]
    fn test_schema_checks_id_types() {
        let schema = NetworkInterfaceSecurityGroupAssociationResource.schema();
        let valid = serde_json::json!({"network_interface_id": NIC, "network_security_group_id": NSG});
        assert!(schema.validate(valid.as_object().unwrap()).is_ok());
        let swapped = serde_json::json!({"network_interface_id": NIC, "network_security_group_id": NIC});
        assert!(schema.validate(swapped.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_association_arguments() {
        let mut d = ResourceData::new(
            serde_json::json!({"network_interface_id": NIC, "network_security_group_id": NSG})
                .as_object()
                .unwrap()
                .clone(),
        );
        let args: Association = d.decode().unwrap();
        assert_eq!(args.network_interface_id, NIC);

        d.encode(&Association {
            network_interface_id: NIC.to_string(),
            network_security_group_id: "/other".to_string(),
        })
        .unwrap();
        assert_eq!(d.get_str("network_security_group_id"), "/other");
        assert!(ResourceData::from_id("x").decode::<Association>().is_err());
    }
}
