//! Resource identifiers.
//!
//! - [`resource_id`] - generic ARM path parsing
//! - [`network`] - typed ids for `Microsoft.Network` resources
//! - [`keyvault`] - vault ids and Key Vault nested item URLs

mod keyvault;
mod network;
mod resource_id;

pub use keyvault::{AccessPolicyId, NestedItemId, NestedItemType, VaultId};
pub use network::{
    LocalNetworkGatewayId, NetworkGatewayConnectionId, NetworkInterfaceId,
    NetworkSecurityGroupId, PublicIpAddressId, RouteId, RouteTableId, SecurityRuleId, SubnetId,
    VirtualNetworkGatewayId, VirtualNetworkId,
    VirtualNetworkPeeringId,
};
pub use resource_id::ResourceId;

/// Declares a typed resource-group scoped id.
///
/// Segments are listed outermost first; the human readable form lists them
/// innermost first followed by the resource group.
macro_rules! typed_resource_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            display: $display:literal,
            provider: $provider:literal,
            segments: [ $( $field:ident => ($key:literal, $label:literal) ),+ $(,)? ],
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            pub subscription_id: String,
            pub resource_group: String,
            $( pub $field: String, )+
        }

        impl $name {
            pub fn new(
                subscription_id: impl Into<String>,
                resource_group: impl Into<String>,
                $( $field: impl Into<String>, )+
            ) -> Self {
                Self {
                    subscription_id: subscription_id.into(),
                    resource_group: resource_group.into(),
                    $( $field: $field.into(), )+
                }
            }

            pub fn id(&self) -> String {
                let mut out = format!(
                    "/subscriptions/{}/resourceGroups/{}/providers/{}",
                    self.subscription_id, self.resource_group, $provider
                );
                $( out.push_str(&format!("/{}/{}", $key, self.$field)); )+
                out
            }

            pub fn parse(input: &str) -> $crate::error::Result<Self> {
                Self::parse_with(input, false)
            }

            /// Parse ids returned by the API, where segment casing is not stable.
            pub fn parse_insensitively(input: &str) -> $crate::error::Result<Self> {
                Self::parse_with(input, true)
            }

            fn parse_with(input: &str, insensitive: bool) -> $crate::error::Result<Self> {
                let mut id = $crate::ids::ResourceId::parse(input)?;
                id.require_scope()?;
                let pop = |id: &mut $crate::ids::ResourceId, key: &str| {
                    if insensitive {
                        id.pop_segment_insensitively(key)
                    } else {
                        id.pop_segment(key)
                    }
                };
                $( let $field = pop(&mut id, $key)?; )+
                id.validate_no_empty_segments()?;
                Ok(Self {
                    subscription_id: id.subscription_id,
                    resource_group: id.resource_group,
                    $( $field, )+
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut parts: Vec<String> = vec![ $( format!("{} {:?}", $label, self.$field) ),+ ];
                parts.reverse();
                parts.push(format!("Resource Group {:?}", self.resource_group));
                write!(f, "{}: ({})", $display, parts.join(" / "))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::Error;

            fn from_str(s: &str) -> $crate::error::Result<Self> {
                Self::parse(s)
            }
        }
    };
}

pub(crate) use typed_resource_id;

/// Validator form of [`ResourceId::parse`] for `*_id` attributes.
pub fn validate_resource_id(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("expected a resource ID, got an empty string".to_string());
    }
    ResourceId::parse(value)
        .map(|_| ())
        .map_err(|e| format!("expected a valid resource ID: {e}"))
}

pub fn validate_resource_id_or_empty(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    validate_resource_id(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_resource_id() {
        assert!(validate_resource_id("/subscriptions/s/resourceGroups/rg").is_ok());
        assert!(validate_resource_id("").is_err());
        assert!(validate_resource_id("not-an-id").is_err());
        assert!(validate_resource_id_or_empty("").is_ok());
    }

    #[test]
    fn test_typed_ids_from_macro() {
        let subnet: SubnetId = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/s1"
            .parse()
            .unwrap();
        assert_eq!(subnet.virtual_network_name, "vnet1");
        assert_eq!(subnet.name, "s1");
        let vault = VaultId::new("s", "rg", "vault1");
        assert_eq!(VaultId::parse(&vault.id()).unwrap(), vault);
    }
}
