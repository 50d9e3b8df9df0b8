use super::typed_resource_id;

typed_resource_id! {
    pub struct VirtualNetworkId {
        display: "Virtual Network",
        provider: "Microsoft.Network",
        segments: [name => ("virtualNetworks", "Name")],
    }
}

typed_resource_id! {
    pub struct SubnetId {
        display: "Subnet",
        provider: "Microsoft.Network",
        segments: [
            virtual_network_name => ("virtualNetworks", "Virtual Network Name"),
            name => ("subnets", "Name"),
        ],
    }
}

typed_resource_id! {
    pub struct NetworkSecurityGroupId {
        display: "Network Security Group",
        provider: "Microsoft.Network",
        segments: [name => ("networkSecurityGroups", "Name")],
    }
}

typed_resource_id! {
    pub struct SecurityRuleId {
        display: "Security Rule",
        provider: "Microsoft.Network",
        segments: [
            network_security_group_name => ("networkSecurityGroups", "Network Security Group Name"),
            name => ("securityRules", "Name"),
        ],
    }
}

typed_resource_id! {
    pub struct RouteTableId {
        display: "Route Table",
        provider: "Microsoft.Network",
        segments: [name => ("routeTables", "Name")],
    }
}

typed_resource_id! {
    pub struct RouteId {
        display: "Route",
        provider: "Microsoft.Network",
        segments: [
            route_table_name => ("routeTables", "Route Table Name"),
            name => ("routes", "Name"),
        ],
    }
}

typed_resource_id! {
    pub struct PublicIpAddressId {
        display: "Public Ip Address",
        provider: "Microsoft.Network",
        segments: [name => ("publicIPAddresses", "Name")],
    }
}

typed_resource_id! {
    pub struct LocalNetworkGatewayId {
        display: "Local Network Gateway",
        provider: "Microsoft.Network",
        segments: [name => ("localNetworkGateways", "Name")],
    }
}

typed_resource_id! {
    pub struct VirtualNetworkGatewayId {
        display: "Virtual Network Gateway",
        provider: "Microsoft.Network",
        segments: [name => ("virtualNetworkGateways", "Name")],
    }
}

typed_resource_id! {
    pub struct NetworkGatewayConnectionId {
        display: "Network Gateway Connection",
        provider: "Microsoft.Network",
        segments: [name => ("connections", "Name")],
    }
}

typed_resource_id! {
    pub struct VirtualNetworkPeeringId {
        display: "Virtual Network Peering",
        provider: "Microsoft.Network",
        segments: [
            virtual_network_name => ("virtualNetworks", "Virtual Network Name"),
            name => ("virtualNetworkPeerings", "Name"),
        ],
    }
}

typed_resource_id! {
    pub struct NetworkInterfaceId {
        display: "Network Interface",
        provider: "Microsoft.Network",
        segments: [name => ("networkInterfaces", "Name")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUB: &str = "12345678-1234-9876-4563-123456789012";

    #[test]
    fn test_subnet_id_round_trip() {
        let id = SubnetId::new(SUB, "group1", "network1", "subnet1");
        let formatted = id.id();
        assert_eq!(
            formatted,
            format!("/subscriptions/{SUB}/resourceGroups/group1/providers/Microsoft.Network/virtualNetworks/network1/subnets/subnet1")
        );
        assert_eq!(SubnetId::parse(&formatted).unwrap(), id, "parse(format(id)) == id");
    }

    #[test]
    fn test_round_trip_all_network_ids() {
        let vnet = VirtualNetworkId::new(SUB, "rg", "vnet");
        assert_eq!(VirtualNetworkId::parse(&vnet.id()).unwrap(), vnet);
        let nsg = NetworkSecurityGroupId::new(SUB, "rg", "nsg");
        assert_eq!(NetworkSecurityGroupId::parse(&nsg.id()).unwrap(), nsg);
        let rule = SecurityRuleId::new(SUB, "rg", "nsg", "rule");
        assert_eq!(SecurityRuleId::parse(&rule.id()).unwrap(), rule);
        let rt = RouteTableId::new(SUB, "rg", "rt");
        assert_eq!(RouteTableId::parse(&rt.id()).unwrap(), rt);
        let route = RouteId::new(SUB, "rg", "rt", "route");
        assert_eq!(RouteId::parse(&route.id()).unwrap(), route);
        let pip = PublicIpAddressId::new(SUB, "rg", "pip");
        assert_eq!(PublicIpAddressId::parse(&pip.id()).unwrap(), pip);
        let lgw = LocalNetworkGatewayId::new(SUB, "rg", "lgw");
        assert_eq!(LocalNetworkGatewayId::parse(&lgw.id()).unwrap(), lgw);
        let gw = VirtualNetworkGatewayId::new(SUB, "rg", "gw");
        assert_eq!(VirtualNetworkGatewayId::parse(&gw.id()).unwrap(), gw);
        let conn = NetworkGatewayConnectionId::new(SUB, "rg", "conn");
        assert_eq!(NetworkGatewayConnectionId::parse(&conn.id()).unwrap(), conn);
        let peering = VirtualNetworkPeeringId::new(SUB, "rg", "vnet", "peer");
        assert_eq!(VirtualNetworkPeeringId::parse(&peering.id()).unwrap(), peering);
        let nic = NetworkInterfaceId::new(SUB, "rg", "nic");
        assert_eq!(NetworkInterfaceId::parse(&nic.id()).unwrap(), nic);
    }

    #[test]
    fn test_subnet_id_invalid() {
        let cases = [
            // empty
            "".to_string(),
            // missing subscription value
            "/subscriptions/".to_string(),
            // missing resource group
            format!("/subscriptions/{SUB}/"),
            format!("/subscriptions/{SUB}/resourceGroups/"),
            // missing subnet
            format!("/subscriptions/{SUB}/resourceGroups/group1/providers/Microsoft.Network/virtualNetworks/network1"),
            format!("/subscriptions/{SUB}/resourceGroups/group1/providers/Microsoft.Network/virtualNetworks/network1/subnets/"),
            // upper-cased
            format!("/SUBSCRIPTIONS/{SUB}/RESOURCEGROUPS/GROUP1/PROVIDERS/MICROSOFT.NETWORK/VIRTUALNETWORKS/NETWORK1/SUBNETS/SUBNET1"),
            // extra segment
            format!("/subscriptions/{SUB}/resourceGroups/group1/providers/Microsoft.Network/virtualNetworks/network1/subnets/subnet1/ipConfigurations/ip1"),
        ];
        for input in cases {
            assert!(SubnetId::parse(&input).is_err(), "expected {input:?} to be rejected");
        }
    }

    #[test]
    fn test_subnet_id_insensitively() {
        let input = format!("/subscriptions/{SUB}/resourceGroups/group1/providers/Microsoft.Network/VirtualNetworks/network1/Subnets/subnet1");
        assert!(SubnetId::parse(&input).is_err());
        let id = SubnetId::parse_insensitively(&input).unwrap();
        assert_eq!(id.virtual_network_name, "network1");
        assert_eq!(id.name, "subnet1");
    }

    #[test]
    fn test_display() {
        let id = SubnetId::new(SUB, "group1", "network1", "subnet1");
        assert_eq!(
            id.to_string(),
            r#"Subnet: (Name "subnet1" / Virtual Network Name "network1" / Resource Group "group1")"#
        );
        let vnet: VirtualNetworkId = vnet_id().parse().unwrap();
        assert_eq!(
            vnet.to_string(),
            r#"Virtual Network: (Name "network1" / Resource Group "group1")"#
        );
    }

    fn vnet_id() -> String {
        format!("/subscriptions/{SUB}/resourceGroups/group1/providers/Microsoft.Network/virtualNetworks/network1")
    }
}
