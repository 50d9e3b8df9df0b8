//! IPv4 address and CIDR notation helpers.
//!
//! Used by the attribute validators and by the Key Vault network ACL
//! translation, where the API returns single-address rules as bare IPs.

use std::net::Ipv4Addr;

/// Maximum length for an IPv4 subnet mask (32 bits).
pub const MAX_LENGTH: u8 = 32;

/// IPv4 address with a prefix length.
#[derive(Eq, PartialEq, Debug, Copy, Clone, Hash)]
pub struct Ipv4 {
    pub addr: Ipv4Addr,
    pub mask: u8,
}

impl Ipv4 {
    /// Parse CIDR notation, e.g. `"10.0.0.0/24"`.
    pub fn new(addr_cidr: &str) -> Result<Ipv4, String> {
        let Some((addr, mask)) = addr_cidr.trim().split_once('/') else {
            return Err(format!("invalid CIDR format: {addr_cidr}"));
        };
        let addr: Ipv4Addr = addr.parse().map_err(|_| format!("invalid IP address: {addr}"))?;
        let mask: u8 = mask.parse().map_err(|_| format!("invalid subnet mask: {mask}"))?;
        if mask > MAX_LENGTH {
            return Err("Network length is too long".to_string());
        }
        Ok(Ipv4 { addr, mask })
    }

    /// Parse either a bare address (treated as `/32`) or CIDR notation.
    pub fn parse_address_or_cidr(input: &str) -> Result<Ipv4, String> {
        let input = input.trim();
        if input.contains('/') {
            return Ipv4::new(input);
        }
        let addr: Ipv4Addr = input.parse().map_err(|_| format!("invalid IP address: {input}"))?;
        Ok(Ipv4 {
            addr,
            mask: MAX_LENGTH,
        })
    }

    /// Format the way ARM reports it: single addresses without `/32`.
    pub fn to_rule_string(&self) -> String {
        if self.mask == MAX_LENGTH {
            self.addr.to_string()
        } else {
            self.to_string()
        }
    }
}

/// Normalise an IP rule returned by the API so it compares equal to config.
pub fn normalize_ip_rule(rule: &str) -> String {
    match Ipv4::parse_address_or_cidr(rule) {
        Ok(ip) => ip.to_rule_string(),
        Err(_) => rule.to_string(),
    }
}

impl std::fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cidr() {
        let ip = Ipv4::new("10.0.1.7/24").unwrap();
        assert_eq!(ip.addr, Ipv4Addr::new(10, 0, 1, 7));
        assert_eq!(ip.mask, 24);
        assert_eq!(ip.to_string(), "10.0.1.7/24");
        assert!(Ipv4::new("10.0.0.0").is_err());
        assert!(Ipv4::new("10.0.0.0/33").is_err());
        assert!(Ipv4::new("10.0.0.300/8").is_err());
        assert!(Ipv4::new("10.0.0.0/8/8").is_err());
    }

    #[test]
    fn test_address_or_cidr() {
        assert_eq!(Ipv4::parse_address_or_cidr("1.2.3.4").unwrap().mask, 32);
        assert_eq!(Ipv4::parse_address_or_cidr("1.2.3.0/24").unwrap().mask, 24);
        assert!(Ipv4::parse_address_or_cidr("not-an-ip").is_err());
    }

    #[test]
    fn test_normalize_ip_rule() {
        assert_eq!(normalize_ip_rule("1.2.3.4/32"), "1.2.3.4");
        assert_eq!(normalize_ip_rule("1.2.3.0/24"), "1.2.3.0/24");
        assert_eq!(normalize_ip_rule("1.2.3.4"), "1.2.3.4");
        assert_eq!(normalize_ip_rule("AzureServices"), "AzureServices");
    }
}
