//! Attribute validators.
//!
//! Each validator has the shape expected by [`Attribute::validate`](super::Attribute::validate):
//! value and attribute path in, an error message out.

use crate::ids;
use crate::models::ipv4::Ipv4;
use regex::Regex;
use serde_json::Value;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

type ValidationResult = Result<(), String>;

static VAULT_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
static NESTED_ITEM_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
static RESOURCE_GROUP_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn vault_name_regex() -> &'static Regex {
    VAULT_NAME_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9-]{3,24}$").expect("Invalid Regex"))
}

fn nested_item_name_regex() -> &'static Regex {
    NESTED_ITEM_NAME_REGEX.get_or_init(|| Regex::new(r"^[0-9a-zA-Z-]+$").expect("Invalid Regex"))
}

fn resource_group_name_regex() -> &'static Regex {
    RESOURCE_GROUP_NAME_REGEX.get_or_init(|| Regex::new(r"^[-\w._()]+$").expect("Invalid Regex"))
}

fn as_str<'a>(value: &'a Value, path: &str) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected type of {path:?} to be string"))
}

pub fn string_is_not_empty(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    if s.is_empty() {
        return Err(format!("expected {path:?} to not be an empty string, got {s:?}"));
    }
    Ok(())
}

pub fn string_in_slice(
    valid: &'static [&'static str],
    ignore_case: bool,
) -> impl Fn(&Value, &str) -> ValidationResult + Send + Sync + 'static {
    move |value, path| {
        let s = as_str(value, path)?;
        let found = valid.iter().any(|v| {
            if ignore_case {
                v.eq_ignore_ascii_case(s)
            } else {
                *v == s
            }
        });
        if found {
            Ok(())
        } else {
            Err(format!("expected {path} to be one of {valid:?}, got {s}"))
        }
    }
}

pub fn int_between(
    min: i64,
    max: i64,
) -> impl Fn(&Value, &str) -> ValidationResult + Send + Sync + 'static {
    move |value, path| {
        let n = value
            .as_i64()
            .ok_or_else(|| format!("expected type of {path} to be integer"))?;
        if n < min || n > max {
            return Err(format!("expected {path} to be in the range ({min} - {max}), got {n}"));
        }
        Ok(())
    }
}

pub fn rfc3339_time(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|_| ())
        .map_err(|e| format!("{path:?}: invalid RFC3339 timestamp {s:?}: {e}"))
}

pub fn is_uuid(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    uuid::Uuid::parse_str(s)
        .map(|_| ())
        .map_err(|_| format!("expected {path:?} to be a valid UUID, got {s}"))
}

pub fn is_uuid_or_empty(value: &Value, path: &str) -> ValidationResult {
    match value.as_str() {
        Some("") => Ok(()),
        _ => is_uuid(value, path),
    }
}

pub fn ipv4_address(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    s.parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| format!("expected {path} to contain a valid IPv4 address, got: {s}"))
}

pub fn cidr(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    Ipv4::new(s)
        .map(|_| ())
        .map_err(|e| format!("{path:?} is not a valid CIDR block: {e}"))
}

pub fn ipv4_or_cidr(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    Ipv4::parse_address_or_cidr(s)
        .map(|_| ())
        .map_err(|e| format!("{path:?} must be an IPv4 address or CIDR block: {e}"))
}

pub fn vault_name(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    if !vault_name_regex().is_match(s) {
        return Err(format!(
            "{path:?} may only contain alphanumeric characters and dashes and must be between 3-24 chars"
        ));
    }
    Ok(())
}

pub fn nested_item_name(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    if !nested_item_name_regex().is_match(s) {
        return Err(format!(
            "{path:?} may only contain alphanumeric characters and dashes"
        ));
    }
    Ok(())
}

pub fn resource_group_name(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    if s.is_empty() || s.len() > 90 {
        return Err(format!("{path} may not be empty and may not exceed 90 characters in length"));
    }
    if s.ends_with('.') {
        return Err(format!("{path} cannot end with a period"));
    }
    if !resource_group_name_regex().is_match(s) {
        return Err(format!(
            "{path} may only contain alphanumeric characters, dash, underscores, parentheses and periods"
        ));
    }
    Ok(())
}

pub fn resource_id(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    ids::validate_resource_id(s).map_err(|e| format!("{path:?}: {e}"))
}

pub fn resource_id_or_empty(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    ids::validate_resource_id_or_empty(s).map_err(|e| format!("{path:?}: {e}"))
}

pub fn network_interface_id(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    ids::NetworkInterfaceId::parse(s)
        .map(|_| ())
        .map_err(|e| format!("{path:?}: {e}"))
}

pub fn network_security_group_id(value: &Value, path: &str) -> ValidationResult {
    let s = as_str(value, path)?;
    ids::NetworkSecurityGroupId::parse(s)
        .map(|_| ())
        .map_err(|e| format!("{path:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_in_slice() {
        let v = string_in_slice(&["Allow", "Deny"], false);
        assert!(v(&json!("Allow"), "default_action").is_ok());
        assert!(v(&json!("allow"), "default_action").is_err());
        let v = string_in_slice(&["Allow", "Deny"], true);
        assert!(v(&json!("allow"), "default_action").is_ok());
    }

    #[test]
    fn test_int_between() {
        let v = int_between(0, 32000);
        assert!(v(&json!(10), "routing_weight").is_ok());
        assert_eq!(
            v(&json!(32001), "routing_weight").unwrap_err(),
            "expected routing_weight to be in the range (0 - 32000), got 32001"
        );
    }

    #[test]
    fn test_names() {
        assert!(vault_name(&json!("my-vault-01"), "name").is_ok());
        assert!(vault_name(&json!("ab"), "name").is_err());
        assert!(vault_name(&json!("under_score"), "name").is_err());
        assert!(nested_item_name(&json!("secret-1"), "name").is_ok());
        assert!(nested_item_name(&json!("secret.1"), "name").is_err());
    }

    #[test]
    fn test_addresses() {
        assert!(ipv4_address(&json!("10.0.0.1"), "ip").is_ok());
        assert!(ipv4_address(&json!("10.0.0.1/32"), "ip").is_err());
        assert!(cidr(&json!("10.0.0.0/16"), "prefix").is_ok());
        assert!(cidr(&json!("10.0.0.0"), "prefix").is_err());
        assert!(ipv4_or_cidr(&json!("10.0.0.0"), "rule").is_ok());
        assert!(ipv4_or_cidr(&json!("10.0.0.0/8"), "rule").is_ok());
    }

    #[test]
    fn test_uuid_and_time() {
        assert!(is_uuid(&json!("00000000-0000-0000-0000-000000000000"), "tenant_id").is_ok());
        assert!(is_uuid(&json!("nope"), "tenant_id").is_err());
        assert!(is_uuid_or_empty(&json!(""), "application_id").is_ok());
        assert!(rfc3339_time(&json!("2030-01-01T00:00:00Z"), "expiration_date").is_ok());
        assert!(rfc3339_time(&json!("2030-01-01"), "expiration_date").is_err());
    }

    #[test]
    fn test_resource_group_name() {
        assert!(resource_group_name(&json!("acctestRG-01_(a).b"), "resource_group_name").is_ok());
        assert!(resource_group_name(&json!("ends."), "resource_group_name").is_err());
        assert!(resource_group_name(&json!("has space"), "resource_group_name").is_err());
        assert!(resource_group_name(&json!("x".repeat(91)), "resource_group_name").is_err());
    }

    #[test]
    fn test_non_string_is_rejected() {
        assert!(string_is_not_empty(&json!(1), "name").is_err());
        assert!(string_is_not_empty(&json!(""), "name").is_err());
    }

    #[test]
    fn test_typed_network_ids() {
        let nic = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/nic1";
        let nsg = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkSecurityGroups/nsg1";
        assert!(network_interface_id(&json!(nic), "network_interface_id").is_ok());
        assert!(network_interface_id(&json!(nsg), "network_interface_id").is_err());
        assert!(network_security_group_id(&json!(nsg), "network_security_group_id").is_ok());
        assert!(network_security_group_id(&json!(nic), "network_security_group_id").is_err());
        assert!(network_security_group_id(&json!(1), "network_security_group_id").is_err());
    }
}
