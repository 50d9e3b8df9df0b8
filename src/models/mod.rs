//! ARM wire types.
//!
//! - [`ipv4`] - IPv4/CIDR parsing shared by validators and ACL translation
//! - [`keyvault`] - vaults, access policies, secrets and keys
//! - [`network`] - virtual networks, gateways and friends

pub mod ipv4;
pub mod keyvault;
pub mod network;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub type Tags = BTreeMap<String, String>;

/// Reference to another ARM resource by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SubResource {
    pub fn new(id: impl Into<String>) -> Self {
        SubResource { id: Some(id.into()) }
    }

    /// `None` for an empty id so optional references are omitted.
    pub fn from_optional(id: &str) -> Option<Self> {
        if id.is_empty() {
            None
        } else {
            Some(Self::new(id))
        }
    }
}

pub fn sub_resource_id(input: &Option<SubResource>) -> String {
    input
        .as_ref()
        .and_then(|s| s.id.clone())
        .unwrap_or_default()
}

/// `"West Europe"` and `"westeurope"` are the same location.
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

/// Tags from a `tags` attribute map.
pub fn expand_tags(value: Option<&Value>) -> Option<Tags> {
    let map = value?.as_object()?;
    Some(
        map.iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect(),
    )
}

pub fn flatten_tags(tags: Option<&Tags>) -> Value {
    let mut out = Map::new();
    if let Some(tags) = tags {
        for (k, v) in tags {
            out.insert(k.clone(), Value::String(v.clone()));
        }
    }
    Value::Object(out)
}

/// Tag limits enforced by ARM.
pub fn validate_tags(value: &Value, path: &str) -> Result<(), String> {
    let Some(map) = value.as_object() else {
        return Err(format!("expected {path} to be a map"));
    };
    if map.len() > 50 {
        return Err("a maximum of 50 tags can be applied to each ARM resource".to_string());
    }
    for (k, v) in map {
        if k.len() > 512 {
            return Err(format!("the maximum length for a tag key is 512 characters: {k:?} is {} characters", k.len()));
        }
        let len = v.as_str().map_or_else(|| v.to_string().len(), str::len);
        if len > 256 {
            return Err(format!("the maximum length for a tag value is 256 characters: the value for {k:?} is {len} characters"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_location() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(normalize_location("local"), "local");
    }

    #[test]
    fn test_tags_round_trip() {
        let value = json!({"env": "test", "count": 3});
        let tags = expand_tags(Some(&value)).unwrap();
        assert_eq!(tags.get("count").map(String::as_str), Some("3"));
        assert_eq!(flatten_tags(Some(&tags)), json!({"env": "test", "count": "3"}));
        assert_eq!(flatten_tags(None), json!({}));
    }

    #[test]
    fn test_validate_tags() {
        assert!(validate_tags(&json!({"a": "b"}), "tags").is_ok());
        let too_long = "x".repeat(257);
        assert!(validate_tags(&json!({"a": too_long}), "tags").is_err());
        let many: Map<String, Value> = (0..51).map(|i| (format!("k{i}"), json!("v"))).collect();
        assert!(validate_tags(&Value::Object(many), "tags").is_err());
    }

    #[test]
    fn test_sub_resource() {
        assert!(SubResource::from_optional("").is_none());
        assert_eq!(sub_resource_id(&SubResource::from_optional("/x")), "/x");
        assert_eq!(serde_json::to_value(SubResource::default()).unwrap(), json!({}));
    }
}
