//! Generic ARM resource ID parsing.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// A parsed `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{key}/{value}...` path.
///
/// Segments other than `subscriptions`, `resourceGroups` and the first
/// `providers` stay in [`ResourceId::path`] until popped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: String,
    pub path: BTreeMap<String, String>,
    source: String,
}

impl ResourceId {
    pub fn parse(input: &str) -> Result<Self> {
        let path = path_of(input)?;
        let trimmed = path.trim_start_matches('/').trim_end_matches('/');
        let components: Vec<&str> = trimmed.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(Error::invalid_id(
                input,
                format!("the number of path segments is not divisible by 2 in {trimmed:?}"),
            ));
        }

        let mut subscription_id = String::new();
        let mut provider = String::new();
        let mut segments = BTreeMap::new();
        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(Error::invalid_id(
                    input,
                    format!("Key/Value cannot be empty strings. Key: '{key}', Value: '{value}'"),
                ));
            }
            match key {
                "subscriptions" if subscription_id.is_empty() => subscription_id = value.to_string(),
                "providers" if provider.is_empty() => provider = value.to_string(),
                _ => {
                    segments.insert(key.to_string(), value.to_string());
                }
            }
        }

        if subscription_id.is_empty() {
            return Err(Error::invalid_id(
                input,
                format!("No subscription ID found in: {trimmed:?}"),
            ));
        }

        let resource_group = segments
            .remove("resourceGroups")
            .or_else(|| segments.remove("resourcegroups"))
            .unwrap_or_default();

        if !provider.is_empty() && resource_group.is_empty() {
            return Err(Error::invalid_id(
                input,
                "No resource group name found in path with a provider",
            ));
        }

        Ok(ResourceId {
            subscription_id,
            resource_group,
            provider,
            path: segments,
            source: input.to_string(),
        })
    }

    /// Remove and return the value of `name`.
    pub fn pop_segment(&mut self, name: &str) -> Result<String> {
        match self.path.remove(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(Error::invalid_id(
                &self.source,
                format!("ID was missing the `{name}` element"),
            )),
        }
    }

    /// Like [`ResourceId::pop_segment`] but matching the key in any casing.
    pub fn pop_segment_insensitively(&mut self, name: &str) -> Result<String> {
        let key = self
            .path
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned();
        match key {
            Some(key) => self.pop_segment(&key),
            None => Err(Error::invalid_id(
                &self.source,
                format!("ID was missing the `{name}` element"),
            )),
        }
    }

    /// Error when any segment was not consumed by the typed parser.
    pub fn validate_no_empty_segments(&self) -> Result<()> {
        if self.path.is_empty() {
            return Ok(());
        }
        Err(Error::invalid_id(
            &self.source,
            format!("ID contained more segments than required: {:?}", self.path),
        ))
    }

    pub(crate) fn require_scope(&self) -> Result<()> {
        if self.subscription_id.is_empty() {
            return Err(Error::invalid_id(
                &self.source,
                "ID was missing the 'subscriptions' element",
            ));
        }
        if self.resource_group.is_empty() {
            return Err(Error::invalid_id(
                &self.source,
                "ID was missing the 'resourceGroups' element",
            ));
        }
        Ok(())
    }
}

fn path_of(input: &str) -> Result<String> {
    if input.is_empty() {
        return Err(Error::invalid_id(input, "Cannot parse Azure ID: empty string"));
    }
    if input.starts_with('/') {
        return Ok(input.split('?').next().unwrap_or_default().to_string());
    }
    match reqwest::Url::parse(input) {
        Ok(url) => Ok(url.path().to_string()),
        Err(e) => Err(Error::invalid_id(input, format!("Cannot parse Azure ID: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resource_group_scoped() {
        let mut id = ResourceId::parse(
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/s1",
        )
        .unwrap();
        assert_eq!(id.subscription_id, "sub1");
        assert_eq!(id.resource_group, "rg1");
        assert_eq!(id.provider, "Microsoft.Network");
        assert_eq!(id.pop_segment("virtualNetworks").unwrap(), "vnet1");
        assert_eq!(id.pop_segment("subnets").unwrap(), "s1");
        assert!(id.validate_no_empty_segments().is_ok());
    }

    #[test]
    fn test_lowercase_resource_groups() {
        let id = ResourceId::parse("/subscriptions/sub1/resourcegroups/rg1").unwrap();
        assert_eq!(id.resource_group, "rg1");
    }

    #[test]
    fn test_invalid_inputs() {
        let cases = [
            "",
            "/",
            "/subscriptions/",
            "/subscriptions/sub1/resourceGroups",
            "/resourceGroups/rg1",
            "/subscriptions/sub1//rg",
            "/subscriptions/sub1/providers/Microsoft.Network/virtualNetworks/vnet1",
        ];
        for input in cases {
            assert!(ResourceId::parse(input).is_err(), "expected {input:?} to fail");
        }
    }

    #[test]
    fn test_leftover_segments() {
        let mut id = ResourceId::parse(
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/s1",
        )
        .unwrap();
        id.pop_segment("virtualNetworks").unwrap();
        let err = id.validate_no_empty_segments().unwrap_err();
        assert!(err.to_string().contains("more segments than required"));
    }

    #[test]
    fn test_pop_insensitively() {
        let mut id = ResourceId::parse(
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/VirtualNetworks/vnet1",
        )
        .unwrap();
        assert!(id.clone().pop_segment("virtualNetworks").is_err());
        assert_eq!(id.pop_segment_insensitively("virtualNetworks").unwrap(), "vnet1");
    }
}
