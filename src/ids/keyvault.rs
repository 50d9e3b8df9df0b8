use super::typed_resource_id;
use crate::error::{Error, Result};
use std::fmt;

typed_resource_id! {
    pub struct VaultId {
        display: "Vault",
        provider: "Microsoft.KeyVault",
        segments: [name => ("vaults", "Name")],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NestedItemType {
    Certificate,
    Key,
    Secret,
}

impl NestedItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NestedItemType::Certificate => "certificates",
            NestedItemType::Key => "keys",
            NestedItemType::Secret => "secrets",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "certificates" => Some(NestedItemType::Certificate),
            "keys" => Some(NestedItemType::Key),
            "secrets" => Some(NestedItemType::Secret),
            _ => None,
        }
    }
}

/// A Key Vault data-plane item, e.g.
/// `https://vault1.vault.local.azurestack.external/secrets/secret1/fdf067c93bbb4b22bff4d8b7a9a56217`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedItemId {
    /// `scheme://host/`, always with a trailing slash.
    pub key_vault_base_url: String,
    pub nested_item_type: NestedItemType,
    pub name: String,
    pub version: String,
}

impl NestedItemId {
    pub fn new(
        key_vault_base_url: &str,
        nested_item_type: NestedItemType,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self> {
        let base = reqwest::Url::parse(key_vault_base_url)
            .map_err(|e| Error::invalid_id(key_vault_base_url, format!("parsing vault base url: {e}")))?;
        Ok(NestedItemId {
            key_vault_base_url: base_url_of(&base),
            nested_item_type,
            name: name.into(),
            version: version.into(),
        })
    }

    /// Parse a versioned nested item id.
    pub fn parse(input: &str) -> Result<Self> {
        let item = Self::parse_versionless(input)?;
        if item.version.is_empty() {
            return Err(Error::invalid_id(
                input,
                "expected a key vault versioned ID but no version information was found",
            ));
        }
        Ok(item)
    }

    /// Parse a nested item id where the version is optional.
    pub fn parse_versionless(input: &str) -> Result<Self> {
        let url = reqwest::Url::parse(input)
            .map_err(|e| Error::invalid_id(input, format!("Cannot parse Azure KeyVault Child Id: {e}")))?;
        if url.host_str().is_none() {
            return Err(Error::invalid_id(input, "Key Vault child id has no host"));
        }
        let path = url.path().trim_start_matches('/').trim_end_matches('/');
        let components: Vec<&str> = path.split('/').collect();
        if components.len() != 2 && components.len() != 3 {
            return Err(Error::invalid_id(
                input,
                format!(
                    "KeyVault Nested Item should contain 2 or 3 segments, got {} from {path:?}",
                    components.len()
                ),
            ));
        }
        if components.iter().any(|c| c.is_empty()) {
            return Err(Error::invalid_id(input, "KeyVault Nested Item has an empty segment"));
        }
        let nested_item_type = NestedItemType::from_segment(components[0]).ok_or_else(|| {
            Error::invalid_id(
                input,
                format!("unsupported KeyVault Nested Item type {:?}", components[0]),
            )
        })?;
        Ok(NestedItemId {
            key_vault_base_url: base_url_of(&url),
            nested_item_type,
            name: components[1].to_string(),
            version: components.get(2).map(|v| v.to_string()).unwrap_or_default(),
        })
    }

    pub fn id(&self) -> String {
        let mut segments = vec![
            self.key_vault_base_url.trim_end_matches('/'),
            self.nested_item_type.as_str(),
            self.name.as_str(),
        ];
        if !self.version.is_empty() {
            segments.push(self.version.as_str());
        }
        segments.join("/")
    }

    pub fn versionless_id(&self) -> String {
        format!(
            "{}/{}/{}",
            self.key_vault_base_url.trim_end_matches('/'),
            self.nested_item_type.as_str(),
            self.name
        )
    }
}

impl fmt::Display for NestedItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

fn base_url_of(url: &reqwest::Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{host}:{port}/", url.scheme()),
        None => format!("{}://{host}/", url.scheme()),
    }
}

/// `{vaultId}/objectId/{objectId}[/applicationId/{applicationId}]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicyId {
    pub vault: VaultId,
    pub object_id: String,
    pub application_id: String,
}

impl AccessPolicyId {
    pub fn new(vault: VaultId, object_id: impl Into<String>, application_id: impl Into<String>) -> Self {
        AccessPolicyId {
            vault,
            object_id: object_id.into(),
            application_id: application_id.into(),
        }
    }

    pub fn id(&self) -> String {
        let mut out = format!("{}/objectId/{}", self.vault.id(), self.object_id);
        if !self.application_id.is_empty() {
            out.push_str(&format!("/applicationId/{}", self.application_id));
        }
        out
    }

    pub fn parse(input: &str) -> Result<Self> {
        let (vault_part, rest) = match input.find("/objectId/") {
            Some(idx) => (&input[..idx], &input[idx + 1..]),
            None => {
                return Err(Error::invalid_id(input, "ID was missing the `objectId` element"))
            }
        };
        let vault = VaultId::parse(vault_part)?;
        let parts: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
        match parts.as_slice() {
            ["objectId", object_id] if !object_id.is_empty() => {
                Ok(AccessPolicyId::new(vault, *object_id, ""))
            }
            ["objectId", object_id, "applicationId", application_id]
                if !object_id.is_empty() && !application_id.is_empty() =>
            {
                Ok(AccessPolicyId::new(vault, *object_id, *application_id))
            }
            _ => Err(Error::invalid_id(
                input,
                "expected `objectId/{objectId}` optionally followed by `applicationId/{applicationId}`",
            )),
        }
    }
}

impl fmt::Display for AccessPolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Access Policy: (Object ID {:?} / {})", self.object_id, self.vault)
    }
}
