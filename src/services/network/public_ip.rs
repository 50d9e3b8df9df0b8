//! `azurestack_public_ip` resource and data source.

use super::delete_resource;
use crate::clients::Client;
use crate::config::NETWORK_API_VERSION;
use crate::error::{Error, Result, ResultExt};
use crate::ids::PublicIpAddressId;
use crate::models::network::{PublicIpAddress, PublicIpAddressDnsSettings, PublicIpAddressProperties, Sku};
use crate::models::{expand_tags, flatten_tags, normalize_location};
use crate::schema::{common, validate, Attribute, DataSource, Resource, ResourceData, Schema, ValueType};
use crate::services::{ensure_not_exists, get_existing, get_or_clear};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const RESOURCE_TYPE: &str = "azurestack_public_ip";

static DOMAIN_NAME_LABEL_REGEX: OnceLock<Regex> = OnceLock::new();

fn domain_name_label_regex() -> &'static Regex {
    DOMAIN_NAME_LABEL_REGEX.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]{1,61}[a-z0-9]$").expect("Invalid Regex"))
}

fn domain_name_label(value: &Value, path: &str) -> std::result::Result<(), String> {
    let s = value.as_str().unwrap_or_default();
    if !domain_name_label_regex().is_match(s) {
        return Err(format!(
            "{path} must contain only lowercase alphanumeric characters, numbers and hyphens. It must start with a letter and end only with a number or letter"
        ));
    }
    Ok(())
}

/// `allocation_method`, falling back to the deprecated `public_ip_address_allocation`.
fn allocation_method(d: &ResourceData) -> String {
    match d.get_str("allocation_method") {
        "" => d.get_str("public_ip_address_allocation").to_string(),
        method => method.to_string(),
    }
}

pub fn expand_public_ip(d: &ResourceData) -> Result<PublicIpAddress> {
    let sku = d.get_str("sku");
    let method = allocation_method(d);
    if method.is_empty() {
        return Err(Error::Validation(
            "one of `allocation_method` or `public_ip_address_allocation` must be specified".to_string(),
        ));
    }
    if sku.eq_ignore_ascii_case("standard") && !method.eq_ignore_ascii_case("static") {
        return Err(Error::Validation(
            "Static IP allocation must be used when creating Standard SKU public IP addresses.".to_string(),
        ));
    }

    let domain_name_label = d.get_ok("domain_name_label").and_then(Value::as_str);
    let reverse_fqdn = d.get_ok("reverse_fqdn").and_then(Value::as_str);
    let dns_settings = if domain_name_label.is_some() || reverse_fqdn.is_some() {
        Some(PublicIpAddressDnsSettings {
            domain_name_label: domain_name_label.map(String::from),
            reverse_fqdn: reverse_fqdn.map(String::from),
            fqdn: None,
        })
    } else {
        None
    };

    Ok(PublicIpAddress {
        name: Some(d.get_str("name").to_string()),
        location: Some(normalize_location(d.get_str("location"))),
        tags: expand_tags(d.get("tags")),
        sku: Some(Sku {
            name: Some(sku.to_string()),
            tier: None,
        }),
        properties: Some(PublicIpAddressProperties {
            public_ip_allocation_method: Some(method),
            public_ip_address_version: Some(d.get_str("ip_version").to_string()),
            idle_timeout_in_minutes: Some(d.get_i64("idle_timeout_in_minutes")),
            dns_settings,
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn flatten_public_ip(d: &mut ResourceData, ip: &PublicIpAddress) {
    d.set("location", normalize_location(ip.location.as_deref().unwrap_or_default()));
    d.set(
        "sku",
        ip.sku.as_ref().and_then(|s| s.name.clone()).unwrap_or_default(),
    );
    if let Some(props) = &ip.properties {
        let method = props.public_ip_allocation_method.clone().unwrap_or_default();
        d.set("allocation_method", method.as_str());
        d.set("ip_version", props.public_ip_address_version.clone().unwrap_or_default());
        let dns = props.dns_settings.clone().unwrap_or_default();
        d.set("fqdn", dns.fqdn.unwrap_or_default());
        d.set("reverse_fqdn", dns.reverse_fqdn.unwrap_or_default());
        d.set("domain_name_label", dns.domain_name_label.unwrap_or_default());
        d.set("ip_address", props.ip_address.clone().unwrap_or_default());
        d.set("idle_timeout_in_minutes", props.idle_timeout_in_minutes.unwrap_or_default());
    }
    d.set("tags", flatten_tags(ip.tags.as_ref()));
}

pub struct PublicIpResource;

impl PublicIpResource {
    async fn create_update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.create_update_context();
        log::info!("[INFO] preparing arguments for azurestack Public IP creation.");

        let id = PublicIpAddressId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));
        if d.is_new_resource() {
            ensure_not_exists(client, &ctx, self.resource_type(), &id.id(), &id, NETWORK_API_VERSION).await?;
        }

        let public_ip = expand_public_ip(d)?;
        let _: Value = client
            .arm
            .put(&ctx, &id.id(), NETWORK_API_VERSION, &public_ip)
            .await
            .with_context(|| format!("creating/updating {id}"))?;

        d.set_id(id.id());
        self.read(client, d).await
    }
}

#[async_trait]
impl Resource for PublicIpResource {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validate::string_is_not_empty),
            )
            .attr("location", common::location())
            .attr("resource_group_name", common::resource_group_name())
            .attr(
                "public_ip_address_allocation",
                Attribute::optional_computed(ValueType::String)
                    .validate(validate::string_in_slice(&["Dynamic", "Static"], true)),
            )
            .attr(
                "allocation_method",
                Attribute::optional_computed(ValueType::String)
                    .validate(validate::string_in_slice(&["Static", "Dynamic"], false)),
            )
            .attr(
                "ip_version",
                Attribute::optional(ValueType::String)
                    .force_new()
                    .default("IPv4")
                    .validate(validate::string_in_slice(&["IPv4", "IPv6"], true)),
            )
            .attr(
                "sku",
                Attribute::optional(ValueType::String)
                    .force_new()
                    .default("Basic")
                    .validate(validate::string_in_slice(&["Basic", "Standard"], true)),
            )
            .attr(
                "idle_timeout_in_minutes",
                Attribute::optional(ValueType::Int)
                    .default(4)
                    .validate(validate::int_between(4, 30)),
            )
            .attr(
                "domain_name_label",
                Attribute::optional(ValueType::String).validate(domain_name_label),
            )
            .attr("fqdn", common::computed_string())
            .attr("reverse_fqdn", Attribute::optional(ValueType::String))
            .attr("ip_address", common::computed_string())
            .attr("tags", common::tags())
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = PublicIpAddressId::parse(d.id())?;

        let Some(ip) = get_or_clear::<PublicIpAddress>(client, &ctx, d, &id.id(), &id, NETWORK_API_VERSION).await?
        else {
            return Ok(());
        };

        d.set("name", id.name.as_str());
        d.set("resource_group_name", id.resource_group.as_str());
        flatten_public_ip(d, &ip);
        let method = d.get_str("allocation_method").to_string();
        d.set("public_ip_address_allocation", method);
        Ok(())
    }

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        self.create_update(client, d).await
    }

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.delete_context();
        let id = PublicIpAddressId::parse(d.id())?;
        delete_resource(client, &ctx, &id.id(), &id).await
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        PublicIpAddressId::parse(id).map(|_| ())
    }
}

pub struct PublicIpDataSource;

#[async_trait]
impl DataSource for PublicIpDataSource {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "name",
                Attribute::required(ValueType::String).validate(validate::string_is_not_empty),
            )
            .attr("location", common::location_computed())
            .attr("resource_group_name", common::resource_group_name_for_data_source())
            .attr("sku", common::computed_string())
            .attr("allocation_method", common::computed_string())
            .attr("ip_version", common::computed_string())
            .attr("domain_name_label", common::computed_string())
            .attr("idle_timeout_in_minutes", common::computed_int())
            .attr("fqdn", common::computed_string())
            .attr("reverse_fqdn", common::computed_string())
            .attr("ip_address", common::computed_string())
            .attr("tags", common::tags_computed())
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()> {
        let ctx = d.read_context();
        let id = PublicIpAddressId::new(&client.subscription_id, d.get_str("resource_group_name"), d.get_str("name"));

        let ip: PublicIpAddress = get_existing(client, &ctx, &id.id(), &id, NETWORK_API_VERSION).await?;
        d.set_id(id.id());

        // computed attributes are always present, even when the API omits them
        for key in [
            "location",
            "sku",
            "fqdn",
            "reverse_fqdn",
            "domain_name_label",
            "allocation_method",
            "ip_address",
            "ip_version",
        ] {
            d.set(key, "");
        }
        d.set("idle_timeout_in_minutes", 0);
        flatten_public_ip(d, &ip);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(attrs: Value) -> ResourceData {
        ResourceData::new(attrs.as_object().unwrap().clone())
    }

    #[test]
    fn test_standard_sku_requires_static() {
        let d = data(json!({
            "name": "pip",
            "location": "local",
            "sku": "Standard",
            "allocation_method": "Dynamic",
            "ip_version": "IPv4",
            "idle_timeout_in_minutes": 4,
        }));
        let err = expand_public_ip(&d).unwrap_err();
        assert!(err.to_string().starts_with("Static IP allocation must be used"));
    }

    #[test]
    fn test_deprecated_allocation_is_used_as_fallback() {
        let d = data(json!({
            "name": "pip",
            "location": "West Europe",
            "sku": "Basic",
            "public_ip_address_allocation": "Static",
            "ip_version": "IPv4",
            "idle_timeout_in_minutes": 10,
            "domain_name_label": "mylabel",
        }));
        let ip = expand_public_ip(&d).unwrap();
        assert_eq!(ip.location.as_deref(), Some("westeurope"));
        let props = ip.properties.unwrap();
        assert_eq!(props.public_ip_allocation_method.as_deref(), Some("Static"));
        assert_eq!(props.idle_timeout_in_minutes, Some(10));
        let dns = props.dns_settings.unwrap();
        assert_eq!(dns.domain_name_label.as_deref(), Some("mylabel"));
        assert!(dns.reverse_fqdn.is_none());
    }

    #[test]
    fn test_missing_allocation_method() {
        let d = data(json!({"name": "pip", "location": "local", "sku": "Basic"}));
        assert!(expand_public_ip(&d).is_err());
    }

    #[test]
    fn test_domain_name_label() {
        assert!(domain_name_label(&json!("my-label1"), "domain_name_label").is_ok());
        assert!(domain_name_label(&json!("1label"), "domain_name_label").is_err());
        assert!(domain_name_label(&json!("Label"), "domain_name_label").is_err());
        assert!(domain_name_label(&json!("label-"), "domain_name_label").is_err());
    }

    #[test]
    fn test_flatten_public_ip() {
        let ip: PublicIpAddress = serde_json::from_value(json!({
            "location": "local",
            "sku": {"name": "Basic"},
            "properties": {
                "publicIPAllocationMethod": "Static",
                "publicIPAddressVersion": "IPv4",
                "idleTimeoutInMinutes": 4,
                "ipAddress": "1.2.3.4",
                "dnsSettings": {"domainNameLabel": "lbl", "fqdn": "lbl.local.cloudapp.azurestack.external"}
            }
        }))
        .unwrap();
        let mut d = ResourceData::from_id("id");
        flatten_public_ip(&mut d, &ip);
        assert_eq!(d.get_str("ip_address"), "1.2.3.4");
        assert_eq!(d.get_str("fqdn"), "lbl.local.cloudapp.azurestack.external");
        assert_eq!(d.get_str("sku"), "Basic");
        assert_eq!(d.get_i64("idle_timeout_in_minutes"), 4);
    }
}
