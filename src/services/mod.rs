//! Service registrations.
//!
//! Each service lists the resources and data sources it contributes:
//! - [`keyvault`] - vaults, access policies, secrets and keys
//! - [`network`] - virtual networks, subnets, security groups, routes and gateways

pub mod keyvault;
pub mod network;

use crate::clients::Client;
use crate::error::{Error, Result};
use crate::schema::{DataSource, Resource, ResourceData};
use crate::timeouts::OperationContext;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::sync::Arc;

pub trait ServiceRegistration: Send + Sync {
    fn name(&self) -> &'static str;

    /// Categories used for the documentation sidebar.
    fn website_categories(&self) -> Vec<&'static str>;

    fn supported_data_sources(&self) -> Vec<Arc<dyn DataSource>>;

    fn supported_resources(&self) -> Vec<Arc<dyn Resource>>;
}

pub fn supported_services() -> Vec<Box<dyn ServiceRegistration>> {
    vec![Box::new(keyvault::Registration), Box::new(network::Registration)]
}

/// Fail with an import error when `id` already exists.
pub(crate) async fn ensure_not_exists(
    client: &Client,
    ctx: &OperationContext,
    resource_type: &str,
    id: &str,
    display: impl Display,
    api_version: &str,
) -> Result<()> {
    match client.arm.get::<serde_json::Value>(ctx, id, api_version).await {
        Ok(_) => Err(Error::import_as_exists(resource_type, id)),
        Err(e) if e.was_not_found() => Ok(()),
        Err(e) => Err(e.context(format!("checking for presence of existing {display}"))),
    }
}

/// GET `id`; a `404` clears the resource id and yields `None`.
pub(crate) async fn get_or_clear<T: DeserializeOwned>(
    client: &Client,
    ctx: &OperationContext,
    d: &mut ResourceData,
    id: &str,
    display: impl Display,
    api_version: &str,
) -> Result<Option<T>> {
    match client.arm.get::<T>(ctx, id, api_version).await {
        Ok(found) => Ok(Some(found)),
        Err(e) if e.was_not_found() => {
            log::debug!("[DEBUG] {display} was not found - removing from state!");
            d.set_id("");
            Ok(None)
        }
        Err(e) => Err(e.context(format!("retrieving {display}"))),
    }
}

/// GET `id` for a data source; a `404` is an error.
pub(crate) async fn get_existing<T: DeserializeOwned>(
    client: &Client,
    ctx: &OperationContext,
    id: &str,
    display: impl Display,
    api_version: &str,
) -> Result<T> {
    match client.arm.get::<T>(ctx, id, api_version).await {
        Ok(found) => Ok(found),
        Err(e) if e.was_not_found() => Err(Error::Validation(format!("{display} was not found"))),
        Err(e) => Err(e.context(format!("retrieving {display}"))),
    }
}
