//! Paginated ARM listings.
//!
//! Follows `nextLink` until the service stops returning one.

use super::arm::ArmClient;
use crate::config::RESOURCES_API_VERSION;
use crate::error::{Error, Result};
use crate::timeouts::OperationContext;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One page of a list response.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

/// Entry of `GET /subscriptions/{id}/resources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Collect every page of a list operation.
pub async fn list_all<T: DeserializeOwned>(
    arm: &ArmClient,
    ctx: &OperationContext,
    path: &str,
    api_version: &str,
    query: &[(&str, &str)],
) -> Result<Vec<T>> {
    let mut items: Vec<T> = Vec::new();
    let mut page: Page<T> = arm.get_with_query(ctx, path, api_version, query).await?;
    let mut count_pages_returned = 1;
    let mut previous_link: Option<String> = None;

    loop {
        let count = page.value.len();
        items.extend(page.value);
        log::debug!(
            "got page#{count_pages_returned:2} record_count=+{count:3} => {total:3}",
            total = items.len()
        );

        let Some(next_link) = page.next_link.filter(|l| !l.is_empty()) else {
            break;
        };
        if previous_link.as_deref() == Some(next_link.as_str()) {
            return Err(Error::Validation(format!(
                "nextLink not unique - possible infinite loop: {next_link}"
            )));
        }
        page = arm.get_url(ctx, &next_link).await?;
        previous_link = Some(next_link);
        count_pages_returned += 1;
    }

    log::info!("listed {} items from {path} in {count_pages_returned} page(s)", items.len());
    Ok(items)
}

/// Every resource of `resource_type` (e.g. `Microsoft.KeyVault/vaults`) in the subscription.
pub async fn list_resources_by_type(
    arm: &ArmClient,
    ctx: &OperationContext,
    subscription_id: &str,
    resource_type: &str,
) -> Result<Vec<GenericResource>> {
    let path = format!("/subscriptions/{subscription_id}/resources");
    let filter = format!("resourceType eq '{resource_type}'");
    list_all(arm, ctx, &path, RESOURCES_API_VERSION, &[("$filter", filter.as_str())]).await
}
