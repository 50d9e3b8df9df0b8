//! Helpers shared by the secret and key resources.

use crate::clients::Client;
use crate::error::{Error, Result, ResultExt};
use crate::ids::NestedItemId;
use crate::models::keyvault::ItemAttributes;
use crate::poll::StateChangeConf;
use crate::schema::ResourceData;
use crate::timeouts::OperationContext;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

const STATE_IN_PROGRESS: &str = "InProgress";
const STATE_NOT_FOUND: &str = "NotFound";

/// Calls needed to delete a secret or key and optionally purge it.
///
/// The `has_been_*` checks return a `404` error once the item is gone.
#[async_trait]
pub trait DeleteAndPurgeNestedItem: Send + Sync {
    async fn delete_nested_item(&self, ctx: &OperationContext) -> Result<()>;

    async fn nested_item_has_been_deleted(&self, ctx: &OperationContext) -> Result<()>;

    async fn purge_nested_item(&self, ctx: &OperationContext) -> Result<()>;

    async fn nested_item_has_been_purged(&self, ctx: &OperationContext) -> Result<()>;

    fn poll_interval(&self) -> Duration {
        Duration::from_secs(5)
    }
}

/// Delete a nested item, wait for it to disappear and purge it when asked.
pub async fn delete_and_optionally_purge(
    ctx: &OperationContext,
    description: &str,
    should_purge: bool,
    helper: &dyn DeleteAndPurgeNestedItem,
) -> Result<()> {
    if ctx.deadline().is_none() {
        return Err(Error::Validation("context is missing a timeout".to_string()));
    }

    log::debug!("[DEBUG] Deleting {description}..");
    if let Err(e) = helper.delete_nested_item(ctx).await {
        if e.was_not_found() {
            return Ok(());
        }
        return Err(e.context(format!("deleting {description}")));
    }
    log::debug!("[DEBUG] Waiting for {description} to finish deleting..");
    wait_until_not_found(ctx, helper.poll_interval(), || helper.nested_item_has_been_deleted(ctx))
        .await
        .with_context(|| format!("waiting for {description} to be deleted"))?;
    log::debug!("[DEBUG] Deleted {description}.");

    if !should_purge {
        log::debug!("[DEBUG] Skipping purging of {description} as opted-out..");
        return Ok(());
    }

    log::debug!("[DEBUG] Purging {description}..");
    helper
        .purge_nested_item(ctx)
        .await
        .with_context(|| format!("purging {description}"))?;
    log::debug!("[DEBUG] Waiting for {description} to finish purging..");
    wait_until_not_found(ctx, helper.poll_interval(), || helper.nested_item_has_been_purged(ctx))
        .await
        .with_context(|| format!("waiting for {description} to finish purging"))?;
    log::debug!("[DEBUG] Purged {description}.");
    Ok(())
}

/// Poll `check` until it has reported `404` three times in a row.
async fn wait_until_not_found<F, Fut>(ctx: &OperationContext, interval: Duration, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let conf = StateChangeConf::new(&[STATE_IN_PROGRESS], &[STATE_NOT_FOUND])
        .poll_interval(interval)
        .continuous_target_occurence(3)
        .timeout(ctx.remaining());
    conf.wait_for_state(|| {
        let pending = check();
        async move {
            let state = match pending.await {
                Ok(()) => STATE_IN_PROGRESS,
                Err(e) if e.was_not_found() => STATE_NOT_FOUND,
                Err(e) => return Err(e),
            };
            Ok(Some(((), state.to_string())))
        }
    })
    .await?;
    Ok(())
}

/// Import a secret or key by its versioned id, resolving the owning vault.
///
/// An unknown vault leaves `key_vault_id` unset; the read that follows the
/// import then drops the item.
pub async fn import_nested_item(client: &Client, d: &mut ResourceData) -> Result<()> {
    let id = NestedItemId::parse(d.id())?;
    let ctx = d.read_context();
    let vault_id = client
        .key_vault
        .key_vault_id_from_base_url(&ctx, &id.key_vault_base_url)
        .await
        .with_context(|| format!("retrieving the Resource ID the Key Vault at URL {:?}", id.key_vault_base_url))?;
    match vault_id {
        Some(vault_id) => d.set("key_vault_id", vault_id),
        None => {
            log::debug!("[DEBUG] no Key Vault found at URL {:?} for {:?}", id.key_vault_base_url, id.name);
            d.set("key_vault_id", Value::Null);
        }
    }
    Ok(())
}

pub fn rfc3339_to_unix(value: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.timestamp())
        .map_err(|e| Error::Validation(format!("parsing time {value:?} as RFC3339: {e}")))
}

pub fn unix_to_rfc3339(seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// `not_before_date` / `expiration_date` as item attributes.
pub fn expand_item_attributes(d: &ResourceData, enabled: Option<bool>) -> Result<ItemAttributes> {
    let mut attributes = ItemAttributes {
        enabled,
        ..Default::default()
    };
    let not_before = d.get_str("not_before_date");
    if !not_before.is_empty() {
        attributes.nbf = Some(rfc3339_to_unix(not_before)?);
    }
    let expiration = d.get_str("expiration_date");
    if !expiration.is_empty() {
        attributes.exp = Some(rfc3339_to_unix(expiration)?);
    }
    Ok(attributes)
}

pub fn flatten_item_attributes(d: &mut ResourceData, attributes: Option<&ItemAttributes>) {
    let nbf = attributes.and_then(|a| a.nbf);
    let exp = attributes.and_then(|a| a.exp);
    if let Some(nbf) = nbf {
        d.set("not_before_date", unix_to_rfc3339(nbf));
    }
    if let Some(exp) = exp {
        d.set("expiration_date", unix_to_rfc3339(exp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn not_found() -> Error {
        Error::Api {
            status: 404,
            code: "SecretNotFound".into(),
            message: "gone".into(),
        }
    }

    /// Reports the item present for the first `present_for` checks.
    #[derive(Default)]
    struct FakeItem {
        delete_status: Option<u16>,
        present_for: u32,
        checks: AtomicU32,
        purges: AtomicU32,
    }

    impl FakeItem {
        fn check(&self) -> Result<()> {
            let n = self.checks.fetch_add(1, Ordering::SeqCst);
            if n < self.present_for {
                Ok(())
            } else {
                Err(not_found())
            }
        }
    }

    #[async_trait]
    impl DeleteAndPurgeNestedItem for FakeItem {
        async fn delete_nested_item(&self, _ctx: &OperationContext) -> Result<()> {
            match self.delete_status {
                Some(status) => Err(Error::Api {
                    status,
                    code: "Err".into(),
                    message: "delete failed".into(),
                }),
                None => Ok(()),
            }
        }

        async fn nested_item_has_been_deleted(&self, _ctx: &OperationContext) -> Result<()> {
            self.check()
        }

        async fn purge_nested_item(&self, _ctx: &OperationContext) -> Result<()> {
            self.purges.fetch_add(1, Ordering::SeqCst);
            self.checks.store(0, Ordering::SeqCst);
            Ok(())
        }

        async fn nested_item_has_been_purged(&self, _ctx: &OperationContext) -> Result<()> {
            self.check()
        }
    }

    #[tokio::test]
    async fn test_three_consecutive_not_found_complete_the_delete() {
        tokio::time::pause();
        let item = FakeItem::default();
        let ctx = OperationContext::with_timeout(Duration::from_secs(60));
        let start = Instant::now();
        delete_and_optionally_purge(&ctx, "Secret \"s1\"", false, &item)
            .await
            .unwrap();
        assert_eq!(item.checks.load(Ordering::SeqCst), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11), "{elapsed:?}");
        assert_eq!(item.purges.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_purges_when_asked() {
        tokio::time::pause();
        let item = FakeItem {
            present_for: 2,
            ..Default::default()
        };
        let ctx = OperationContext::with_timeout(Duration::from_secs(120));
        delete_and_optionally_purge(&ctx, "Key \"k1\"", true, &item)
            .await
            .unwrap();
        assert_eq!(item.purges.load(Ordering::SeqCst), 1);
        assert_eq!(item.checks.load(Ordering::SeqCst), 5, "two pending checks then three not found");
    }

    #[tokio::test]
    async fn test_missing_deadline_is_rejected() {
        let item = FakeItem::default();
        let err = delete_and_optionally_purge(&OperationContext::background(), "Secret", false, &item)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "context is missing a timeout");
    }

    #[tokio::test]
    async fn test_not_found_on_delete_is_success() {
        let item = FakeItem {
            delete_status: Some(404),
            ..Default::default()
        };
        let ctx = OperationContext::with_timeout(Duration::from_secs(60));
        delete_and_optionally_purge(&ctx, "Secret", true, &item).await.unwrap();
        assert_eq!(item.checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delete_failure_is_wrapped() {
        let item = FakeItem {
            delete_status: Some(403),
            ..Default::default()
        };
        let ctx = OperationContext::with_timeout(Duration::from_secs(60));
        let err = delete_and_optionally_purge(&ctx, "Secret \"s1\"", false, &item)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("deleting Secret \"s1\""), "{err}");
        assert!(err.was_forbidden());
    }

    #[tokio::test]
    async fn test_short_deadline_times_out() {
        tokio::time::pause();
        let item = FakeItem {
            present_for: u32::MAX,
            ..Default::default()
        };
        let ctx = OperationContext::with_timeout(Duration::from_secs(12));
        let err = delete_and_optionally_purge(&ctx, "Secret \"s1\"", false, &item)
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "{err}");
        assert!(err.to_string().starts_with("waiting for Secret \"s1\" to be deleted"));
    }

    #[test]
    fn test_rfc3339_conversions() {
        let ts = rfc3339_to_unix("2020-01-01T00:00:00Z").unwrap();
        assert_eq!(ts, 1_577_836_800);
        assert_eq!(unix_to_rfc3339(ts), "2020-01-01T00:00:00Z");
        assert!(rfc3339_to_unix("yesterday").is_err());
    }
}
