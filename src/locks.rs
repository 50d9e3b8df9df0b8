//! Named lock table.
//!
//! Serialises operations on ARM resources that cannot be modified concurrently
//! (a subnet and its parent virtual network, a vault and its access policies).
//! The table is owned by the provider [`Client`](crate::clients::Client) and
//! handed to every handler; locks are created on first use and released when
//! the returned guard is dropped.

use itertools::Itertools;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

pub const VIRTUAL_NETWORK_RESOURCE_NAME: &str = "azurestack_virtual_network";
pub const SUBNET_RESOURCE_NAME: &str = "azurestack_subnet";
pub const NETWORK_SECURITY_GROUP_RESOURCE_NAME: &str = "azurestack_network_security_group";
pub const ROUTE_TABLE_RESOURCE_NAME: &str = "azurestack_route_table";
pub const NETWORK_INTERFACE_RESOURCE_NAME: &str = "azurestack_network_interface";
pub const KEY_VAULT_RESOURCE_NAME: &str = "azurestack_key_vault";

/// Serialises every virtual network peering operation in the provider.
pub const PEERING_LOCK_ID: &str = "azurestack_virtual_network_peering";

#[derive(Debug, Clone, Default)]
pub struct LockTable {
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

/// Held lock; releases on drop.
#[derive(Debug)]
pub struct LockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        log::debug!("[DEBUG] Unlocking {:?}", self.key);
    }
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.to_string()).or_default().clone()
    }

    pub async fn by_id(&self, id: &str) -> LockGuard {
        log::debug!("[DEBUG] Locking {id:?}");
        let guard = self.mutex_for(id).lock_owned().await;
        log::debug!("[DEBUG] Locked {id:?}");
        LockGuard {
            key: id.to_string(),
            _guard: guard,
        }
    }

    pub async fn by_name(&self, name: &str, resource_type: &str) -> LockGuard {
        self.by_id(&format!("{resource_type}.{name}")).await
    }

    /// Acquire every name in turn, skipping duplicates.
    pub async fn multiple_by_name<S: AsRef<str>>(
        &self,
        names: &[S],
        resource_type: &str,
    ) -> Vec<LockGuard> {
        let mut guards = Vec::with_capacity(names.len());
        for name in names.iter().map(AsRef::as_ref).unique() {
            guards.push(self.by_name(name, resource_type).await);
        }
        guards
    }

    /// True while some guard for `id` is held.
    pub fn is_locked(&self, id: &str) -> bool {
        self.mutex_for(id).try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_release_lets_second_caller_acquire() {
        let table = LockTable::new();
        let guard = table.by_name("vnet1", VIRTUAL_NETWORK_RESOURCE_NAME).await;
        assert_eq!(guard.key(), "azurestack_virtual_network.vnet1");
        assert!(table.is_locked("azurestack_virtual_network.vnet1"));

        let other = table.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.by_name("vnet1", VIRTUAL_NETWORK_RESOURCE_NAME).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "second caller must wait while the lock is held");

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("second caller should acquire after release")
            .unwrap();
        assert!(!table.is_locked("azurestack_virtual_network.vnet1"));
    }

    #[tokio::test]
    async fn test_released_on_error_path() {
        async fn failing(table: &LockTable) -> Result<(), String> {
            let _lock = table.by_name("nsg1", NETWORK_SECURITY_GROUP_RESOURCE_NAME).await;
            Err("boom".to_string())
        }
        let table = LockTable::new();
        assert!(failing(&table).await.is_err());
        assert!(!table.is_locked("azurestack_network_security_group.nsg1"));
    }

    #[tokio::test]
    async fn test_multiple_by_name_dedupes() {
        let table = LockTable::new();
        let guards = table
            .multiple_by_name(&["a", "b", "a"], VIRTUAL_NETWORK_RESOURCE_NAME)
            .await;
        let keys: Vec<&str> = guards.iter().map(LockGuard::key).collect();
        assert_eq!(
            keys,
            vec!["azurestack_virtual_network.a", "azurestack_virtual_network.b"]
        );
        drop(guards);
        assert!(!table.is_locked("azurestack_virtual_network.a"));
    }

    #[tokio::test]
    async fn test_names_are_scoped_by_type() {
        let table = LockTable::new();
        let _vnet = table.by_name("x", VIRTUAL_NETWORK_RESOURCE_NAME).await;
        let _subnet = tokio::time::timeout(
            Duration::from_millis(100),
            table.by_name("x", SUBNET_RESOURCE_NAME),
        )
        .await
        .expect("different resource types must not contend");
    }
}
