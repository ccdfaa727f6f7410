//! Per-account serialization for ledger writes

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

/// One async mutex per account, created on first use.
///
/// Tokio mutexes hand the lock out in FIFO order, so trades for one account
/// apply in the order they asked for the lock. Different accounts never
/// contend.
///
/// Entries are never pruned, so the map holds one mutex per account that has
/// traded since startup. Accounts are never deleted, which bounds it by the
/// account count.
#[derive(Clone, Default)]
pub struct AccountLocks {
    locks: Arc<RwLock<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `account_id`'s balance and holdings
    pub async fn acquire(&self, account_id: Uuid) -> OwnedMutexGuard<()> {
        self.lock_for(account_id).await.lock_owned().await
    }

    async fn lock_for(&self, account_id: Uuid) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(&account_id) {
                return lock.clone();
            }
        }

        let mut locks = self.locks.write().await;
        locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn tracked_accounts(&self) -> usize {
        self.locks.read().await.len()
    }
}
