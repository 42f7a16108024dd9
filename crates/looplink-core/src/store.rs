//! Ledger store contract and the in-memory reference implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::types::{EarnRecord, Shopper, SpendRecord};

/// Durable keyed storage consumed by the ledger engine.
///
/// Idempotency keys (`transaction_id`, `redemption_id`) are globally
/// unique; the commit operations enforce that uniqueness and return
/// [`StoreError::DuplicateKey`] when a record already exists. Commits are
/// atomic pair writes: the shopper balance and the idempotency record
/// land together or not at all.
///
/// Shoppers carry a version stamp for optimistic concurrency. Callers
/// commit with the version they read; a mismatch yields
/// [`StoreError::VersionConflict`] and the whole read-modify-write is
/// safe to retry.
///
/// Implementations:
/// - `MemoryLedgerStore`: in-memory reference store
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fetch a shopper by id.
    async fn get_shopper(&self, shopper_id: &str) -> Result<Option<Shopper>, StoreError>;

    /// Fetch a processed purchase by its idempotency key.
    async fn get_earn_record(
        &self,
        transaction_id: &str,
    ) -> Result<Option<EarnRecord>, StoreError>;

    /// Fetch a processed redemption by its idempotency key.
    async fn get_spend_record(
        &self,
        redemption_id: &str,
    ) -> Result<Option<SpendRecord>, StoreError>;

    /// All earn records for a shopper, in commit order.
    async fn earn_records_for_shopper(
        &self,
        shopper_id: &str,
    ) -> Result<Vec<EarnRecord>, StoreError>;

    /// Atomically persist an updated shopper and its new earn record.
    async fn commit_earn(
        &self,
        shopper: Shopper,
        record: EarnRecord,
    ) -> Result<(), StoreError>;

    /// Atomically persist an updated shopper and its new spend record.
    async fn commit_spend(
        &self,
        shopper: Shopper,
        record: SpendRecord,
    ) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryState {
    shoppers: HashMap<String, Shopper>,
    earns: HashMap<String, EarnRecord>,
    spends: HashMap<String, SpendRecord>,
    /// shopper id → transaction ids, in commit order.
    earn_index: HashMap<String, Vec<String>>,
}

/// In-memory reference implementation of [`LedgerStore`].
///
/// A single lock over the whole state makes every commit an atomic pair
/// write. The per-shopper version check still runs so the engine
/// exercises the same optimistic-concurrency contract a durable backend
/// would enforce.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: RwLock<MemoryState>,
    fail_on_commit: RwLock<bool>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent commits fail with a backend error (test hook).
    pub async fn set_fail_on_commit(&self, fail: bool) {
        *self.fail_on_commit.write().await = fail;
    }

    fn check_version(state: &MemoryState, shopper: &Shopper) -> Result<(), StoreError> {
        let stored_version = state
            .shoppers
            .get(&shopper.shopper_id)
            .map(|stored| stored.version);
        match stored_version {
            Some(version) if version != shopper.version => Err(StoreError::VersionConflict {
                shopper_id: shopper.shopper_id.clone(),
            }),
            None if shopper.version != 0 => Err(StoreError::VersionConflict {
                shopper_id: shopper.shopper_id.clone(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_shopper(&self, shopper_id: &str) -> Result<Option<Shopper>, StoreError> {
        let state = self.state.read().await;
        Ok(state.shoppers.get(shopper_id).cloned())
    }

    async fn get_earn_record(
        &self,
        transaction_id: &str,
    ) -> Result<Option<EarnRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.earns.get(transaction_id).cloned())
    }

    async fn get_spend_record(
        &self,
        redemption_id: &str,
    ) -> Result<Option<SpendRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.spends.get(redemption_id).cloned())
    }

    async fn earn_records_for_shopper(
        &self,
        shopper_id: &str,
    ) -> Result<Vec<EarnRecord>, StoreError> {
        let state = self.state.read().await;
        let transaction_ids = match state.earn_index.get(shopper_id) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        Ok(transaction_ids
            .iter()
            .filter_map(|id| state.earns.get(id).cloned())
            .collect())
    }

    async fn commit_earn(
        &self,
        mut shopper: Shopper,
        record: EarnRecord,
    ) -> Result<(), StoreError> {
        if *self.fail_on_commit.read().await {
            return Err(StoreError::Backend("injected commit failure".to_string()));
        }

        let mut state = self.state.write().await;
        if state.earns.contains_key(&record.transaction_id) {
            return Err(StoreError::DuplicateKey {
                key: record.transaction_id.clone(),
            });
        }
        Self::check_version(&state, &shopper)?;

        shopper.version += 1;
        state
            .earn_index
            .entry(record.shopper_id.clone())
            .or_default()
            .push(record.transaction_id.clone());
        state.shoppers.insert(shopper.shopper_id.clone(), shopper);
        state.earns.insert(record.transaction_id.clone(), record);
        Ok(())
    }

    async fn commit_spend(
        &self,
        mut shopper: Shopper,
        record: SpendRecord,
    ) -> Result<(), StoreError> {
        if *self.fail_on_commit.read().await {
            return Err(StoreError::Backend("injected commit failure".to_string()));
        }

        let mut state = self.state.write().await;
        if state.spends.contains_key(&record.redemption_id) {
            return Err(StoreError::DuplicateKey {
                key: record.redemption_id.clone(),
            });
        }
        Self::check_version(&state, &shopper)?;

        shopper.version += 1;
        state.shoppers.insert(shopper.shopper_id.clone(), shopper);
        state.spends.insert(record.redemption_id.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::LineItem;

    fn earn_record(transaction_id: &str, shopper_id: &str, awarded: u64) -> EarnRecord {
        EarnRecord {
            transaction_id: transaction_id.to_string(),
            shopper_id: shopper_id.to_string(),
            store_id: "store-1".to_string(),
            timestamp: Utc::now(),
            basket_total: Decimal::new(5000, 2),
            items: vec![LineItem::new(
                "SKU-1",
                "Coffee",
                "grocery",
                1,
                Decimal::new(5000, 2),
            )],
            stickers_awarded: awarded,
        }
    }

    fn spend_record(redemption_id: &str, shopper_id: &str, spent: u64, after: u64) -> SpendRecord {
        SpendRecord {
            redemption_id: redemption_id.to_string(),
            shopper_id: shopper_id.to_string(),
            reward_code: "MUG".to_string(),
            stickers_spent: spent,
            balance_after: after,
        }
    }

    #[tokio::test]
    async fn commit_earn_persists_shopper_and_record_together() {
        let store = MemoryLedgerStore::new();
        let mut shopper = Shopper::new("shopper-1");
        shopper.sticker_balance = 5;

        store
            .commit_earn(shopper, earn_record("tx-1", "shopper-1", 5))
            .await
            .expect("commit");

        let stored = store
            .get_shopper("shopper-1")
            .await
            .expect("get")
            .expect("shopper exists");
        assert_eq!(stored.sticker_balance, 5);
        assert_eq!(stored.version, 1);
        assert!(store
            .get_earn_record("tx-1")
            .await
            .expect("get")
            .is_some());
    }

    #[tokio::test]
    async fn duplicate_transaction_id_is_a_conflict() {
        let store = MemoryLedgerStore::new();
        let mut shopper = Shopper::new("shopper-1");
        shopper.sticker_balance = 5;
        store
            .commit_earn(shopper, earn_record("tx-1", "shopper-1", 5))
            .await
            .expect("first commit");

        let mut replayed = store
            .get_shopper("shopper-1")
            .await
            .expect("get")
            .expect("shopper exists");
        replayed.sticker_balance += 5;
        let err = store
            .commit_earn(replayed, earn_record("tx-1", "shopper-1", 5))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey { key } if key == "tx-1"));
        // Balance untouched by the failed commit.
        let stored = store
            .get_shopper("shopper-1")
            .await
            .expect("get")
            .expect("shopper exists");
        assert_eq!(stored.sticker_balance, 5);
    }

    #[tokio::test]
    async fn stale_shopper_version_is_a_conflict() {
        let store = MemoryLedgerStore::new();
        let mut shopper = Shopper::new("shopper-1");
        shopper.sticker_balance = 5;
        store
            .commit_earn(shopper, earn_record("tx-1", "shopper-1", 5))
            .await
            .expect("first commit");

        // Committing with the pre-commit version (0) must fail.
        let mut stale = Shopper::new("shopper-1");
        stale.sticker_balance = 10;
        let err = store
            .commit_earn(stale, earn_record("tx-2", "shopper-1", 5))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn earn_records_for_shopper_returns_commit_order() {
        let store = MemoryLedgerStore::new();
        let mut shopper = Shopper::new("shopper-1");
        shopper.sticker_balance = 5;
        store
            .commit_earn(shopper, earn_record("tx-1", "shopper-1", 5))
            .await
            .expect("commit");

        let mut shopper = store
            .get_shopper("shopper-1")
            .await
            .expect("get")
            .expect("shopper exists");
        shopper.sticker_balance += 3;
        store
            .commit_earn(shopper, earn_record("tx-2", "shopper-1", 3))
            .await
            .expect("commit");

        let records = store
            .earn_records_for_shopper("shopper-1")
            .await
            .expect("lookup");
        let ids: Vec<&str> = records.iter().map(|r| r.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["tx-1", "tx-2"]);

        assert!(store
            .earn_records_for_shopper("nobody")
            .await
            .expect("lookup")
            .is_empty());
    }

    #[tokio::test]
    async fn commit_spend_requires_current_version() {
        let store = MemoryLedgerStore::new();
        let mut shopper = Shopper::new("shopper-1");
        shopper.sticker_balance = 15;
        store
            .commit_earn(shopper, earn_record("tx-1", "shopper-1", 15))
            .await
            .expect("commit");

        let mut shopper = store
            .get_shopper("shopper-1")
            .await
            .expect("get")
            .expect("shopper exists");
        shopper.sticker_balance -= 10;
        store
            .commit_spend(shopper.clone(), spend_record("rd-1", "shopper-1", 10, 5))
            .await
            .expect("spend commit");

        // Reusing the already-committed version must conflict.
        let err = store
            .commit_spend(shopper, spend_record("rd-2", "shopper-1", 5, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn injected_failure_surfaces_as_backend_error() {
        let store = MemoryLedgerStore::new();
        store.set_fail_on_commit(true).await;

        let err = store
            .commit_earn(Shopper::new("shopper-1"), earn_record("tx-1", "shopper-1", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(store
            .get_shopper("shopper-1")
            .await
            .expect("get")
            .is_none());
    }
}
