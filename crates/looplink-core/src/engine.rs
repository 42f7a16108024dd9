//! Ledger engine: idempotent earn/spend processors over a store.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::RewardCatalog;
use crate::error::{LedgerError, StoreError};
use crate::rules::calculate_stickers;
use crate::store::LedgerStore;
use crate::types::{
    EarnReceipt, EarnRecord, PurchaseEvent, RedemptionRequest, Shopper, ShopperStatement,
    SpendReceipt, SpendRecord,
};

/// Sticker ledger engine.
///
/// Invoked synchronously per inbound request; it keeps no state of its
/// own beyond the store handle and the reward catalog. All retries are
/// the caller's responsibility — idempotency keys make them safe.
pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
    catalog: RewardCatalog,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn LedgerStore>, catalog: RewardCatalog) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    /// Process a purchase, crediting stickers exactly once per
    /// transaction id.
    ///
    /// A resubmitted transaction returns a receipt built from the stored
    /// record and the shopper's current balance; nothing is recomputed
    /// or re-credited.
    pub async fn process_earn(&self, event: PurchaseEvent) -> Result<EarnReceipt, LedgerError> {
        if let Some(existing) = self.store.get_earn_record(&event.transaction_id).await? {
            warn!(
                transaction = %event.transaction_id,
                shopper = %existing.shopper_id,
                "duplicate transaction, returning stored award"
            );
            return self.replay_earn(existing).await;
        }

        let basket_total = event.basket_total();
        let stickers_awarded = calculate_stickers(basket_total, &event.items);

        let mut shopper = match self.store.get_shopper(&event.shopper_id).await? {
            Some(shopper) => shopper,
            None => {
                info!(shopper = %event.shopper_id, "new shopper, starting at zero balance");
                Shopper::new(event.shopper_id.clone())
            }
        };
        shopper.sticker_balance = shopper.sticker_balance.saturating_add(stickers_awarded);
        let new_balance = shopper.sticker_balance;

        let record = EarnRecord {
            transaction_id: event.transaction_id,
            shopper_id: event.shopper_id,
            store_id: event.store_id,
            timestamp: event.timestamp,
            basket_total,
            items: event.items,
            stickers_awarded,
        };

        match self.store.commit_earn(shopper, record.clone()).await {
            Ok(()) => {
                info!(
                    transaction = %record.transaction_id,
                    shopper = %record.shopper_id,
                    awarded = stickers_awarded,
                    balance = new_balance,
                    "purchase processed"
                );
                Ok(record.receipt(new_balance))
            }
            Err(StoreError::DuplicateKey { key }) => {
                // A concurrent submission won the race; its record is
                // authoritative.
                warn!(transaction = %key, "lost duplicate-submission race, replaying stored award");
                let stored = self.store.get_earn_record(&key).await?.ok_or_else(|| {
                    LedgerError::Storage(format!(
                        "earn record '{key}' missing after duplicate-key conflict"
                    ))
                })?;
                self.replay_earn(stored).await
            }
            Err(err) => {
                warn!(transaction = %record.transaction_id, error = %err, "earn commit failed");
                Err(err.into())
            }
        }
    }

    /// Process a redemption, debiting stickers exactly once per
    /// redemption id.
    ///
    /// A resubmitted redemption returns the stored result unchanged,
    /// including the balance recorded at redemption time.
    pub async fn process_spend(
        &self,
        request: RedemptionRequest,
    ) -> Result<SpendReceipt, LedgerError> {
        if let Some(existing) = self.store.get_spend_record(&request.redemption_id).await? {
            warn!(
                redemption = %request.redemption_id,
                shopper = %existing.shopper_id,
                "duplicate redemption, returning stored result"
            );
            return Ok(existing.receipt());
        }

        let cost = match self.catalog.cost(&request.reward_code) {
            Some(cost) => cost,
            None => {
                warn!(
                    redemption = %request.redemption_id,
                    reward = %request.reward_code,
                    "redemption rejected: unknown reward"
                );
                return Err(LedgerError::UnknownReward {
                    code: request.reward_code,
                });
            }
        };

        // A shopper with no earn history has balance 0 and fails the
        // affordability check below; no shopper row is created here.
        let mut shopper = self
            .store
            .get_shopper(&request.shopper_id)
            .await?
            .unwrap_or_else(|| Shopper::new(request.shopper_id.clone()));

        let balance = shopper.sticker_balance;
        let Some(remaining) = balance.checked_sub(cost) else {
            warn!(
                redemption = %request.redemption_id,
                shopper = %request.shopper_id,
                reward = %request.reward_code,
                cost,
                balance,
                "redemption rejected: insufficient balance"
            );
            return Err(LedgerError::InsufficientBalance {
                shopper_id: request.shopper_id,
                reward_code: request.reward_code,
                cost,
                balance,
            });
        };

        shopper.sticker_balance = remaining;
        let record = SpendRecord {
            redemption_id: request.redemption_id,
            shopper_id: request.shopper_id,
            reward_code: request.reward_code,
            stickers_spent: cost,
            balance_after: remaining,
        };

        match self.store.commit_spend(shopper, record.clone()).await {
            Ok(()) => {
                info!(
                    redemption = %record.redemption_id,
                    shopper = %record.shopper_id,
                    spent = cost,
                    balance = remaining,
                    "redemption processed"
                );
                Ok(record.receipt())
            }
            Err(StoreError::DuplicateKey { key }) => {
                warn!(redemption = %key, "lost duplicate-submission race, replaying stored result");
                let stored = self.store.get_spend_record(&key).await?.ok_or_else(|| {
                    LedgerError::Storage(format!(
                        "spend record '{key}' missing after duplicate-key conflict"
                    ))
                })?;
                Ok(stored.receipt())
            }
            Err(err) => {
                warn!(redemption = %record.redemption_id, error = %err, "spend commit failed");
                Err(err.into())
            }
        }
    }

    /// Balance and earn history for one shopper.
    pub async fn shopper_statement(
        &self,
        shopper_id: &str,
    ) -> Result<ShopperStatement, LedgerError> {
        let shopper = self
            .store
            .get_shopper(shopper_id)
            .await?
            .ok_or_else(|| LedgerError::ShopperNotFound {
                id: shopper_id.to_string(),
            })?;
        let transactions = self.store.earn_records_for_shopper(shopper_id).await?;
        Ok(ShopperStatement {
            shopper_id: shopper.shopper_id,
            sticker_balance: shopper.sticker_balance,
            transactions,
        })
    }

    async fn replay_earn(&self, record: EarnRecord) -> Result<EarnReceipt, LedgerError> {
        // Earn replays report the shopper's live balance, not the
        // balance at earn time.
        let balance = self
            .store
            .get_shopper(&record.shopper_id)
            .await?
            .map(|shopper| shopper.sticker_balance)
            .unwrap_or(0);
        Ok(record.receipt(balance))
    }
}
