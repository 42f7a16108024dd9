use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A customer of the loyalty program.
///
/// Created implicitly on the first purchase referencing an unknown
/// shopper id, never deleted. The balance is stored rather than
/// recomputed from history so reads stay O(1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shopper {
    pub shopper_id: String,
    /// Sticker balance, non-negative by construction.
    pub sticker_balance: u64,
    /// Optimistic-concurrency stamp. Callers pass back the version they
    /// read; the store bumps it on every committed mutation.
    pub version: u64,
}

impl Shopper {
    pub fn new(shopper_id: impl Into<String>) -> Self {
        Self {
            shopper_id: shopper_id.into(),
            sticker_balance: 0,
            version: 0,
        }
    }
}

/// A single line in a purchase basket.
///
/// The `"promo"` category is significant to the calculation rule; every
/// other category value is free-form. Negative quantities and prices are
/// rejected upstream and are not a contract the engine guards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            category: category.into(),
            quantity,
            unit_price,
        }
    }

    /// Line subtotal in exact decimal arithmetic.
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// An inbound purchase submitted by a point-of-sale integration.
///
/// `transaction_id` is the caller-supplied idempotency key: resubmitting
/// the same event returns the stored outcome without re-crediting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseEvent {
    pub transaction_id: String,
    pub shopper_id: String,
    pub store_id: String,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<LineItem>,
}

impl PurchaseEvent {
    /// Basket total as the exact decimal sum of line subtotals.
    pub fn basket_total(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |total, item| total + item.subtotal())
    }
}

/// An inbound redemption request.
///
/// `redemption_id` is the caller-supplied idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedemptionRequest {
    pub redemption_id: String,
    pub shopper_id: String,
    pub reward_code: String,
}

/// One processed purchase, keyed by its transaction id.
///
/// Immutable once committed; replays are served from this record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EarnRecord {
    pub transaction_id: String,
    pub shopper_id: String,
    pub store_id: String,
    pub timestamp: DateTime<Utc>,
    pub basket_total: Decimal,
    pub items: Vec<LineItem>,
    pub stickers_awarded: u64,
}

impl EarnRecord {
    /// Build the caller-facing receipt from this record and the
    /// shopper's current balance.
    pub fn receipt(&self, sticker_balance: u64) -> EarnReceipt {
        EarnReceipt {
            transaction_id: self.transaction_id.clone(),
            shopper_id: self.shopper_id.clone(),
            store_id: self.store_id.clone(),
            basket_total: self.basket_total,
            stickers_awarded: self.stickers_awarded,
            sticker_balance,
        }
    }
}

/// One processed redemption, keyed by its redemption id.
///
/// Immutable once committed; replays return the stored result unchanged,
/// including the balance recorded at redemption time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpendRecord {
    pub redemption_id: String,
    pub shopper_id: String,
    pub reward_code: String,
    pub stickers_spent: u64,
    pub balance_after: u64,
}

impl SpendRecord {
    pub fn receipt(&self) -> SpendReceipt {
        SpendReceipt {
            redemption_id: self.redemption_id.clone(),
            shopper_id: self.shopper_id.clone(),
            reward_code: self.reward_code.clone(),
            stickers_spent: self.stickers_spent,
            sticker_balance: self.balance_after,
        }
    }
}

/// Result of a processed (or replayed) purchase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EarnReceipt {
    pub transaction_id: String,
    pub shopper_id: String,
    pub store_id: String,
    pub basket_total: Decimal,
    pub stickers_awarded: u64,
    pub sticker_balance: u64,
}

/// Result of a processed (or replayed) redemption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpendReceipt {
    pub redemption_id: String,
    pub shopper_id: String,
    pub reward_code: String,
    pub stickers_spent: u64,
    pub sticker_balance: u64,
}

/// Balance plus earn history for one shopper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopperStatement {
    pub shopper_id: String,
    pub sticker_balance: u64,
    pub transactions: Vec<EarnRecord>,
}
