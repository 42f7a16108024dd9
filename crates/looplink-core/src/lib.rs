//! Looplink sticker ledger engine.
//!
//! Purchases earn stickers through a deterministic calculation rule and
//! stickers are redeemed against a fixed reward catalog. The engine keeps
//! per-shopper balances correct under retried and duplicate submissions:
//! every purchase and redemption carries a caller-supplied idempotency
//! key, and replays return the stored outcome instead of re-applying it.
//!
//! Transport, request validation, and durable storage mechanics live
//! outside this crate; the engine consumes any [`LedgerStore`] that
//! honors the commit contract.

#![deny(unsafe_code)]

pub mod catalog;
pub mod engine;
pub mod error;
pub mod rules;
pub mod store;
pub mod types;

pub use catalog::RewardCatalog;
pub use engine::LedgerEngine;
pub use error::{LedgerError, StoreError};
pub use rules::{calculate_stickers, BASE_RATE_DIVISOR, PROMO_CATEGORY, STICKER_CAP};
pub use store::{LedgerStore, MemoryLedgerStore};
pub use types::{
    EarnReceipt, EarnRecord, LineItem, PurchaseEvent, RedemptionRequest, Shopper,
    ShopperStatement, SpendReceipt, SpendRecord,
};
