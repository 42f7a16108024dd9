//! Sticker calculation rule.
//!
//! Pure and deterministic: the same basket always yields the same award.
//! Monetary values use exact decimal arithmetic throughout; binary
//! floating point would drift at the cents level in the base-rate
//! division.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::types::LineItem;

/// Dollars of basket total per base sticker.
pub const BASE_RATE_DIVISOR: u32 = 10;

/// Maximum stickers a single transaction can award.
pub const STICKER_CAP: u64 = 5;

/// Line item category that grants one bonus sticker per unit.
pub const PROMO_CATEGORY: &str = "promo";

/// Stickers earned for a transaction.
///
/// 1. Base: one sticker per $10 spent, truncated (25.50 → 2).
/// 2. Bonus: one sticker per unit of every `"promo"` item.
/// 3. Cap: at most [`STICKER_CAP`] stickers per transaction.
///
/// `basket_total` is non-negative by contract; values below zero clamp
/// to a zero base rather than panicking.
pub fn calculate_stickers(basket_total: Decimal, items: &[LineItem]) -> u64 {
    let base = (basket_total / Decimal::from(BASE_RATE_DIVISOR))
        .floor()
        .max(Decimal::ZERO);
    // Totals large enough to overflow u64 are far past the cap anyway.
    let base = base.to_u64().unwrap_or(STICKER_CAP);

    let promo_bonus: u64 = items
        .iter()
        .filter(|item| item.category == PROMO_CATEGORY)
        .map(|item| u64::from(item.quantity))
        .sum();

    base.saturating_add(promo_bonus).min(STICKER_CAP)
}
