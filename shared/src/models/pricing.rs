//! Price Tier Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a tier derives the unit price from the cost price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFormula {
    /// cost * value
    Multiplier,
    /// cost + cost * value / 100
    PercentageMarkup,
    /// cost + value
    FlatAmount,
}

/// Quantity-based price tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    pub name: String,
    pub formula: PriceFormula,
    pub value: Decimal,
    /// Minimum total quantity for the tier to apply
    #[serde(default)]
    pub min_quantity: i64,
    /// Lower wins when several tiers apply
    pub order_index: i32,
    /// Fallback when no tier's minimum is met
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
