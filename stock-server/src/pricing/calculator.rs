//! Tiered unit price calculation
//!
//! Pure functions over a tier list: no storage access, no side effects.

use rust_decimal::prelude::*;
use shared::models::{PriceFormula, PriceTier};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Round to cents
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Unit price for a cost price at a given checkout quantity
pub trait PriceCalculator: Send + Sync {
    fn unit_price(&self, cost_price: Decimal, quantity: i64) -> Decimal;
}

/// Quantity-tiered pricing
#[derive(Debug, Clone, Default)]
pub struct TieredPricing {
    tiers: Vec<PriceTier>,
}

impl TieredPricing {
    pub fn new(tiers: Vec<PriceTier>) -> Self {
        Self { tiers }
    }

    /// Tier in effect for `quantity`
    ///
    /// Among active tiers whose minimum is met, the lowest `order_index`
    /// wins; otherwise the active default tier; otherwise none.
    pub fn applicable_tier(&self, quantity: i64) -> Option<&PriceTier> {
        self.tiers
            .iter()
            .filter(|t| t.active && quantity >= t.min_quantity)
            .min_by_key(|t| t.order_index)
            .or_else(|| self.tiers.iter().find(|t| t.active && t.is_default))
    }
}

/// Apply one tier's formula to a cost price
pub fn apply_formula(tier: &PriceTier, cost_price: Decimal) -> Decimal {
    let price = match tier.formula {
        PriceFormula::Multiplier => cost_price * tier.value,
        PriceFormula::PercentageMarkup => cost_price + cost_price * tier.value / Decimal::ONE_HUNDRED,
        PriceFormula::FlatAmount => cost_price + tier.value,
    };
    round_money(price.max(Decimal::ZERO))
}

impl PriceCalculator for TieredPricing {
    fn unit_price(&self, cost_price: Decimal, quantity: i64) -> Decimal {
        match self.applicable_tier(quantity) {
            Some(tier) => apply_formula(tier, cost_price),
            None => round_money(cost_price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(
        name: &str,
        formula: PriceFormula,
        value: Decimal,
        min_quantity: i64,
        order_index: i32,
        is_default: bool,
    ) -> PriceTier {
        PriceTier {
            name: name.to_string(),
            formula,
            value,
            min_quantity,
            order_index,
            is_default,
            active: true,
        }
    }

    fn wholesale() -> TieredPricing {
        TieredPricing::new(vec![
            tier("minorista", PriceFormula::PercentageMarkup, Decimal::from(100), 0, 3, true),
            tier("mayorista", PriceFormula::PercentageMarkup, Decimal::from(50), 12, 2, false),
            tier("distribuidor", PriceFormula::Multiplier, Decimal::new(125, 2), 50, 1, false),
        ])
    }

    #[test]
    fn lowest_order_index_among_met_minimums_wins() {
        let pricing = wholesale();
        assert_eq!(pricing.applicable_tier(5).unwrap().name, "minorista");
        assert_eq!(pricing.applicable_tier(12).unwrap().name, "mayorista");
        assert_eq!(pricing.applicable_tier(80).unwrap().name, "distribuidor");
    }

    #[test]
    fn formulas() {
        let cost = Decimal::new(1000, 2);
        let pricing = wholesale();
        assert_eq!(pricing.unit_price(cost, 1), Decimal::new(2000, 2));
        assert_eq!(pricing.unit_price(cost, 12), Decimal::new(1500, 2));
        assert_eq!(pricing.unit_price(cost, 50), Decimal::new(1250, 2));

        let flat = tier("flat", PriceFormula::FlatAmount, Decimal::new(333, 2), 0, 0, false);
        assert_eq!(apply_formula(&flat, cost), Decimal::new(1333, 2));
    }

    #[test]
    fn falls_back_to_default_then_cost() {
        let mut tiers = vec![
            tier("default", PriceFormula::FlatAmount, Decimal::ONE, 10, 5, true),
            tier("big", PriceFormula::Multiplier, Decimal::TWO, 20, 1, false),
        ];
        let pricing = TieredPricing::new(tiers.clone());
        assert_eq!(pricing.applicable_tier(3).unwrap().name, "default");

        tiers[0].active = false;
        let pricing = TieredPricing::new(tiers);
        assert!(pricing.applicable_tier(3).is_none());
        assert_eq!(pricing.unit_price(Decimal::new(1005, 3), 3), Decimal::new(101, 2));
    }
}
