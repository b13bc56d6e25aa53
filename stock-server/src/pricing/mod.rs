//! Pricing
//!
//! Quantity tiers stored in the ledger settings table and the pure
//! [`PriceCalculator`] consumed by checkout.

mod calculator;

pub use calculator::*;

use shared::models::PriceTier;

use crate::inventory::{InventoryError, InventoryResult, InventoryStore};
use crate::utils::validation::{MAX_NAME_LEN, validate_required_text};

#[derive(Debug, Clone)]
pub struct PricingService {
    store: InventoryStore,
}

impl PricingService {
    pub fn new(store: InventoryStore) -> Self {
        Self { store }
    }

    pub fn tiers(&self) -> InventoryResult<Vec<PriceTier>> {
        Ok(self.store.read_price_tiers()?)
    }

    /// Calculator over the currently stored tiers
    pub fn calculator(&self) -> InventoryResult<TieredPricing> {
        Ok(TieredPricing::new(self.tiers()?))
    }

    /// Replace the whole tier list
    pub fn replace_tiers(&self, mut tiers: Vec<PriceTier>) -> InventoryResult<Vec<PriceTier>> {
        validate_tiers(&tiers)?;
        tiers.sort_by_key(|t| t.order_index);
        self.store
            .write(|txn| self.store.put_price_tiers(txn, &tiers))?;
        tracing::info!(count = tiers.len(), "Price tiers replaced");
        Ok(tiers)
    }
}

fn validate_tiers(tiers: &[PriceTier]) -> InventoryResult<()> {
    for tier in tiers {
        validate_required_text(&tier.name, "tier name", MAX_NAME_LEN)?;
        if tier.value.is_sign_negative() {
            return Err(InventoryError::Validation(format!(
                "tier '{}' has a negative value",
                tier.name
            )));
        }
        if tier.min_quantity < 0 {
            return Err(InventoryError::Validation(format!(
                "tier '{}' has a negative minimum quantity",
                tier.name
            )));
        }
    }
    let defaults = tiers.iter().filter(|t| t.is_default && t.active).count();
    if defaults > 1 {
        return Err(InventoryError::Validation(
            "at most one active default tier is allowed".to_string(),
        ));
    }
    Ok(())
}
