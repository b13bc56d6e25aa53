//! Stock administration
//!
//! Absolute stock corrections, transfers between locations, soft-delete and
//! the product attributes the ledger depends on (cost price, stock cap).

use shared::models::{
    MovementType, Product, ProductUpsert, StockKey, StockMovement, StockRecord, StockTransfer,
};
use shared::util::now_millis;

use super::error::{InventoryError, InventoryResult};
use super::ledger::{MovementInfo, StockLedger};
use super::storage::InventoryStore;
use crate::utils::validation::{validate_location, validate_required_text, MAX_NAME_LEN};

#[derive(Debug, Clone)]
pub struct StockService {
    store: InventoryStore,
}

impl StockService {
    pub fn new(store: InventoryStore) -> Self {
        Self { store }
    }

    /// Set absolute stock at one location
    pub fn set_stock(
        &self,
        key: &StockKey,
        stock: i64,
        reason: Option<String>,
        actor_id: i64,
    ) -> InventoryResult<StockRecord> {
        validate_location(&key.location)?;
        let record = self.store.write(|txn| -> InventoryResult<StockRecord> {
            if self.store.get_product(txn, key.product_id)?.is_none() {
                return Err(InventoryError::ProductNotFound(key.product_id));
            }
            StockLedger::new(&self.store, txn).set_stock(
                key,
                stock,
                MovementInfo::new(MovementType::Adjustment)
                    .reason(reason)
                    .actor(Some(actor_id)),
            )
        })?;
        tracing::info!(%key, stock, actor_id, "Stock set");
        Ok(record)
    }

    pub fn transfer(
        &self,
        req: &StockTransfer,
        actor_id: i64,
    ) -> InventoryResult<(StockRecord, StockRecord)> {
        validate_location(&req.from)?;
        validate_location(&req.to)?;
        let from = StockKey::new(req.product_id, req.variant_id, req.from.clone());
        let to = StockKey::new(req.product_id, req.variant_id, req.to.clone());
        let reference = format!("transfer:{}->{}", req.from, req.to);

        let records = self.store.write(|txn| {
            StockLedger::new(&self.store, txn).transfer(
                &from,
                &to,
                req.quantity,
                MovementInfo::new(MovementType::Transfer)
                    .reason(req.reason.clone())
                    .reference(reference)
                    .actor(Some(actor_id)),
            )
        })?;
        tracing::info!(%from, %to, quantity = req.quantity, actor_id, "Stock transferred");
        Ok(records)
    }

    pub fn soft_delete(&self, key: &StockKey) -> InventoryResult<StockRecord> {
        let record = self
            .store
            .write(|txn| StockLedger::new(&self.store, txn).soft_delete(key))?;
        tracing::info!(%key, "Stock record soft-deleted");
        Ok(record)
    }

    pub fn list(&self, product_id: i64) -> InventoryResult<Vec<StockRecord>> {
        Ok(self.store.read_stock_for_product(product_id)?)
    }

    pub fn movements(&self, product_id: i64) -> InventoryResult<Vec<StockMovement>> {
        Ok(self.store.read_movements(product_id)?)
    }

    /// Create or update a product's ledger-relevant attributes
    ///
    /// Lowering the cap below what is already stocked is refused.
    pub fn upsert_product(&self, id: i64, req: ProductUpsert) -> InventoryResult<Product> {
        validate_required_text(&req.name, "name", MAX_NAME_LEN)?;
        if req.cost_price.is_sign_negative() {
            return Err(InventoryError::Validation(
                "cost_price must not be negative".to_string(),
            ));
        }
        if let Some(cap) = req.total_stock_cap {
            if cap < 0 {
                return Err(InventoryError::Validation(
                    "total_stock_cap must not be negative".to_string(),
                ));
            }
        }

        self.store.write(|txn| {
            if let Some(cap) = req.total_stock_cap {
                let combined: i64 = self
                    .store
                    .stock_for_product(txn, id)?
                    .iter()
                    .map(|r| r.stock + r.reserved)
                    .sum();
                if combined > cap {
                    return Err(InventoryError::CapExceeded {
                        product_id: id,
                        cap,
                        proposed: combined,
                    });
                }
            }
            let product = Product {
                id,
                name: req.name.trim().to_string(),
                cost_price: req.cost_price,
                total_stock_cap: req.total_stock_cap,
                updated_at: now_millis(),
            };
            self.store.put_product(txn, &product)?;
            Ok(product)
        })
    }

    pub fn get_product(&self, id: i64) -> InventoryResult<Product> {
        self.store
            .read_product(id)?
            .ok_or(InventoryError::ProductNotFound(id))
    }
}
