//! Stock Ledger
//!
//! Per (product, variant, location) record of physical `stock` and
//! `reserved` units. Every mutation runs inside the caller's write
//! transaction so it commits or rolls back together with the cart change
//! that motivated it.
//!
//! Invariants enforced here:
//! - `0 <= reserved <= stock` on every record
//! - for capped products, `sum(stock + reserved)` across all locations stays
//!   within the cap whenever stock grows

use redb::WriteTransaction;
use shared::models::{MovementType, StockKey, StockMovement, StockRecord};
use shared::util::now_millis;

use super::error::{InventoryError, InventoryResult};
use super::storage::InventoryStore;

/// Audit context attached to a stock movement
#[derive(Debug, Clone)]
pub struct MovementInfo {
    pub movement_type: MovementType,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub actor_id: Option<i64>,
}

impl MovementInfo {
    pub fn new(movement_type: MovementType) -> Self {
        Self {
            movement_type,
            reason: None,
            reference: None,
            actor_id: None,
        }
    }

    pub fn reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn actor(mut self, actor_id: Option<i64>) -> Self {
        self.actor_id = actor_id;
        self
    }
}

/// Transaction-scoped view of the ledger
pub struct StockLedger<'a> {
    store: &'a InventoryStore,
    txn: &'a WriteTransaction,
    now: i64,
}

impl<'a> StockLedger<'a> {
    pub fn new(store: &'a InventoryStore, txn: &'a WriteTransaction) -> Self {
        Self {
            store,
            txn,
            now: now_millis(),
        }
    }

    pub fn record(&self, key: &StockKey) -> InventoryResult<Option<StockRecord>> {
        Ok(self.store.get_stock(self.txn, key)?)
    }

    /// `stock - reserved` at one location; zero when no record exists
    pub fn available(&self, key: &StockKey) -> InventoryResult<i64> {
        Ok(self.record(key)?.map(|r| r.available()).unwrap_or(0))
    }

    /// Records of one variant ordered by location name
    pub fn records_for_variant(
        &self,
        product_id: i64,
        variant_id: i64,
    ) -> InventoryResult<Vec<StockRecord>> {
        Ok(self.store.stock_for_variant(self.txn, product_id, variant_id)?)
    }

    /// Sellable units of one variant across all locations
    pub fn total_available(&self, product_id: i64, variant_id: i64) -> InventoryResult<i64> {
        Ok(self
            .records_for_variant(product_id, variant_id)?
            .iter()
            .map(StockRecord::available)
            .sum())
    }

    /// Move units between `stock` and `reserved`
    ///
    /// Positive deltas claim availability and fail with `InsufficientStock`.
    /// Negative deltas never fail: releasing more than is reserved clamps to
    /// zero and is reported on the `ledger_drift` target.
    pub fn adjust_reserved(&self, key: &StockKey, delta: i64) -> InventoryResult<StockRecord> {
        if delta == 0 {
            return self
                .record(key)?
                .ok_or_else(|| InventoryError::StockRecordNotFound(key.clone()));
        }

        if delta > 0 {
            let mut record = match self.record(key)? {
                Some(record) => record,
                None => {
                    return Err(InventoryError::InsufficientStock {
                        key: key.clone(),
                        requested: delta,
                        available: 0,
                    });
                }
            };
            let available = record.available();
            if available < delta {
                return Err(InventoryError::InsufficientStock {
                    key: key.clone(),
                    requested: delta,
                    available,
                });
            }
            record.reserved += delta;
            record.updated_at = self.now;
            self.store.put_stock(self.txn, &record)?;
            return Ok(record);
        }

        let release = -delta;
        let Some(mut record) = self.record(key)? else {
            self.report_drift(key, release, 0);
            return Ok(StockRecord::new(key, self.now));
        };
        if record.reserved < release {
            self.report_drift(key, release, record.reserved);
            record.reserved = 0;
        } else {
            record.reserved -= release;
        }
        record.updated_at = self.now;
        self.store.put_stock(self.txn, &record)?;
        Ok(record)
    }

    fn report_drift(&self, key: &StockKey, requested: i64, reserved: i64) {
        let total = self.store.record_drift();
        tracing::warn!(
            target: "ledger_drift",
            product_id = key.product_id,
            variant_id = key.variant_id,
            location = %key.location,
            requested,
            reserved,
            drift_events = total,
            "Release exceeds recorded reservation, clamping to zero"
        );
    }

    /// Change physical stock by `delta`, creating the record on first use
    pub fn adjust_stock(
        &self,
        key: &StockKey,
        delta: i64,
        info: MovementInfo,
    ) -> InventoryResult<StockRecord> {
        let (mut record, created) = match self.record(key)? {
            Some(record) => (record, false),
            None => (StockRecord::new(key, self.now), true),
        };

        let previous = record.stock;
        let new_stock = previous + delta;
        if new_stock < 0 || new_stock < record.reserved {
            return Err(InventoryError::StockBelowReserved {
                key: key.clone(),
                stock: new_stock,
                reserved: record.reserved,
            });
        }
        if delta > 0 {
            self.check_cap(key.product_id, delta)?;
        }

        record.stock = new_stock;
        record.deleted_at = None;
        record.updated_at = self.now;
        self.store.put_stock(self.txn, &record)?;

        let mut info = info;
        if created && info.movement_type == MovementType::Adjustment {
            info.movement_type = MovementType::Initial;
        }
        self.append_movement(key, delta, previous, new_stock, info)?;
        Ok(record)
    }

    /// Set absolute stock at one location
    pub fn set_stock(
        &self,
        key: &StockKey,
        stock: i64,
        info: MovementInfo,
    ) -> InventoryResult<StockRecord> {
        if stock < 0 {
            return Err(InventoryError::Validation(
                "stock must not be negative".to_string(),
            ));
        }
        let current = self.record(key)?.map(|r| r.stock).unwrap_or(0);
        self.adjust_stock(key, stock - current, info)
    }

    /// Move available units between two locations of the same variant
    ///
    /// Total stock is unchanged, so the cap is not re-checked.
    pub fn transfer(
        &self,
        from: &StockKey,
        to: &StockKey,
        quantity: i64,
        info: MovementInfo,
    ) -> InventoryResult<(StockRecord, StockRecord)> {
        if quantity <= 0 {
            return Err(InventoryError::Validation(
                "transfer quantity must be positive".to_string(),
            ));
        }
        if from == to {
            return Err(InventoryError::Validation(
                "transfer source and destination must differ".to_string(),
            ));
        }

        let mut source = self
            .record(from)?
            .ok_or_else(|| InventoryError::StockRecordNotFound(from.clone()))?;
        let available = source.available();
        if available < quantity {
            return Err(InventoryError::InsufficientStock {
                key: from.clone(),
                requested: quantity,
                available,
            });
        }
        let mut target = self
            .record(to)?
            .unwrap_or_else(|| StockRecord::new(to, self.now));

        let source_prev = source.stock;
        source.stock -= quantity;
        source.updated_at = self.now;
        let target_prev = target.stock;
        target.stock += quantity;
        target.deleted_at = None;
        target.updated_at = self.now;

        self.store.put_stock(self.txn, &source)?;
        self.store.put_stock(self.txn, &target)?;

        let info = MovementInfo {
            movement_type: MovementType::Transfer,
            ..info
        };
        self.append_movement(from, -quantity, source_prev, source.stock, info.clone())?;
        self.append_movement(to, quantity, target_prev, target.stock, info)?;
        Ok((source, target))
    }

    /// Soft-delete a location; refused while reservations are held
    pub fn soft_delete(&self, key: &StockKey) -> InventoryResult<StockRecord> {
        let mut record = self
            .record(key)?
            .ok_or_else(|| InventoryError::StockRecordNotFound(key.clone()))?;
        if record.reserved > 0 {
            return Err(InventoryError::Validation(format!(
                "{key} still holds {} reserved units",
                record.reserved
            )));
        }
        if record.deleted_at.is_none() {
            record.deleted_at = Some(self.now);
            record.updated_at = self.now;
            self.store.put_stock(self.txn, &record)?;
        }
        Ok(record)
    }

    /// Turn a held reservation into a permanent decrement
    pub fn commit_reserved(
        &self,
        key: &StockKey,
        quantity: i64,
        info: MovementInfo,
    ) -> InventoryResult<StockRecord> {
        let mut record = match self.record(key)? {
            Some(record) => record,
            None => {
                return Err(InventoryError::ReservationMismatch {
                    key: key.clone(),
                    expected: quantity,
                    stock: 0,
                    reserved: 0,
                });
            }
        };
        if record.reserved < quantity || record.stock < quantity {
            return Err(InventoryError::ReservationMismatch {
                key: key.clone(),
                expected: quantity,
                stock: record.stock,
                reserved: record.reserved,
            });
        }

        let previous = record.stock;
        record.stock -= quantity;
        record.reserved -= quantity;
        record.updated_at = self.now;
        self.store.put_stock(self.txn, &record)?;
        self.append_movement(key, -quantity, previous, record.stock, info)?;
        Ok(record)
    }

    /// Decrement stock at the first location (by name) able to cover
    /// `quantity` on its own
    pub fn commit_first_fit(
        &self,
        product_id: i64,
        variant_id: i64,
        quantity: i64,
        info: MovementInfo,
    ) -> InventoryResult<StockRecord> {
        let candidate = self
            .records_for_variant(product_id, variant_id)?
            .into_iter()
            .find(|r| r.available() >= quantity);

        let Some(mut record) = candidate else {
            return Err(InventoryError::OutOfStock {
                product_id,
                variant_id,
                quantity,
            });
        };

        let previous = record.stock;
        record.stock -= quantity;
        record.updated_at = self.now;
        self.store.put_stock(self.txn, &record)?;
        let key = record.key();
        self.append_movement(&key, -quantity, previous, record.stock, info)?;
        Ok(record)
    }

    fn check_cap(&self, product_id: i64, increase: i64) -> InventoryResult<()> {
        let Some(cap) = self
            .store
            .get_product(self.txn, product_id)?
            .and_then(|p| p.total_stock_cap)
        else {
            return Ok(());
        };

        let combined: i64 = self
            .store
            .stock_for_product(self.txn, product_id)?
            .iter()
            .map(|r| r.stock + r.reserved)
            .sum();
        let proposed = combined + increase;
        if proposed > cap {
            return Err(InventoryError::CapExceeded {
                product_id,
                cap,
                proposed,
            });
        }
        Ok(())
    }

    fn append_movement(
        &self,
        key: &StockKey,
        delta: i64,
        previous: i64,
        new: i64,
        info: MovementInfo,
    ) -> InventoryResult<()> {
        let mut movement = StockMovement {
            id: 0,
            product_id: key.product_id,
            variant_id: key.variant_id,
            location: key.location.clone(),
            movement_type: info.movement_type,
            delta,
            previous,
            new,
            reason: info.reason,
            reference: info.reference,
            actor_id: info.actor_id,
            created_at: self.now,
        };
        self.store.append_movement(self.txn, &mut movement)?;
        Ok(())
    }
}
