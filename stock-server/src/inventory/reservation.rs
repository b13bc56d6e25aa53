//! Reservation Manager
//!
//! Claims and releases ledger quantities on behalf of cart lines. The line
//! is only mutated after the ledger write succeeded, so a failed operation
//! leaves both the line and (after the transaction aborts) the ledger as
//! they were.

use redb::WriteTransaction;
use shared::models::{CartLine, StockKey};

use super::error::{InventoryError, InventoryResult};
use super::ledger::StockLedger;
use super::storage::InventoryStore;

pub struct ReservationManager<'a> {
    ledger: StockLedger<'a>,
}

impl<'a> ReservationManager<'a> {
    pub fn new(store: &'a InventoryStore, txn: &'a WriteTransaction) -> Self {
        Self {
            ledger: StockLedger::new(store, txn),
        }
    }

    pub fn ledger(&self) -> &StockLedger<'a> {
        &self.ledger
    }

    fn key(line: &CartLine, location: &str) -> StockKey {
        StockKey::new(line.product_id, line.variant_id, location)
    }

    /// Reserve `quantity` more units for `line` at `location`
    pub fn reserve(
        &self,
        line: &mut CartLine,
        location: &str,
        quantity: i64,
    ) -> InventoryResult<()> {
        if quantity <= 0 {
            return Err(InventoryError::Validation(
                "reservation quantity must be positive".to_string(),
            ));
        }
        if location.is_empty() {
            return Err(InventoryError::Validation(
                "reservation location is required".to_string(),
            ));
        }
        if line.has_reservation() && line.location != location {
            return Err(InventoryError::Validation(format!(
                "line {} already holds a reservation at {}",
                line.id, line.location
            )));
        }
        if line.reserved_quantity + quantity > line.quantity {
            return Err(InventoryError::Validation(format!(
                "cannot reserve {} for line {}: quantity is {}, already reserved {}",
                quantity, line.id, line.quantity, line.reserved_quantity
            )));
        }

        self.ledger
            .adjust_reserved(&Self::key(line, location), quantity)?;
        line.reserved_quantity += quantity;
        line.location = location.to_string();
        Ok(())
    }

    /// Bring the line's reservation to `new_reserved`
    ///
    /// Growth can fail on stock; shrinking always succeeds.
    pub fn change_reservation(
        &self,
        line: &mut CartLine,
        new_reserved: i64,
    ) -> InventoryResult<()> {
        if new_reserved < 0 {
            return Err(InventoryError::Validation(
                "reserved quantity must not be negative".to_string(),
            ));
        }
        let delta = new_reserved - line.reserved_quantity;
        if delta == 0 {
            return Ok(());
        }
        if new_reserved == 0 {
            return self.release(line);
        }
        if line.location.is_empty() {
            return Err(InventoryError::Validation(format!(
                "line {} has no reservation location",
                line.id
            )));
        }

        self.ledger
            .adjust_reserved(&Self::key(line, &line.location), delta)?;
        line.reserved_quantity = new_reserved;
        Ok(())
    }

    /// Drop the line's reservation; a no-op when nothing is held
    pub fn release(&self, line: &mut CartLine) -> InventoryResult<()> {
        if line.reserved_quantity > 0 && !line.location.is_empty() {
            self.ledger.adjust_reserved(
                &Self::key(line, &line.location),
                -line.reserved_quantity,
            )?;
        }
        line.reserved_quantity = 0;
        line.location.clear();
        Ok(())
    }

    /// Move the reservation to `new_location`
    ///
    /// Moves the held amount, or the full line quantity when nothing was
    /// held yet. The new location is claimed before the old one is
    /// released.
    pub fn move_reservation(&self, line: &mut CartLine, new_location: &str) -> InventoryResult<()> {
        if new_location.is_empty() {
            return Err(InventoryError::Validation(
                "reservation location is required".to_string(),
            ));
        }
        if line.has_reservation() && line.location == new_location {
            return Ok(());
        }

        let amount = if line.reserved_quantity > 0 {
            line.reserved_quantity
        } else {
            line.quantity
        };

        self.ledger
            .adjust_reserved(&Self::key(line, new_location), amount)?;
        if line.has_reservation() {
            self.ledger.adjust_reserved(
                &Self::key(line, &line.location),
                -line.reserved_quantity,
            )?;
        }

        line.reserved_quantity = amount;
        line.location = new_location.to_string();
        Ok(())
    }

    /// Release every line of a cart
    pub fn release_all(&self, lines: &mut [CartLine]) -> InventoryResult<()> {
        for line in lines.iter_mut() {
            self.release(line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::ledger::MovementInfo;
    use shared::models::MovementType;

    fn create_test_store() -> InventoryStore {
        InventoryStore::open_in_memory().unwrap()
    }

    fn line(id: i64, quantity: i64) -> CartLine {
        CartLine {
            id,
            product_id: 1,
            variant_id: 1,
            quantity,
            reserved_quantity: 0,
            location: String::new(),
            requires_stock_check: false,
            stock_confirmed: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn seed(store: &InventoryStore, location: &str, stock: i64, reserved: i64) {
        let key = StockKey::new(1, 1, location);
        store
            .write(|txn| -> InventoryResult<()> {
                let ledger = StockLedger::new(store, txn);
                ledger.set_stock(&key, stock, MovementInfo::new(MovementType::Adjustment))?;
                if reserved > 0 {
                    ledger.adjust_reserved(&key, reserved)?;
                }
                Ok(())
            })
            .unwrap();
    }

    fn reserved_at(store: &InventoryStore, location: &str) -> i64 {
        store
            .read_stock(&StockKey::new(1, 1, location))
            .unwrap()
            .map(|r| r.reserved)
            .unwrap_or(0)
    }

    #[test]
    fn test_deposito_scenario() {
        let store = create_test_store();
        seed(&store, "deposito", 10, 2);

        let mut first = line(1, 5);
        store
            .write(|txn| ReservationManager::new(&store, txn).reserve(&mut first, "deposito", 5))
            .unwrap();
        let record = store
            .read_stock(&StockKey::new(1, 1, "deposito"))
            .unwrap()
            .unwrap();
        assert_eq!(record.reserved, 7);
        assert_eq!(record.available(), 3);
        assert_eq!(first.reserved_quantity, 5);
        assert_eq!(first.location, "deposito");

        let mut second = line(2, 5);
        let err = store
            .write(|txn| ReservationManager::new(&store, txn).reserve(&mut second, "deposito", 5))
            .unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientStock { .. }));
        assert_eq!(second.reserved_quantity, 0);
        assert!(second.location.is_empty());
        assert_eq!(reserved_at(&store, "deposito"), 7);
    }

    #[test]
    fn test_release_twice_equals_release_once() {
        let store = create_test_store();
        seed(&store, "deposito", 10, 0);
        let mut l = line(1, 4);
        store
            .write(|txn| ReservationManager::new(&store, txn).reserve(&mut l, "deposito", 4))
            .unwrap();

        store
            .write(|txn| ReservationManager::new(&store, txn).release(&mut l))
            .unwrap();
        let after_once = store
            .read_stock(&StockKey::new(1, 1, "deposito"))
            .unwrap();
        store
            .write(|txn| ReservationManager::new(&store, txn).release(&mut l))
            .unwrap();
        let after_twice = store
            .read_stock(&StockKey::new(1, 1, "deposito"))
            .unwrap();

        assert_eq!(after_once.map(|r| r.reserved), Some(0));
        assert_eq!(after_twice.map(|r| r.reserved), Some(0));
        assert_eq!(store.drift_count(), 0);
    }

    #[test]
    fn test_change_reservation_grows_and_shrinks() {
        let store = create_test_store();
        seed(&store, "deposito", 6, 0);
        let mut l = line(1, 10);
        store
            .write(|txn| ReservationManager::new(&store, txn).reserve(&mut l, "deposito", 2))
            .unwrap();

        store
            .write(|txn| ReservationManager::new(&store, txn).change_reservation(&mut l, 6))
            .unwrap();
        assert_eq!(reserved_at(&store, "deposito"), 6);

        let err = store
            .write(|txn| ReservationManager::new(&store, txn).change_reservation(&mut l, 7))
            .unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientStock { .. }));
        assert_eq!(l.reserved_quantity, 6);

        store
            .write(|txn| ReservationManager::new(&store, txn).change_reservation(&mut l, 1))
            .unwrap();
        assert_eq!(reserved_at(&store, "deposito"), 1);
        assert_eq!(l.reserved_quantity, 1);
    }

    #[test]
    fn test_failed_move_leaves_old_reservation() {
        let store = create_test_store();
        seed(&store, "almacen", 5, 0);
        seed(&store, "deposito", 2, 0);
        let mut l = line(1, 4);
        store
            .write(|txn| ReservationManager::new(&store, txn).reserve(&mut l, "almacen", 4))
            .unwrap();

        let before = l.clone();
        let err = store
            .write(|txn| ReservationManager::new(&store, txn).move_reservation(&mut l, "deposito"))
            .unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientStock { .. }));
        assert_eq!(l, before);
        assert_eq!(reserved_at(&store, "almacen"), 4);
        assert_eq!(reserved_at(&store, "deposito"), 0);

        seed(&store, "deposito", 8, 0);
        store
            .write(|txn| ReservationManager::new(&store, txn).move_reservation(&mut l, "deposito"))
            .unwrap();
        assert_eq!(reserved_at(&store, "almacen"), 0);
        assert_eq!(reserved_at(&store, "deposito"), 4);
        assert_eq!(l.location, "deposito");
    }

    #[test]
    fn test_reserve_cannot_exceed_line_quantity() {
        let store = create_test_store();
        seed(&store, "deposito", 10, 0);
        let mut l = line(1, 3);
        let err = store
            .write(|txn| ReservationManager::new(&store, txn).reserve(&mut l, "deposito", 4))
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
        assert_eq!(reserved_at(&store, "deposito"), 0);
    }
}
