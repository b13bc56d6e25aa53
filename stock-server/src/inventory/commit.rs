//! Commit Engine
//!
//! Turns a cart's reservations into permanent stock decrements at the
//! `* -> ready_for_payment` transition. Runs inside the cart's write
//! transaction: any failure aborts every decrement made so far.

use chrono::Duration;
use redb::WriteTransaction;
use shared::models::{Cart, CartState, MovementType, StockKey};

use super::error::{InventoryError, InventoryResult};
use super::ledger::{MovementInfo, StockLedger};
use super::storage::InventoryStore;

/// Default payment window after commit, in minutes
pub const DEFAULT_RESERVATION_WINDOW_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone)]
pub struct CommitEngine {
    reservation_window: Duration,
}

impl Default for CommitEngine {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_RESERVATION_WINDOW_MINUTES))
    }
}

impl CommitEngine {
    pub fn new(reservation_window: Duration) -> Self {
        Self { reservation_window }
    }

    pub fn reservation_window(&self) -> Duration {
        self.reservation_window
    }

    /// Commit every line of `cart` and move it to `target`
    ///
    /// Reserved lines consume their reservation; any quantity not covered
    /// by a reservation is taken from the first location able to supply it
    /// whole. The cart is mutated in memory; the caller persists it in the
    /// same transaction.
    pub fn commit(
        &self,
        store: &InventoryStore,
        txn: &WriteTransaction,
        cart: &mut Cart,
        target: CartState,
        actor_id: Option<i64>,
        now: i64,
    ) -> InventoryResult<()> {
        if cart.lines.is_empty() {
            return Err(InventoryError::CartEmpty(cart.id));
        }
        if cart.lines.iter().all(|l| l.is_pending_confirmation()) {
            return Err(InventoryError::StockConfirmationPending(cart.id));
        }

        let ledger = StockLedger::new(store, txn);
        let reference = format!("cart:{}", cart.id);
        let info = || {
            MovementInfo::new(MovementType::Commit)
                .reference(reference.clone())
                .actor(actor_id)
        };

        // Step 1: lines backed by a reservation
        for line in cart.lines.iter().filter(|l| l.has_reservation()) {
            let key = StockKey::new(line.product_id, line.variant_id, line.location.clone());
            ledger.commit_reserved(&key, line.reserved_quantity, info())?;
            tracing::debug!(
                cart_id = cart.id,
                line_id = line.id,
                location = %line.location,
                quantity = line.reserved_quantity,
                "Committed reserved line"
            );
        }

        // Step 2: unreserved quantity, first fit by location
        for line in cart.lines.iter() {
            let uncovered = if line.has_reservation() {
                line.quantity - line.reserved_quantity
            } else {
                line.quantity
            };
            if uncovered <= 0 {
                continue;
            }
            let record =
                ledger.commit_first_fit(line.product_id, line.variant_id, uncovered, info())?;
            tracing::debug!(
                cart_id = cart.id,
                line_id = line.id,
                location = %record.location,
                quantity = uncovered,
                "Committed unreserved quantity"
            );
        }

        for line in cart.lines.iter_mut() {
            line.reserved_quantity = 0;
            line.location.clear();
            line.updated_at = now;
        }

        cart.state = target;
        cart.reserved_at = Some(now);
        cart.expires_at = Some(now + self.reservation_window.num_milliseconds());
        cart.updated_at = now;

        tracing::info!(
            cart_id = cart.id,
            lines = cart.lines.len(),
            expires_at = cart.expires_at,
            "Cart committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::reservation::ReservationManager;
    use shared::models::{CartLine, StockRecord};

    fn create_test_store() -> InventoryStore {
        InventoryStore::open_in_memory().unwrap()
    }

    fn seed(store: &InventoryStore, product_id: i64, location: &str, stock: i64) {
        let key = StockKey::new(product_id, 1, location);
        store
            .write(|txn| {
                StockLedger::new(store, txn).set_stock(
                    &key,
                    stock,
                    MovementInfo::new(MovementType::Adjustment),
                )
            })
            .unwrap();
    }

    fn line(id: i64, product_id: i64, quantity: i64) -> CartLine {
        CartLine {
            id,
            product_id,
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

    fn record(store: &InventoryStore, product_id: i64, location: &str) -> StockRecord {
        store
            .read_stock(&StockKey::new(product_id, 1, location))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_commit_consumes_reservations_and_first_fits_the_rest() {
        let store = create_test_store();
        seed(&store, 1, "deposito", 10);
        seed(&store, 2, "almacen", 1);
        seed(&store, 2, "local", 5);

        let mut cart = Cart::new(100, 7, 0);
        cart.lines.push(line(1, 1, 4));
        cart.lines.push(line(2, 2, 3));
        store
            .write(|txn| -> InventoryResult<()> {
                ReservationManager::new(&store, txn).reserve(&mut cart.lines[0], "deposito", 4)?;
                store.put_cart(txn, &cart)?;
                Ok(())
            })
            .unwrap();

        let engine = CommitEngine::default();
        store
            .write(|txn| -> InventoryResult<()> {
                engine.commit(&store, txn, &mut cart, CartState::ReadyForPayment, None, 1_000)?;
                store.put_cart(txn, &cart)?;
                Ok(())
            })
            .unwrap();

        let deposito = record(&store, 1, "deposito");
        assert_eq!((deposito.stock, deposito.reserved), (6, 0));
        assert_eq!(record(&store, 2, "almacen").stock, 1);
        assert_eq!(record(&store, 2, "local").stock, 2);

        assert_eq!(cart.state, CartState::ReadyForPayment);
        assert_eq!(cart.reserved_at, Some(1_000));
        assert_eq!(cart.expires_at, Some(1_000 + 24 * 3_600_000));
        assert!(cart.lines.iter().all(|l| l.reserved_quantity == 0));
        assert_eq!(store.read_due_payment_windows(i64::MAX).unwrap(), vec![100]);
    }

    #[test]
    fn test_out_of_stock_rolls_back_every_line() {
        let store = create_test_store();
        seed(&store, 1, "deposito", 10);
        seed(&store, 2, "deposito", 1);

        let mut cart = Cart::new(100, 7, 0);
        cart.lines.push(line(1, 1, 4));
        cart.lines.push(line(2, 2, 3));
        store
            .write(|txn| -> InventoryResult<()> {
                ReservationManager::new(&store, txn).reserve(&mut cart.lines[0], "deposito", 4)?;
                store.put_cart(txn, &cart)?;
                Ok(())
            })
            .unwrap();

        let before_lines = cart.lines.clone();
        let mut working = cart.clone();
        let engine = CommitEngine::default();
        let err = store
            .write(|txn| -> InventoryResult<()> {
                engine.commit(&store, txn, &mut working, CartState::ReadyForPayment, None, 1_000)?;
                store.put_cart(txn, &working)?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::OutOfStock {
                product_id: 2,
                quantity: 3,
                ..
            }
        ));

        let first = record(&store, 1, "deposito");
        assert_eq!((first.stock, first.reserved), (10, 4));
        let second = record(&store, 2, "deposito");
        assert_eq!((second.stock, second.reserved), (1, 0));

        let stored = store.read_cart(100).unwrap().unwrap();
        assert_eq!(stored.state, CartState::Draft);
        assert_eq!(stored.lines, before_lines);
        assert!(
            store
                .read_movements(1)
                .unwrap()
                .iter()
                .all(|m| m.movement_type != MovementType::Commit)
        );
    }

    #[test]
    fn test_mismatched_reservation_is_rejected() {
        let store = create_test_store();
        seed(&store, 1, "deposito", 10);

        // Line claims a reservation the ledger never recorded
        let mut cart = Cart::new(100, 7, 0);
        let mut l = line(1, 1, 4);
        l.reserved_quantity = 4;
        l.location = "deposito".to_string();
        cart.lines.push(l);

        let err = store
            .write(|txn| {
                CommitEngine::default().commit(
                    &store,
                    txn,
                    &mut cart,
                    CartState::ReadyForPayment,
                    None,
                    0,
                )
            })
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::ReservationMismatch {
                expected: 4,
                reserved: 0,
                ..
            }
        ));
        assert_eq!(record(&store, 1, "deposito").stock, 10);
    }

    #[test]
    fn test_all_lines_pending_confirmation_blocks_commit() {
        let store = create_test_store();
        let mut cart = Cart::new(100, 7, 0);
        let mut l = line(1, 1, 1);
        l.requires_stock_check = true;
        cart.lines.push(l);

        let err = store
            .write(|txn| {
                CommitEngine::default().commit(
                    &store,
                    txn,
                    &mut cart,
                    CartState::ReadyForPayment,
                    None,
                    0,
                )
            })
            .unwrap_err();
        assert!(matches!(err, InventoryError::StockConfirmationPending(100)));
    }
}
