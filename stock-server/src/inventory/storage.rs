//! redb-based storage for the stock ledger, carts and orders
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `stock_records` | `(product_id, variant_id, location)` | `StockRecord` | Ledger rows |
//! | `stock_movements` | `(product_id, sequence)` | `StockMovement` | Append-only audit log |
//! | `products` | `product_id` | `Product` | Cost price and stock cap |
//! | `carts` | `cart_id` | `Cart` | Carts with embedded lines |
//! | `active_carts` | `user_id` | `cart_id` | One non-terminal cart per customer |
//! | `cart_lines` | `line_id` | `cart_id` | Line → cart lookup |
//! | `vendor_carts` | `(vendor_id, cart_id)` | `()` | Carts assigned to each seller |
//! | `payment_windows` | `(expires_at, cart_id)` | `()` | Sweeper index of `ready_for_payment` carts |
//! | `orders` | `order_id` | `Order` | Orders derived from carts |
//! | `cart_orders` | `cart_id` | `order_id` | Open order per cart |
//! | `staff` | `staff_id` | `StaffMember` | Sellers and admins |
//! | `assignment_cursor` | `&str` | `i64` | Round-robin cursor (`seller_rr`) |
//! | `settings` | `&str` | JSON | Price tiers |
//! | `sequence_counter` | `&str` | `u64` | Movement sequence |
//!
//! # Locking
//!
//! redb admits a single write transaction at a time, so every
//! read-check-write sequence inside [`InventoryStore::write`] is serialized
//! against all other writers. Entry to the writer is bounded by a gate with
//! a timeout; a caller that cannot get in within the timeout (after one
//! transparent retry) gets [`StorageError::LockTimeout`].
//!
//! Read-only views use snapshot read transactions and must never feed a
//! later write.

use parking_lot::Mutex;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{
    Cart, CartState, Order, PriceTier, Product, StaffMember, StockKey, StockMovement, StockRecord,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

const STOCK_TABLE: TableDefinition<(i64, i64, &str), &[u8]> =
    TableDefinition::new("stock_records");

const MOVEMENTS_TABLE: TableDefinition<(i64, u64), &[u8]> =
    TableDefinition::new("stock_movements");

const PRODUCTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("products");

const CARTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("carts");

const ACTIVE_CARTS_TABLE: TableDefinition<i64, i64> = TableDefinition::new("active_carts");

const CART_LINES_TABLE: TableDefinition<i64, i64> = TableDefinition::new("cart_lines");

const VENDOR_CARTS_TABLE: TableDefinition<(i64, i64), ()> = TableDefinition::new("vendor_carts");

const PAYMENT_WINDOWS_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("payment_windows");

const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

const CART_ORDERS_TABLE: TableDefinition<i64, i64> = TableDefinition::new("cart_orders");

const STAFF_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("staff");

const CURSOR_TABLE: TableDefinition<&str, i64> = TableDefinition::new("assignment_cursor");

const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

/// Cursor row used by seller round-robin
pub const SELLER_CURSOR_KEY: &str = "seller_rr";
const MOVEMENT_SEQUENCE_KEY: &str = "movement_seq";
const PRICE_TIERS_KEY: &str = "price_tiers";

/// Default bound on waiting for the writer
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timed out waiting for the ledger write lock")]
    LockTimeout,
}

pub type StorageResult<T> = Result<T, StorageError>;

fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Records of one product, or of one variant when `variant_id` is given
///
/// Open-ended scan from the prefix, stopped at the first foreign key, so
/// ids at the top of the `i64` range need no exclusive upper bound.
fn scan_stock<T>(
    table: &T,
    product_id: i64,
    variant_id: Option<i64>,
) -> StorageResult<Vec<StockRecord>>
where
    T: ReadableTable<(i64, i64, &'static str), &'static [u8]>,
{
    let start = (product_id, variant_id.unwrap_or(i64::MIN), "");
    let mut records = Vec::new();
    for result in table.range(start..)? {
        let (key, value) = result?;
        let (key_product, key_variant, _) = key.value();
        if key_product != product_id || variant_id.is_some_and(|id| id != key_variant) {
            break;
        }
        records.push(decode(value.value())?);
    }
    Ok(records)
}

/// Ledger store backed by redb
///
/// Cheap to clone; all clones share the database, the writer gate and the
/// drift counter.
#[derive(Clone)]
pub struct InventoryStore {
    db: Arc<Database>,
    write_gate: Arc<Mutex<()>>,
    lock_timeout: Duration,
    drift_events: Arc<AtomicU64>,
}

impl std::fmt::Debug for InventoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryStore")
            .field("lock_timeout", &self.lock_timeout)
            .field("drift_events", &self.drift_count())
            .finish()
    }
}

impl InventoryStore {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: once `commit()` returns the
    /// change is on disk, and a crash mid-transaction leaves the previous
    /// state intact.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and throwaway runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(STOCK_TABLE)?;
            let _ = write_txn.open_table(MOVEMENTS_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(CARTS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_CARTS_TABLE)?;
            let _ = write_txn.open_table(CART_LINES_TABLE)?;
            let _ = write_txn.open_table(VENDOR_CARTS_TABLE)?;
            let _ = write_txn.open_table(PAYMENT_WINDOWS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(CART_ORDERS_TABLE)?;
            let _ = write_txn.open_table(STAFF_TABLE)?;
            let _ = write_txn.open_table(CURSOR_TABLE)?;
            let _ = write_txn.open_table(SETTINGS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(MOVEMENT_SEQUENCE_KEY)?.is_none() {
                seq_table.insert(MOVEMENT_SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            write_gate: Arc::new(Mutex::new(())),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            drift_events: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Override the writer gate timeout
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    // ========== Transactions ==========

    /// Run `f` inside one write transaction
    ///
    /// Commits when `f` returns `Ok`, aborts otherwise, so nothing `f` wrote
    /// survives an error. Waiting for the writer is retried once before
    /// giving up with [`StorageError::LockTimeout`].
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&WriteTransaction) -> Result<T, E>,
        E: From<StorageError>,
    {
        let _guard = match self.write_gate.try_lock_for(self.lock_timeout) {
            Some(guard) => guard,
            None => {
                tracing::debug!(
                    timeout_ms = self.lock_timeout.as_millis() as u64,
                    "Ledger write lock busy, retrying once"
                );
                self.write_gate
                    .try_lock_for(self.lock_timeout)
                    .ok_or(StorageError::LockTimeout)?
            }
        };

        let txn = self.db.begin_write().map_err(StorageError::from)?;
        match f(&txn) {
            Ok(value) => {
                txn.commit().map_err(StorageError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    tracing::error!(error = %abort_err, "Failed to abort ledger transaction");
                }
                Err(e)
            }
        }
    }

    // ========== Drift Diagnostics ==========

    /// Count a reservation release that had to be clamped
    pub fn record_drift(&self) -> u64 {
        self.drift_events.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn drift_count(&self) -> u64 {
        self.drift_events.load(Ordering::Relaxed)
    }

    // ========== Stock Records ==========

    pub fn get_stock(
        &self,
        txn: &WriteTransaction,
        key: &StockKey,
    ) -> StorageResult<Option<StockRecord>> {
        let table = txn.open_table(STOCK_TABLE)?;
        let result = match table.get((key.product_id, key.variant_id, key.location.as_str()))? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(result)
    }

    pub fn put_stock(&self, txn: &WriteTransaction, record: &StockRecord) -> StorageResult<()> {
        let mut table = txn.open_table(STOCK_TABLE)?;
        let value = encode(record)?;
        table.insert(
            (record.product_id, record.variant_id, record.location.as_str()),
            value.as_slice(),
        )?;
        Ok(())
    }

    /// All locations of one product variant, ordered by location name
    pub fn stock_for_variant(
        &self,
        txn: &WriteTransaction,
        product_id: i64,
        variant_id: i64,
    ) -> StorageResult<Vec<StockRecord>> {
        let table = txn.open_table(STOCK_TABLE)?;
        scan_stock(&table, product_id, Some(variant_id))
    }

    /// All variants and locations of one product
    pub fn stock_for_product(
        &self,
        txn: &WriteTransaction,
        product_id: i64,
    ) -> StorageResult<Vec<StockRecord>> {
        let table = txn.open_table(STOCK_TABLE)?;
        scan_stock(&table, product_id, None)
    }

    /// Snapshot read of one product's records
    pub fn read_stock_for_product(&self, product_id: i64) -> StorageResult<Vec<StockRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_TABLE)?;
        scan_stock(&table, product_id, None)
    }

    /// Snapshot read of one variant's records
    pub fn read_stock_for_variant(
        &self,
        product_id: i64,
        variant_id: i64,
    ) -> StorageResult<Vec<StockRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_TABLE)?;
        scan_stock(&table, product_id, Some(variant_id))
    }

    /// Snapshot read of a single record
    pub fn read_stock(&self, key: &StockKey) -> StorageResult<Option<StockRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_TABLE)?;
        let result = match table.get((key.product_id, key.variant_id, key.location.as_str()))? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(result)
    }

    /// Every record in the ledger (invariant checks, reporting)
    pub fn read_all_stock(&self) -> StorageResult<Vec<StockRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_TABLE)?;
        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }

    // ========== Movements ==========

    /// Append a movement, assigning the next global sequence as its id
    pub fn append_movement(
        &self,
        txn: &WriteTransaction,
        movement: &mut StockMovement,
    ) -> StorageResult<()> {
        let sequence = {
            let mut seq_table = txn.open_table(SEQUENCE_TABLE)?;
            let current = seq_table
                .get(MOVEMENT_SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            let next = current + 1;
            seq_table.insert(MOVEMENT_SEQUENCE_KEY, next)?;
            next
        };
        movement.id = sequence as i64;

        let mut table = txn.open_table(MOVEMENTS_TABLE)?;
        let value = encode(movement)?;
        table.insert((movement.product_id, sequence), value.as_slice())?;
        Ok(())
    }

    /// Movement log of one product, oldest first
    pub fn read_movements(&self, product_id: i64) -> StorageResult<Vec<StockMovement>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MOVEMENTS_TABLE)?;
        let mut movements = Vec::new();
        for result in table.range((product_id, 0u64)..=(product_id, u64::MAX))? {
            let (_, value) = result?;
            movements.push(decode(value.value())?);
        }
        Ok(movements)
    }

    // ========== Products ==========

    pub fn get_product(
        &self,
        txn: &WriteTransaction,
        product_id: i64,
    ) -> StorageResult<Option<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        let result = match table.get(product_id)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(result)
    }

    pub fn put_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = encode(product)?;
        table.insert(product.id, value.as_slice())?;
        Ok(())
    }

    pub fn read_product(&self, product_id: i64) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        let result = match table.get(product_id)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(result)
    }

    // ========== Carts ==========

    pub fn get_cart(&self, txn: &WriteTransaction, cart_id: i64) -> StorageResult<Option<Cart>> {
        let table = txn.open_table(CARTS_TABLE)?;
        let result = match table.get(cart_id)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(result)
    }

    /// Persist a cart and keep the active-cart, line and payment-window
    /// indexes in step with its state
    pub fn put_cart(&self, txn: &WriteTransaction, cart: &Cart) -> StorageResult<()> {
        let previous = self.get_cart(txn, cart.id)?;

        {
            let mut table = txn.open_table(CARTS_TABLE)?;
            let value = encode(cart)?;
            table.insert(cart.id, value.as_slice())?;
        }

        {
            let mut windows = txn.open_table(PAYMENT_WINDOWS_TABLE)?;
            if let Some(expires_at) = previous.as_ref().and_then(|prev| prev.expires_at) {
                windows.remove((expires_at, cart.id))?;
            }
            if cart.state == CartState::ReadyForPayment {
                if let Some(expires_at) = cart.expires_at {
                    windows.insert((expires_at, cart.id), ())?;
                }
            }
        }

        {
            let mut vendors = txn.open_table(VENDOR_CARTS_TABLE)?;
            if let Some(previous_vendor) = previous.as_ref().and_then(|prev| prev.vendor_id) {
                if cart.vendor_id != Some(previous_vendor) {
                    vendors.remove((previous_vendor, cart.id))?;
                }
            }
            if let Some(vendor_id) = cart.vendor_id {
                vendors.insert((vendor_id, cart.id), ())?;
            }
        }

        {
            let mut active = txn.open_table(ACTIVE_CARTS_TABLE)?;
            let current = active.get(cart.user_id)?.map(|guard| guard.value());
            if cart.state.is_terminal() {
                if current == Some(cart.id) {
                    active.remove(cart.user_id)?;
                }
            } else {
                active.insert(cart.user_id, cart.id)?;
            }
        }

        {
            let mut lines = txn.open_table(CART_LINES_TABLE)?;
            if let Some(prev) = &previous {
                for line in &prev.lines {
                    if cart.line(line.id).is_none() {
                        lines.remove(line.id)?;
                    }
                }
            }
            for line in &cart.lines {
                lines.insert(line.id, cart.id)?;
            }
        }

        Ok(())
    }

    pub fn active_cart_id(&self, txn: &WriteTransaction, user_id: i64) -> StorageResult<Option<i64>> {
        let table = txn.open_table(ACTIVE_CARTS_TABLE)?;
        Ok(table.get(user_id)?.map(|guard| guard.value()))
    }

    pub fn cart_id_for_line(&self, txn: &WriteTransaction, line_id: i64) -> StorageResult<Option<i64>> {
        let table = txn.open_table(CART_LINES_TABLE)?;
        Ok(table.get(line_id)?.map(|guard| guard.value()))
    }

    pub fn read_cart(&self, cart_id: i64) -> StorageResult<Option<Cart>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;
        let result = match table.get(cart_id)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(result)
    }

    pub fn read_active_cart(&self, user_id: i64) -> StorageResult<Option<Cart>> {
        let cart_id = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(ACTIVE_CARTS_TABLE)?;
            table.get(user_id)?.map(|guard| guard.value())
        };
        match cart_id {
            Some(id) => self.read_cart(id),
            None => Ok(None),
        }
    }

    /// Replace a cart row with raw bytes, leaving its indexes untouched
    #[cfg(test)]
    pub(crate) fn overwrite_cart_bytes(&self, cart_id: i64, bytes: &[u8]) -> StorageResult<()> {
        self.write(|txn| {
            let mut table = txn.open_table(CARTS_TABLE)?;
            table.insert(cart_id, bytes)?;
            Ok(())
        })
    }

    /// Carts assigned to one seller, in any state
    pub fn read_carts_for_vendor(&self, vendor_id: i64) -> StorageResult<Vec<Cart>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(VENDOR_CARTS_TABLE)?;
        let carts = read_txn.open_table(CARTS_TABLE)?;
        let mut result = Vec::new();
        for entry in index.range((vendor_id, i64::MIN)..=(vendor_id, i64::MAX))? {
            let (key, _) = entry?;
            let (_, cart_id) = key.value();
            if let Some(value) = carts.get(cart_id)? {
                result.push(decode(value.value())?);
            }
        }
        Ok(result)
    }

    /// Ids of `ready_for_payment` carts whose window closed at or before `now`
    pub fn read_due_payment_windows(&self, now: i64) -> StorageResult<Vec<i64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENT_WINDOWS_TABLE)?;
        let mut cart_ids = Vec::new();
        for result in table.range((i64::MIN, i64::MIN)..=(now, i64::MAX))? {
            let (key, _) = result?;
            cart_ids.push(key.value().1);
        }
        Ok(cart_ids)
    }

    // ========== Orders ==========

    pub fn get_order(&self, txn: &WriteTransaction, order_id: i64) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        let result = match table.get(order_id)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(result)
    }

    /// Persist an order; open orders are indexed by cart
    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            let value = encode(order)?;
            table.insert(order.id, value.as_slice())?;
        }

        let mut index = txn.open_table(CART_ORDERS_TABLE)?;
        if order.status.is_open() {
            index.insert(order.cart_id, order.id)?;
        } else {
            let current = index.get(order.cart_id)?.map(|guard| guard.value());
            if current == Some(order.id) {
                index.remove(order.cart_id)?;
            }
        }
        Ok(())
    }

    pub fn open_order_for_cart(
        &self,
        txn: &WriteTransaction,
        cart_id: i64,
    ) -> StorageResult<Option<i64>> {
        let table = txn.open_table(CART_ORDERS_TABLE)?;
        Ok(table.get(cart_id)?.map(|guard| guard.value()))
    }

    pub fn read_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let result = match table.get(order_id)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(result)
    }

    pub fn read_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            orders.push(decode(value.value())?);
        }
        Ok(orders)
    }

    // ========== Staff ==========

    pub fn put_staff(&self, txn: &WriteTransaction, member: &StaffMember) -> StorageResult<()> {
        let mut table = txn.open_table(STAFF_TABLE)?;
        let value = encode(member)?;
        table.insert(member.id, value.as_slice())?;
        Ok(())
    }

    pub fn get_staff(
        &self,
        txn: &WriteTransaction,
        staff_id: i64,
    ) -> StorageResult<Option<StaffMember>> {
        let table = txn.open_table(STAFF_TABLE)?;
        let result = match table.get(staff_id)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(result)
    }

    /// All staff ordered by id
    pub fn list_staff(&self, txn: &WriteTransaction) -> StorageResult<Vec<StaffMember>> {
        let table = txn.open_table(STAFF_TABLE)?;
        let mut members = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            members.push(decode(value.value())?);
        }
        Ok(members)
    }

    pub fn read_staff(&self) -> StorageResult<Vec<StaffMember>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STAFF_TABLE)?;
        let mut members = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            members.push(decode(value.value())?);
        }
        Ok(members)
    }

    // ========== Assignment Cursor ==========

    pub fn get_cursor(&self, txn: &WriteTransaction, key: &str) -> StorageResult<Option<i64>> {
        let table = txn.open_table(CURSOR_TABLE)?;
        Ok(table.get(key)?.map(|guard| guard.value()))
    }

    pub fn set_cursor(&self, txn: &WriteTransaction, key: &str, value: i64) -> StorageResult<()> {
        let mut table = txn.open_table(CURSOR_TABLE)?;
        table.insert(key, value)?;
        Ok(())
    }

    pub fn read_cursor(&self, key: &str) -> StorageResult<Option<i64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CURSOR_TABLE)?;
        Ok(table.get(key)?.map(|guard| guard.value()))
    }

    // ========== Settings ==========

    pub fn get_price_tiers(&self, txn: &WriteTransaction) -> StorageResult<Vec<PriceTier>> {
        let table = txn.open_table(SETTINGS_TABLE)?;
        let result = match table.get(PRICE_TIERS_KEY)? {
            Some(value) => decode(value.value())?,
            None => Vec::new(),
        };
        Ok(result)
    }

    pub fn put_price_tiers(&self, txn: &WriteTransaction, tiers: &[PriceTier]) -> StorageResult<()> {
        let mut table = txn.open_table(SETTINGS_TABLE)?;
        let value = encode(&tiers)?;
        table.insert(PRICE_TIERS_KEY, value.as_slice())?;
        Ok(())
    }

    pub fn read_price_tiers(&self) -> StorageResult<Vec<PriceTier>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;
        let result = match table.get(PRICE_TIERS_KEY)? {
            Some(value) => decode(value.value())?,
            None => Vec::new(),
        };
        Ok(result)
    }

    // ========== Statistics ==========

    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let stock_table = read_txn.open_table(STOCK_TABLE)?;
        let carts_table = read_txn.open_table(CARTS_TABLE)?;
        let active_table = read_txn.open_table(ACTIVE_CARTS_TABLE)?;
        let windows_table = read_txn.open_table(PAYMENT_WINDOWS_TABLE)?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;

        Ok(StorageStats {
            stock_record_count: stock_table.len()?,
            cart_count: carts_table.len()?,
            active_cart_count: active_table.len()?,
            open_payment_windows: windows_table.len()?,
            order_count: orders_table.len()?,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    pub stock_record_count: u64,
    pub cart_count: u64,
    pub active_cart_count: u64,
    pub open_payment_windows: u64,
    pub order_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{CartLine, MovementType, OrderStatus};

    fn record(location: &str, stock: i64, reserved: i64) -> StockRecord {
        StockRecord {
            product_id: 1,
            variant_id: 10,
            location: location.to_string(),
            stock,
            reserved,
            deleted_at: None,
            updated_at: 0,
        }
    }

    fn line(id: i64) -> CartLine {
        CartLine {
            id,
            product_id: 1,
            variant_id: 10,
            quantity: 1,
            reserved_quantity: 0,
            location: String::new(),
            requires_stock_check: false,
            stock_confirmed: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_stock_round_trip_and_variant_range() {
        let store = InventoryStore::open_in_memory().unwrap();
        store
            .write(|txn| -> StorageResult<()> {
                store.put_stock(txn, &record("deposito", 10, 2))?;
                store.put_stock(txn, &record("almacen", 4, 0))?;
                let mut other_variant = record("deposito", 99, 0);
                other_variant.variant_id = 11;
                store.put_stock(txn, &other_variant)?;
                Ok(())
            })
            .unwrap();

        let key = StockKey::new(1, 10, "deposito");
        let read = store.read_stock(&key).unwrap().unwrap();
        assert_eq!(read.stock, 10);
        assert_eq!(read.reserved, 2);

        let variant = store.read_stock_for_variant(1, 10).unwrap();
        let locations: Vec<_> = variant.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(locations, vec!["almacen", "deposito"]);

        assert_eq!(store.read_stock_for_product(1).unwrap().len(), 3);
        assert!(store.read_stock_for_product(2).unwrap().is_empty());
    }

    #[test]
    fn test_failed_closure_rolls_back() {
        let store = InventoryStore::open_in_memory().unwrap();
        let result: StorageResult<()> = store.write(|txn| {
            store.put_stock(txn, &record("deposito", 10, 0))?;
            Err(StorageError::LockTimeout)
        });
        assert!(result.is_err());
        assert!(store
            .read_stock(&StockKey::new(1, 10, "deposito"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_movements_get_increasing_ids() {
        let store = InventoryStore::open_in_memory().unwrap();
        store
            .write(|txn| -> StorageResult<()> {
                for delta in [5, -2] {
                    let mut movement = StockMovement {
                        id: 0,
                        product_id: 1,
                        variant_id: 10,
                        location: "deposito".to_string(),
                        movement_type: MovementType::Adjustment,
                        delta,
                        previous: 0,
                        new: delta,
                        reason: None,
                        reference: None,
                        actor_id: None,
                        created_at: 0,
                    };
                    store.append_movement(txn, &mut movement)?;
                }
                Ok(())
            })
            .unwrap();

        let movements = store.read_movements(1).unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].id, 1);
        assert_eq!(movements[1].id, 2);
        assert_eq!(movements[1].delta, -2);
    }

    #[test]
    fn test_cart_indexes_follow_state() {
        let store = InventoryStore::open_in_memory().unwrap();
        let mut cart = Cart::new(100, 7, 0);
        cart.lines.push(line(1));
        cart.lines.push(line(2));

        store.write(|txn| store.put_cart(txn, &cart)).unwrap();
        assert_eq!(store.read_active_cart(7).unwrap().unwrap().id, 100);

        cart.lines.retain(|l| l.id != 2);
        cart.state = CartState::ReadyForPayment;
        cart.expires_at = Some(5_000);
        store.write(|txn| store.put_cart(txn, &cart)).unwrap();

        store
            .write(|txn| -> StorageResult<()> {
                assert_eq!(store.cart_id_for_line(txn, 1)?, Some(100));
                assert_eq!(store.cart_id_for_line(txn, 2)?, None);
                Ok(())
            })
            .unwrap();
        assert!(store.read_due_payment_windows(4_999).unwrap().is_empty());
        assert_eq!(store.read_due_payment_windows(5_000).unwrap(), vec![100]);

        cart.state = CartState::Expired;
        store.write(|txn| store.put_cart(txn, &cart)).unwrap();
        assert!(store.read_due_payment_windows(i64::MAX).unwrap().is_empty());
        assert!(store.read_active_cart(7).unwrap().is_none());
    }

    #[test]
    fn test_open_order_index() {
        let store = InventoryStore::open_in_memory().unwrap();
        let mut order = Order {
            id: 9,
            user_id: 7,
            cart_id: 100,
            assigned_to: None,
            status: OrderStatus::PendingAssignment,
            items: vec![],
            total: rust_decimal::Decimal::ZERO,
            created_at: 0,
            updated_at: 0,
        };
        store.write(|txn| store.put_order(txn, &order)).unwrap();
        store
            .write(|txn| -> StorageResult<()> {
                assert_eq!(store.open_order_for_cart(txn, 100)?, Some(9));
                Ok(())
            })
            .unwrap();

        order.status = OrderStatus::Cancelled;
        store.write(|txn| store.put_order(txn, &order)).unwrap();
        store
            .write(|txn| -> StorageResult<()> {
                assert_eq!(store.open_order_for_cart(txn, 100)?, None);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.redb");
        {
            let store = InventoryStore::open(&path).unwrap();
            store
                .write(|txn| store.set_cursor(txn, SELLER_CURSOR_KEY, 5))
                .unwrap();
        }
        let reopened = InventoryStore::open(&path).unwrap();
        assert_eq!(reopened.read_cursor(SELLER_CURSOR_KEY).unwrap(), Some(5));
    }

    #[test]
    fn test_lock_timeout_when_writer_is_held() {
        use std::sync::mpsc;

        let store = InventoryStore::open_in_memory()
            .unwrap()
            .with_lock_timeout(Duration::from_millis(20));
        let holder = store.clone();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let handle = std::thread::spawn(move || {
            holder
                .write(|_txn| -> StorageResult<()> {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(())
                })
                .unwrap();
        });

        entered_rx.recv().unwrap();
        let result: StorageResult<()> = store.write(|_txn| Ok(()));
        assert!(matches!(result, Err(StorageError::LockTimeout)));

        release_tx.send(()).unwrap();
        handle.join().unwrap();
        let result: StorageResult<()> = store.write(|_txn| Ok(()));
        assert!(result.is_ok());
    }

    #[test]
    fn test_scans_at_the_top_of_the_id_range() {
        let store = InventoryStore::open_in_memory().unwrap();
        let mut edge = record("deposito", 4, 0);
        edge.product_id = i64::MAX;
        edge.variant_id = i64::MAX;
        let mut neighbour = record("deposito", 6, 0);
        neighbour.product_id = i64::MAX;
        neighbour.variant_id = i64::MAX - 1;
        store
            .write(|txn| -> StorageResult<()> {
                store.put_stock(txn, &edge)?;
                store.put_stock(txn, &neighbour)?;
                assert_eq!(store.stock_for_variant(txn, i64::MAX, i64::MAX)?.len(), 1);
                assert_eq!(store.stock_for_product(txn, i64::MAX)?.len(), 2);
                Ok(())
            })
            .unwrap();

        let variant = store.read_stock_for_variant(i64::MAX, i64::MAX).unwrap();
        assert_eq!(variant.len(), 1);
        assert_eq!(variant[0].stock, 4);
        assert_eq!(store.read_stock_for_product(i64::MAX).unwrap().len(), 2);
        assert!(store.read_stock_for_variant(i64::MAX - 1, i64::MAX).unwrap().is_empty());
    }

    #[test]
    fn test_vendor_index_follows_reassignment() {
        let store = InventoryStore::open_in_memory().unwrap();
        let mut first = Cart::new(100, 7, 0);
        first.vendor_id = Some(2);
        let mut second = Cart::new(200, 8, 0);
        second.vendor_id = Some(2);
        store
            .write(|txn| -> StorageResult<()> {
                store.put_cart(txn, &first)?;
                store.put_cart(txn, &second)?;
                Ok(())
            })
            .unwrap();
        let ids: Vec<i64> = store
            .read_carts_for_vendor(2)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![100, 200]);

        second.vendor_id = Some(5);
        store.write(|txn| store.put_cart(txn, &second)).unwrap();
        assert_eq!(store.read_carts_for_vendor(2).unwrap().len(), 1);
        assert_eq!(store.read_carts_for_vendor(5).unwrap()[0].id, 200);
    }
}
