//! Stock Ledger Models

use serde::{Deserialize, Serialize};

/// Identity of a stock record: one per product + variant + location
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: i64,
    pub variant_id: i64,
    pub location: String,
}

impl StockKey {
    pub fn new(product_id: i64, variant_id: i64, location: impl Into<String>) -> Self {
        Self {
            product_id,
            variant_id,
            location: location.into(),
        }
    }
}

impl std::fmt::Display for StockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "product {} variant {} @ {}",
            self.product_id, self.variant_id, self.location
        )
    }
}

/// Physical stock and reservations held at one location
///
/// `0 <= reserved <= stock` holds after every committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: i64,
    pub variant_id: i64,
    pub location: String,
    /// Units physically present
    pub stock: i64,
    /// Units held by in-flight carts
    pub reserved: i64,
    /// Soft-delete marker (Unix millis); deleted records sell nothing
    #[serde(default)]
    pub deleted_at: Option<i64>,
    pub updated_at: i64,
}

impl StockRecord {
    pub fn new(key: &StockKey, now: i64) -> Self {
        Self {
            product_id: key.product_id,
            variant_id: key.variant_id,
            location: key.location.clone(),
            stock: 0,
            reserved: 0,
            deleted_at: None,
            updated_at: now,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.product_id, self.variant_id, self.location.clone())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Sellable units (`stock - reserved`), zero once soft-deleted
    pub fn available(&self) -> i64 {
        if self.is_deleted() {
            0
        } else {
            (self.stock - self.reserved).max(0)
        }
    }
}

/// Kind of change recorded in the movement log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// First stock assignment for a location
    Initial,
    /// Manual correction by an administrator
    Adjustment,
    /// Transfer between two locations (one movement per side)
    Transfer,
    /// Permanent decrement at cart commit
    Commit,
}

/// Append-only audit record of a change to `stock`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub variant_id: i64,
    pub location: String,
    pub movement_type: MovementType,
    pub delta: i64,
    pub previous: i64,
    pub new: i64,
    pub reason: Option<String>,
    /// Cart / order / transfer reference
    pub reference: Option<String>,
    pub actor_id: Option<i64>,
    pub created_at: i64,
}

/// Set absolute stock payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSet {
    pub stock: i64,
    pub reason: Option<String>,
}

/// Transfer stock between locations payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransfer {
    pub product_id: i64,
    pub variant_id: i64,
    pub from: String,
    pub to: String,
    pub quantity: i64,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_is_stock_minus_reserved() {
        let key = StockKey::new(1, 1, "deposito");
        let mut record = StockRecord::new(&key, 0);
        record.stock = 10;
        record.reserved = 2;
        assert_eq!(record.available(), 8);

        record.deleted_at = Some(1);
        assert_eq!(record.available(), 0);
    }
}
