//! Product Model
//!
//! Only the attributes the ledger and pricing need; catalog CRUD lives elsewhere.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Purchase cost, input of the pricing tiers
    pub cost_price: Decimal,
    /// Upper bound for the cross-location stock total
    pub total_stock_cap: Option<i64>,
    pub updated_at: i64,
}

/// Create / update product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpsert {
    pub name: String,
    pub cost_price: Decimal,
    pub total_stock_cap: Option<i64>,
}
