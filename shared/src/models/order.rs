//! Order Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Waiting for a seller
    PendingAssignment,
    Assigned,
    /// Cart payment confirmed
    Completed,
    /// Cart cancelled or expired
    Cancelled,
}

impl OrderStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::PendingAssignment | Self::Assigned)
    }
}

/// Priced order line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: i64,
    pub variant_id: i64,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub base_cost: Decimal,
}

/// Order derived from a cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub cart_id: i64,
    /// Seller id, absent until assigned
    pub assigned_to: Option<i64>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub created_at: i64,
    pub updated_at: i64,
}

/// PUT /api/orders/{id}/assign
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAssign {
    pub seller_id: i64,
}

/// Result of a request-assignment call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentResponse {
    pub order: Order,
    /// Chosen seller, `None` when no seller was active
    pub seller_id: Option<i64>,
    pub pending: bool,
    pub message: String,
}
