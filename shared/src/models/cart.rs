//! Cart Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::pricing::PriceTier;

/// Cart lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartState {
    /// Initial, editable by the customer
    Draft,
    /// Transferred to a seller, editable by both
    AssignedReview,
    /// No seller was available at assignment time
    AwaitingSeller,
    /// Quantities locked in, stock committed, payment window open
    ReadyForPayment,
    /// Payment confirmed
    Committed,
    /// Payment window elapsed
    Expired,
    /// Explicitly cancelled
    Cancelled,
}

impl CartState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Expired | Self::Cancelled)
    }

    /// Lines may be added, removed or re-quantified
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            Self::Draft | Self::AssignedReview | Self::AwaitingSeller
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::AssignedReview => "assigned_review",
            Self::AwaitingSeller => "awaiting_seller",
            Self::ReadyForPayment => "ready_for_payment",
            Self::Committed => "committed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for CartState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product + variant in a cart
///
/// `reserved_quantity <= quantity`; when `reserved_quantity > 0` the
/// `location` names the stock record holding the reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub product_id: i64,
    pub variant_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub reserved_quantity: i64,
    /// Empty when no reservation is held
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub requires_stock_check: bool,
    #[serde(default)]
    pub stock_confirmed: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CartLine {
    pub fn has_reservation(&self) -> bool {
        self.reserved_quantity > 0 && !self.location.is_empty()
    }

    /// Waiting for the seller to confirm physical stock
    pub fn is_pending_confirmation(&self) -> bool {
        self.requires_stock_check && !self.stock_confirmed
    }
}

/// Shopping cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    /// Owning customer
    pub user_id: i64,
    /// Seller with operating rights
    pub vendor_id: Option<i64>,
    pub state: CartState,
    pub lines: Vec<CartLine>,
    /// Order created from this cart
    pub order_id: Option<i64>,
    /// Set while in `ready_for_payment`
    pub reserved_at: Option<i64>,
    pub expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Cart {
    pub fn new(id: i64, user_id: i64, now: i64) -> Self {
        Self {
            id,
            user_id,
            vendor_id: None,
            state: CartState::Draft,
            lines: Vec::new(),
            order_id: None,
            reserved_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn line(&self, line_id: i64) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    pub fn line_mut(&mut self, line_id: i64) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.id == line_id)
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// ── Payloads ────────────────────────────────────────────────────────

/// POST /api/cart/add
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartAddRequest {
    /// Target cart; defaults to the caller's active cart
    #[serde(default)]
    pub cart_id: Option<i64>,
    pub product_id: i64,
    pub variant_id: i64,
    pub quantity: i64,
    /// Reserve at this location immediately
    pub location: Option<String>,
    #[serde(default)]
    pub requires_stock_check: bool,
}

/// PUT /api/cart/update/{line_id}
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartLineUpdate {
    pub quantity: Option<i64>,
    /// Reserve at (or move the reservation to) this location
    pub location: Option<String>,
    pub stock_confirmed: Option<bool>,
}

/// PUT /api/cart/{id}/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartStatusUpdate {
    #[serde(alias = "estado")]
    pub state: CartState,
}

/// POST /api/cart/{id}/transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartTransfer {
    pub vendor_id: i64,
}

/// Stock problem detected for a cart line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockIssueKind {
    OutOfStock,
    InsufficientStock,
    LimitedStock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockIssue {
    pub line_id: i64,
    pub product_id: i64,
    pub variant_id: i64,
    pub requested: i64,
    /// Total available across all locations
    pub available: i64,
    pub kind: StockIssueKind,
}

/// GET /api/cart/check-stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCheck {
    pub cart_id: i64,
    pub ok: bool,
    pub issues: Vec<StockIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSummaryLine {
    pub line_id: i64,
    pub product_id: i64,
    pub variant_id: i64,
    pub quantity: i64,
    pub cost_price: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// GET /api/cart/summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSummary {
    pub cart_id: Option<i64>,
    pub total_quantity: i64,
    pub subtotal: Decimal,
    pub tier: Option<PriceTier>,
    pub lines: Vec<CartSummaryLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editable_and_terminal_states_are_disjoint() {
        let all = [
            CartState::Draft,
            CartState::AssignedReview,
            CartState::AwaitingSeller,
            CartState::ReadyForPayment,
            CartState::Committed,
            CartState::Expired,
            CartState::Cancelled,
        ];
        for state in all {
            assert!(!(state.is_editable() && state.is_terminal()), "{state}");
        }
        assert!(!CartState::ReadyForPayment.is_editable());
        assert!(!CartState::ReadyForPayment.is_terminal());
    }

    #[test]
    fn status_update_accepts_estado_alias() {
        let update: CartStatusUpdate =
            serde_json::from_str(r#"{"estado":"ready_for_payment"}"#).unwrap();
        assert_eq!(update.state, CartState::ReadyForPayment);
    }

    #[test]
    fn pending_confirmation_needs_both_flags() {
        let mut line = CartLine {
            id: 1,
            product_id: 1,
            variant_id: 1,
            quantity: 2,
            reserved_quantity: 0,
            location: String::new(),
            requires_stock_check: true,
            stock_confirmed: false,
            created_at: 0,
            updated_at: 0,
        };
        assert!(line.is_pending_confirmation());
        line.stock_confirmed = true;
        assert!(!line.is_pending_confirmation());
    }
}
