//! Inventory error taxonomy

use shared::error::{AppError, ErrorCode};
use shared::models::{CartState, StockKey};
use thiserror::Error;

use super::storage::StorageError;

/// Failures raised by the ledger, cart and assignment flows
///
/// Raising any of these inside [`InventoryStore::write`] aborts the whole
/// transaction.
///
/// [`InventoryStore::write`]: super::storage::InventoryStore::write
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Insufficient stock at {key}: requested {requested}, available {available}")]
    InsufficientStock {
        key: StockKey,
        requested: i64,
        available: i64,
    },

    #[error("Stock cap exceeded for product {product_id}: cap {cap}, proposed {proposed}")]
    CapExceeded {
        product_id: i64,
        cap: i64,
        proposed: i64,
    },

    #[error("Invalid cart transition: {from} -> {to}")]
    InvalidTransition { from: CartState, to: CartState },

    #[error("Cart {cart_id} is not editable in state {state}")]
    CartNotEditable { cart_id: i64, state: CartState },

    #[error("Product {product_id} variant {variant_id} became unavailable (needed {quantity})")]
    OutOfStock {
        product_id: i64,
        variant_id: i64,
        quantity: i64,
    },

    #[error(
        "Reservation at {key} no longer matches the ledger: expected {expected}, stock {stock}, reserved {reserved}"
    )]
    ReservationMismatch {
        key: StockKey,
        expected: i64,
        stock: i64,
        reserved: i64,
    },

    #[error("Order {0} is already assigned")]
    AssignmentUnavailable(i64),

    #[error("Stock at {key} cannot go below reserved: stock {stock}, reserved {reserved}")]
    StockBelowReserved {
        key: StockKey,
        stock: i64,
        reserved: i64,
    },

    #[error("Cart {0} not found")]
    CartNotFound(i64),

    #[error("Cart line {0} not found")]
    LineNotFound(i64),

    #[error("Order {0} not found")]
    OrderNotFound(i64),

    #[error("Product {0} not found")]
    ProductNotFound(i64),

    #[error("No stock record at {0}")]
    StockRecordNotFound(StockKey),

    #[error("Seller {0} not found")]
    SellerNotFound(i64),

    #[error("Seller {0} is inactive")]
    SellerInactive(i64),

    #[error("Cart {0} has no lines")]
    CartEmpty(i64),

    #[error("Every line of cart {0} is waiting for stock confirmation")]
    StockConfirmationPending(i64),

    #[error("Cart {cart_id} already has open order {order_id}")]
    OrderAlreadyExists { cart_id: i64, order_id: i64 },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),
}

pub type InventoryResult<T> = Result<T, InventoryError>;

impl InventoryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Storage(StorageError::LockTimeout) => ErrorCode::LockTimeout,
            Self::Storage(_) => ErrorCode::DatabaseError,
            Self::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            Self::CapExceeded { .. } => ErrorCode::CapExceeded,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::CartNotEditable { .. } => ErrorCode::CartNotEditable,
            Self::OutOfStock { .. } => ErrorCode::OutOfStock,
            Self::ReservationMismatch { .. } => ErrorCode::ReservationMismatch,
            Self::AssignmentUnavailable(_) => ErrorCode::AssignmentUnavailable,
            Self::StockBelowReserved { .. } => ErrorCode::StockBelowReserved,
            Self::CartNotFound(_) => ErrorCode::CartNotFound,
            Self::LineNotFound(_) => ErrorCode::CartLineNotFound,
            Self::OrderNotFound(_) => ErrorCode::OrderNotFound,
            Self::ProductNotFound(_) => ErrorCode::ProductNotFound,
            Self::StockRecordNotFound(_) => ErrorCode::StockRecordNotFound,
            Self::SellerNotFound(_) => ErrorCode::SellerNotFound,
            Self::SellerInactive(_) => ErrorCode::SellerInactive,
            Self::CartEmpty(_) => ErrorCode::CartEmpty,
            Self::StockConfirmationPending(_) => ErrorCode::StockConfirmationPending,
            Self::OrderAlreadyExists { .. } => ErrorCode::OrderAlreadyExists,
            Self::Forbidden(_) => ErrorCode::PermissionDenied,
            Self::Validation(_) => ErrorCode::ValidationFailed,
        }
    }
}

fn with_key(err: AppError, key: &StockKey) -> AppError {
    err.with_detail("product_id", key.product_id)
        .with_detail("variant_id", key.variant_id)
        .with_detail("location", key.location.clone())
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        let code = err.code();
        let message = match &err {
            // Don't leak storage internals to clients
            InventoryError::Storage(StorageError::LockTimeout) => code.message().to_string(),
            InventoryError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                code.message().to_string()
            }
            other => other.to_string(),
        };
        let app = AppError::with_message(code, message);

        match err {
            InventoryError::InsufficientStock {
                key,
                requested,
                available,
            } => with_key(app, &key)
                .with_detail("requested", requested)
                .with_detail("available", available),
            InventoryError::CapExceeded {
                product_id,
                cap,
                proposed,
            } => app
                .with_detail("product_id", product_id)
                .with_detail("cap", cap)
                .with_detail("proposed", proposed),
            InventoryError::InvalidTransition { from, to } => app
                .with_detail("from", from.as_str())
                .with_detail("to", to.as_str()),
            InventoryError::CartNotEditable { cart_id, state } => app
                .with_detail("cart_id", cart_id)
                .with_detail("state", state.as_str()),
            InventoryError::OutOfStock {
                product_id,
                variant_id,
                quantity,
            } => app
                .with_detail("product_id", product_id)
                .with_detail("variant_id", variant_id)
                .with_detail("requested", quantity)
                .with_detail("hint", "item became unavailable, please remove it"),
            InventoryError::ReservationMismatch {
                key,
                expected,
                stock,
                reserved,
            } => with_key(app, &key)
                .with_detail("expected", expected)
                .with_detail("stock", stock)
                .with_detail("reserved", reserved),
            InventoryError::StockBelowReserved {
                key,
                stock,
                reserved,
            } => with_key(app, &key)
                .with_detail("stock", stock)
                .with_detail("reserved", reserved),
            InventoryError::StockRecordNotFound(key) => with_key(app, &key),
            InventoryError::AssignmentUnavailable(order_id) => {
                app.with_detail("order_id", order_id)
            }
            InventoryError::OrderAlreadyExists { cart_id, order_id } => app
                .with_detail("cart_id", cart_id)
                .with_detail("order_id", order_id),
            _ => app,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn insufficient_stock_carries_actionable_details() {
        let err = InventoryError::InsufficientStock {
            key: StockKey::new(1, 2, "deposito"),
            requested: 5,
            available: 3,
        };
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::InsufficientStock);
        assert_eq!(app.http_status(), StatusCode::BAD_REQUEST);
        let details = app.details.unwrap();
        assert_eq!(details["location"], "deposito");
        assert_eq!(details["requested"], 5);
        assert_eq!(details["available"], 3);
    }

    #[test]
    fn lock_timeout_is_retryable_service_unavailable() {
        let app: AppError = InventoryError::Storage(StorageError::LockTimeout).into();
        assert_eq!(app.code, ErrorCode::LockTimeout);
        assert_eq!(app.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(app.code.is_retryable());
    }

    #[test]
    fn transition_errors_are_conflicts() {
        let app: AppError = InventoryError::InvalidTransition {
            from: CartState::Expired,
            to: CartState::Draft,
        }
        .into();
        assert_eq!(app.http_status(), StatusCode::CONFLICT);
        assert_eq!(app.details.unwrap()["from"], "expired");
    }
}
