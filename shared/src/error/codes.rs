//! Unified error codes for the stock server
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Cart errors
//! - 4xxx: Order / assignment errors
//! - 5xxx: Pricing errors
//! - 6xxx: Stock errors
//! - 7xxx: Staff errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so clients can switch on
/// them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,
    /// Admin role required
    AdminRequired = 2003,

    // ==================== 3xxx: Cart ====================
    /// Cart not found
    CartNotFound = 3001,
    /// Cart line not found
    CartLineNotFound = 3002,
    /// Cart is not editable in its current state
    CartNotEditable = 3003,
    /// State machine guard rejected the transition
    InvalidTransition = 3004,
    /// Cart has no lines
    CartEmpty = 3005,
    /// Every line is still waiting for stock confirmation
    StockConfirmationPending = 3006,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Cart already has an open order
    OrderAlreadyExists = 4002,
    /// No eligible seller, or the order was taken by someone else
    AssignmentUnavailable = 4003,

    // ==================== 5xxx: Pricing ====================
    /// Price tier definition is invalid
    InvalidPriceTier = 5001,

    // ==================== 6xxx: Stock ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Requested quantity exceeds available units
    InsufficientStock = 6002,
    /// No location can cover the line at commit time
    OutOfStock = 6003,
    /// Product-level stock cap would be exceeded
    CapExceeded = 6004,
    /// Ledger no longer backs a recorded reservation
    ReservationMismatch = 6005,
    /// Stock record not found
    StockRecordNotFound = 6006,
    /// Stock would drop below the reserved quantity
    StockBelowReserved = 6007,

    // ==================== 7xxx: Staff ====================
    /// Seller not found
    SellerNotFound = 7001,
    /// Seller is not active
    SellerInactive = 7002,
    /// Working-hours window is malformed
    InvalidWorkingHours = 7003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Could not acquire the ledger write lock in time
    LockTimeout = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether the client may retry the same request unchanged
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::LockTimeout | ErrorCode::TimeoutError)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Success",
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::ValueOutOfRange => "Value out of range",

            // Auth
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Invalid token",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "Role required",
            ErrorCode::AdminRequired => "Admin role required",

            // Cart
            ErrorCode::CartNotFound => "Cart not found",
            ErrorCode::CartLineNotFound => "Cart line not found",
            ErrorCode::CartNotEditable => "Cart cannot be edited in its current state",
            ErrorCode::InvalidTransition => "Invalid cart state transition",
            ErrorCode::CartEmpty => "Cart is empty",
            ErrorCode::StockConfirmationPending => "All lines are pending stock confirmation",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyExists => "Cart already has an open order",
            ErrorCode::AssignmentUnavailable => "Order cannot be assigned",

            // Pricing
            ErrorCode::InvalidPriceTier => "Invalid price tier",

            // Stock
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::OutOfStock => "Item became unavailable, please remove it",
            ErrorCode::CapExceeded => "Product stock cap exceeded",
            ErrorCode::ReservationMismatch => "Reservation no longer backed by stock",
            ErrorCode::StockRecordNotFound => "Stock record not found",
            ErrorCode::StockBelowReserved => "Stock cannot be lower than reserved",

            // Staff
            ErrorCode::SellerNotFound => "Seller not found",
            ErrorCode::SellerInactive => "Seller is not active",
            ErrorCode::InvalidWorkingHours => "Invalid working hours",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::LockTimeout => "System busy, please try again",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2003 => Ok(ErrorCode::AdminRequired),

            // Cart
            3001 => Ok(ErrorCode::CartNotFound),
            3002 => Ok(ErrorCode::CartLineNotFound),
            3003 => Ok(ErrorCode::CartNotEditable),
            3004 => Ok(ErrorCode::InvalidTransition),
            3005 => Ok(ErrorCode::CartEmpty),
            3006 => Ok(ErrorCode::StockConfirmationPending),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyExists),
            4003 => Ok(ErrorCode::AssignmentUnavailable),

            // Pricing
            5001 => Ok(ErrorCode::InvalidPriceTier),

            // Stock
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::InsufficientStock),
            6003 => Ok(ErrorCode::OutOfStock),
            6004 => Ok(ErrorCode::CapExceeded),
            6005 => Ok(ErrorCode::ReservationMismatch),
            6006 => Ok(ErrorCode::StockRecordNotFound),
            6007 => Ok(ErrorCode::StockBelowReserved),

            // Staff
            7001 => Ok(ErrorCode::SellerNotFound),
            7002 => Ok(ErrorCode::SellerInactive),
            7003 => Ok(ErrorCode::InvalidWorkingHours),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9404 => Ok(ErrorCode::LockTimeout),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
