//! Cart state machine
//!
//! ```text
//! draft ──▶ assigned_review ──▶ ready_for_payment ──▶ committed
//!   │  ▲        │  ▲                   │
//!   │  └────────┘  │                   ├──▶ expired   (sweeper only)
//!   ▼              │                   │
//! awaiting_seller ─┘                   └──▶ cancelled
//! ```
//!
//! Any non-terminal state may be cancelled. Terminal states accept nothing.

use shared::models::{Cart, CartState};

use crate::auth::CurrentUser;
use crate::inventory::{InventoryError, InventoryResult};

/// Whether `from -> to` is an edge of the machine
pub fn can_transition(from: CartState, to: CartState) -> bool {
    use CartState::*;
    match from {
        Draft => matches!(to, AssignedReview | AwaitingSeller | ReadyForPayment | Cancelled),
        AssignedReview => matches!(to, Draft | AwaitingSeller | ReadyForPayment | Cancelled),
        AwaitingSeller => matches!(to, AssignedReview | ReadyForPayment | Cancelled),
        ReadyForPayment => matches!(to, Committed | Expired | Cancelled),
        Committed | Expired | Cancelled => false,
    }
}

pub fn check_transition(from: CartState, to: CartState) -> InventoryResult<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(InventoryError::InvalidTransition { from, to })
    }
}

/// Lines may only change while the cart is editable
pub fn ensure_editable(cart: &Cart) -> InventoryResult<()> {
    if cart.state.is_editable() {
        Ok(())
    } else {
        Err(InventoryError::CartNotEditable {
            cart_id: cart.id,
            state: cart.state,
        })
    }
}

/// Owner, assigned vendor or an administrator
pub fn can_operate(cart: &Cart, user: &CurrentUser) -> bool {
    user.is_admin() || cart.user_id == user.id || cart.vendor_id == Some(user.id)
}

pub fn ensure_operator(cart: &Cart, user: &CurrentUser) -> InventoryResult<()> {
    if can_operate(cart, user) {
        Ok(())
    } else {
        Err(InventoryError::Forbidden(format!(
            "user {} may not operate cart {}",
            user.id, cart.id
        )))
    }
}

/// Assigned vendor or an administrator (stock confirmation, payment)
pub fn ensure_vendor_or_admin(cart: &Cart, user: &CurrentUser) -> InventoryResult<()> {
    if user.is_admin() || cart.vendor_id == Some(user.id) {
        Ok(())
    } else {
        Err(InventoryError::Forbidden(format!(
            "only the assigned seller or an administrator may do this on cart {}",
            cart.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Role;

    const ALL: [CartState; 7] = [
        CartState::Draft,
        CartState::AssignedReview,
        CartState::AwaitingSeller,
        CartState::ReadyForPayment,
        CartState::Committed,
        CartState::Expired,
        CartState::Cancelled,
    ];

    fn user(id: i64, role: Role) -> CurrentUser {
        CurrentUser {
            id,
            username: format!("u{id}"),
            role,
        }
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(check_transition(*from, to).is_err(), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn ready_for_payment_only_moves_forward() {
        for to in ALL {
            let allowed = matches!(
                to,
                CartState::Committed | CartState::Expired | CartState::Cancelled
            );
            assert_eq!(can_transition(CartState::ReadyForPayment, to), allowed, "{to}");
        }
    }

    #[test]
    fn every_live_state_can_cancel_and_commit() {
        for from in [
            CartState::Draft,
            CartState::AssignedReview,
            CartState::AwaitingSeller,
        ] {
            assert!(can_transition(from, CartState::Cancelled));
            assert!(can_transition(from, CartState::ReadyForPayment));
            assert!(!can_transition(from, CartState::Expired));
            assert!(!can_transition(from, CartState::Committed));
        }
    }

    #[test]
    fn access_rules() {
        let mut cart = Cart::new(1, 10, 0);
        cart.vendor_id = Some(20);

        assert!(ensure_operator(&cart, &user(10, Role::Customer)).is_ok());
        assert!(ensure_operator(&cart, &user(20, Role::Seller)).is_ok());
        assert!(ensure_operator(&cart, &user(99, Role::Admin)).is_ok());
        assert!(ensure_operator(&cart, &user(21, Role::Seller)).is_err());

        assert!(ensure_vendor_or_admin(&cart, &user(10, Role::Customer)).is_err());
        assert!(ensure_vendor_or_admin(&cart, &user(20, Role::Seller)).is_ok());
    }
}
