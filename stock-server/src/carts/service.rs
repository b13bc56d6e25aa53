//! Cart operations
//!
//! Every mutation runs in one write transaction: the state guard, the
//! ledger change and the cart row commit together or not at all.
//! Notifications are collected on the side and queued after commit.

use rust_decimal::Decimal;
use shared::models::{
    Cart, CartAddRequest, CartLine, CartLineUpdate, CartState, CartSummary, CartSummaryLine,
    Role, StockCheck, StockIssue, StockIssueKind,
};
use shared::util::{now_millis, snowflake_id};

use super::machine::{check_transition, ensure_editable, ensure_operator, ensure_vendor_or_admin};
use crate::auth::CurrentUser;
use crate::inventory::{
    CommitEngine, InventoryError, InventoryResult, InventoryStore, ReservationManager,
};
use crate::notify::{NotificationQueue, Outbox};
use crate::orders::{active_seller, sync_order_with_cart};
use crate::pricing::{PriceCalculator, TieredPricing, round_money};
use crate::utils::validation::{validate_location, validate_quantity};

/// A line is flagged `limited_stock` when fewer than this many spare units
/// remain beyond the requested quantity
const LIMITED_STOCK_MARGIN: i64 = 3;

#[derive(Debug, Clone)]
pub struct CartService {
    store: InventoryStore,
    commit: CommitEngine,
    notifier: NotificationQueue,
}

impl CartService {
    pub fn new(store: InventoryStore, commit: CommitEngine, notifier: NotificationQueue) -> Self {
        Self {
            store,
            commit,
            notifier,
        }
    }

    // ========== Reads ==========

    /// The caller's non-terminal cart, created on first use
    pub fn active_cart(&self, user: &CurrentUser) -> InventoryResult<Cart> {
        if let Some(cart) = self.store.read_active_cart(user.id)? {
            return Ok(cart);
        }
        self.store.write(|txn| self.load_or_create_active(txn, user.id))
    }

    fn load_or_create_active(
        &self,
        txn: &redb::WriteTransaction,
        user_id: i64,
    ) -> InventoryResult<Cart> {
        if let Some(cart_id) = self.store.active_cart_id(txn, user_id)? {
            if let Some(cart) = self.store.get_cart(txn, cart_id)? {
                return Ok(cart);
            }
        }
        let cart = Cart::new(snowflake_id(), user_id, now_millis());
        self.store.put_cart(txn, &cart)?;
        tracing::debug!(cart_id = cart.id, user_id, "Created cart");
        Ok(cart)
    }

    pub fn get_cart(&self, user: &CurrentUser, cart_id: i64) -> InventoryResult<Cart> {
        let cart = self
            .store
            .read_cart(cart_id)?
            .ok_or(InventoryError::CartNotFound(cart_id))?;
        ensure_operator(&cart, user)?;
        Ok(cart)
    }

    /// Per-line availability report across all locations
    pub fn check_stock(&self, user: &CurrentUser) -> InventoryResult<StockCheck> {
        let cart = self.active_cart(user)?;
        let mut issues = Vec::new();

        for line in &cart.lines {
            // Units this line already holds count as available to it
            let available: i64 = self
                .store
                .read_stock_for_variant(line.product_id, line.variant_id)?
                .iter()
                .map(|r| r.available())
                .sum::<i64>()
                + line.reserved_quantity;

            let kind = if available <= 0 {
                Some(StockIssueKind::OutOfStock)
            } else if available < line.quantity {
                Some(StockIssueKind::InsufficientStock)
            } else if available < line.quantity + LIMITED_STOCK_MARGIN {
                Some(StockIssueKind::LimitedStock)
            } else {
                None
            };

            if let Some(kind) = kind {
                issues.push(StockIssue {
                    line_id: line.id,
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                    requested: line.quantity,
                    available: available.max(0),
                    kind,
                });
            }
        }

        let ok = issues
            .iter()
            .all(|i| i.kind == StockIssueKind::LimitedStock);
        Ok(StockCheck {
            cart_id: cart.id,
            ok,
            issues,
        })
    }

    /// Applicable tier and line prices for the caller's active cart
    pub fn summary(&self, user: &CurrentUser) -> InventoryResult<CartSummary> {
        let Some(cart) = self.store.read_active_cart(user.id)? else {
            return Ok(CartSummary {
                cart_id: None,
                total_quantity: 0,
                subtotal: Decimal::ZERO,
                tier: None,
                lines: Vec::new(),
            });
        };

        let pricing = TieredPricing::new(self.store.read_price_tiers()?);
        let total_quantity = cart.total_quantity();
        let tier = pricing.applicable_tier(total_quantity).cloned();

        let mut lines = Vec::with_capacity(cart.lines.len());
        let mut subtotal = Decimal::ZERO;
        for line in &cart.lines {
            let product = self
                .store
                .read_product(line.product_id)?
                .ok_or(InventoryError::ProductNotFound(line.product_id))?;
            let unit_price = pricing.unit_price(product.cost_price, total_quantity);
            let line_total = round_money(unit_price * Decimal::from(line.quantity));
            subtotal += line_total;
            lines.push(CartSummaryLine {
                line_id: line.id,
                product_id: line.product_id,
                variant_id: line.variant_id,
                quantity: line.quantity,
                cost_price: product.cost_price,
                unit_price,
                line_total,
            });
        }

        Ok(CartSummary {
            cart_id: Some(cart.id),
            total_quantity,
            subtotal: round_money(subtotal),
            tier,
            lines,
        })
    }

    /// Every cart assigned to the calling seller, most recently touched first
    pub fn carts_for_seller(&self, user: &CurrentUser) -> InventoryResult<Vec<Cart>> {
        if user.role != Role::Seller {
            return Err(InventoryError::Forbidden(
                "only sellers have assigned carts".to_string(),
            ));
        }
        let mut carts = self.store.read_carts_for_vendor(user.id)?;
        carts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(carts)
    }

    // ========== Line Edits ==========

    /// Add a product variant, merging into an existing line
    ///
    /// Without `cart_id` the caller's active cart is used. Extra quantity
    /// on a reserved line is reserved at the same location; a `location`
    /// on an unreserved line reserves the whole line there. Naming another
    /// location for a reserved line is refused.
    pub fn add_line(&self, user: &CurrentUser, req: CartAddRequest) -> InventoryResult<Cart> {
        validate_quantity(req.quantity)?;
        if let Some(location) = &req.location {
            validate_location(location)?;
        }
        let now = now_millis();

        let cart = self.store.write(|txn| -> InventoryResult<Cart> {
            let mut cart = match req.cart_id {
                Some(cart_id) => {
                    let cart = self
                        .store
                        .get_cart(txn, cart_id)?
                        .ok_or(InventoryError::CartNotFound(cart_id))?;
                    ensure_operator(&cart, user)?;
                    cart
                }
                None => self.load_or_create_active(txn, user.id)?,
            };
            ensure_editable(&cart)?;
            if self.store.get_product(txn, req.product_id)?.is_none() {
                return Err(InventoryError::ProductNotFound(req.product_id));
            }

            let reservations = ReservationManager::new(&self.store, txn);
            let existing = cart
                .lines
                .iter_mut()
                .find(|l| l.product_id == req.product_id && l.variant_id == req.variant_id);

            match existing {
                Some(line) => {
                    if let Some(location) = &req.location {
                        if line.has_reservation() && *location != line.location {
                            return Err(InventoryError::Validation(format!(
                                "line {} is reserved at {}; move it with a line update",
                                line.id, line.location
                            )));
                        }
                    }
                    validate_quantity(line.quantity + req.quantity)?;
                    line.quantity += req.quantity;
                    if line.has_reservation() {
                        let location = line.location.clone();
                        reservations.reserve(line, &location, req.quantity)?;
                    } else if let Some(location) = &req.location {
                        let quantity = line.quantity;
                        reservations.reserve(line, location, quantity)?;
                    }
                    line.requires_stock_check |= req.requires_stock_check;
                    line.updated_at = now;
                }
                None => {
                    let mut line = CartLine {
                        id: snowflake_id(),
                        product_id: req.product_id,
                        variant_id: req.variant_id,
                        quantity: req.quantity,
                        reserved_quantity: 0,
                        location: String::new(),
                        requires_stock_check: req.requires_stock_check,
                        stock_confirmed: false,
                        created_at: now,
                        updated_at: now,
                    };
                    if let Some(location) = &req.location {
                        reservations.reserve(&mut line, location, req.quantity)?;
                    }
                    cart.lines.push(line);
                }
            }

            cart.updated_at = now;
            self.store.put_cart(txn, &cart)?;
            Ok(cart)
        })?;

        tracing::info!(
            cart_id = cart.id,
            product_id = req.product_id,
            variant_id = req.variant_id,
            quantity = req.quantity,
            "Added to cart"
        );
        Ok(cart)
    }

    /// Change a line's quantity, reservation location or stock confirmation
    pub fn update_line(
        &self,
        user: &CurrentUser,
        line_id: i64,
        update: CartLineUpdate,
    ) -> InventoryResult<Cart> {
        if let Some(quantity) = update.quantity {
            validate_quantity(quantity)?;
        }
        if let Some(location) = &update.location {
            validate_location(location)?;
        }
        let now = now_millis();
        let mut outbox = Outbox::new();

        let cart = self.store.write(|txn| -> InventoryResult<Cart> {
            let mut cart = self.cart_for_line(txn, line_id)?;
            ensure_operator(&cart, user)?;
            ensure_editable(&cart)?;
            if update.stock_confirmed.is_some() {
                ensure_vendor_or_admin(&cart, user)?;
            }

            let owner = cart.user_id;
            let cart_id = cart.id;
            let reservations = ReservationManager::new(&self.store, txn);
            let line = cart
                .line_mut(line_id)
                .ok_or(InventoryError::LineNotFound(line_id))?;

            if let Some(quantity) = update.quantity {
                if line.has_reservation() {
                    reservations.change_reservation(line, quantity)?;
                }
                line.quantity = quantity;
            }
            if let Some(location) = &update.location {
                reservations.move_reservation(line, location)?;
            }
            if let Some(confirmed) = update.stock_confirmed {
                let was_confirmed = line.stock_confirmed;
                line.stock_confirmed = confirmed;
                if confirmed && !was_confirmed {
                    outbox.push(
                        owner,
                        format!(
                            "Stock for product {} in your cart #{} was confirmed.",
                            line.product_id, cart_id
                        ),
                    );
                }
            }
            line.updated_at = now;

            cart.updated_at = now;
            self.store.put_cart(txn, &cart)?;
            Ok(cart)
        })?;

        self.notifier.dispatch(outbox);
        tracing::info!(cart_id = cart.id, line_id, "Cart line updated");
        Ok(cart)
    }

    /// Remove a line, releasing its reservation first
    pub fn remove_line(&self, user: &CurrentUser, line_id: i64) -> InventoryResult<Cart> {
        let now = now_millis();
        let cart = self.store.write(|txn| -> InventoryResult<Cart> {
            let mut cart = self.cart_for_line(txn, line_id)?;
            ensure_operator(&cart, user)?;
            ensure_editable(&cart)?;

            let reservations = ReservationManager::new(&self.store, txn);
            let line = cart
                .line_mut(line_id)
                .ok_or(InventoryError::LineNotFound(line_id))?;
            reservations.release(line)?;
            cart.lines.retain(|l| l.id != line_id);

            cart.updated_at = now;
            self.store.put_cart(txn, &cart)?;
            Ok(cart)
        })?;

        tracing::info!(cart_id = cart.id, line_id, "Cart line removed");
        Ok(cart)
    }

    /// Release every reservation and empty the caller's active cart
    pub fn clear(&self, user: &CurrentUser) -> InventoryResult<Cart> {
        let now = now_millis();
        let cart = self.store.write(|txn| -> InventoryResult<Cart> {
            let mut cart = self.load_or_create_active(txn, user.id)?;
            ensure_editable(&cart)?;

            ReservationManager::new(&self.store, txn).release_all(&mut cart.lines)?;
            cart.lines.clear();

            cart.updated_at = now;
            self.store.put_cart(txn, &cart)?;
            Ok(cart)
        })?;

        tracing::info!(cart_id = cart.id, "Cart cleared");
        Ok(cart)
    }

    fn cart_for_line(&self, txn: &redb::WriteTransaction, line_id: i64) -> InventoryResult<Cart> {
        let cart_id = self
            .store
            .cart_id_for_line(txn, line_id)?
            .ok_or(InventoryError::LineNotFound(line_id))?;
        self.store
            .get_cart(txn, cart_id)?
            .ok_or(InventoryError::CartNotFound(cart_id))
    }

    // ========== Transitions ==========

    /// Hand a draft cart to a seller for review
    pub fn transfer_to_seller(
        &self,
        user: &CurrentUser,
        cart_id: i64,
        vendor_id: i64,
    ) -> InventoryResult<Cart> {
        let now = now_millis();
        let mut outbox = Outbox::new();

        let cart = self.store.write(|txn| -> InventoryResult<Cart> {
            let mut cart = self
                .store
                .get_cart(txn, cart_id)?
                .ok_or(InventoryError::CartNotFound(cart_id))?;
            if cart.user_id != user.id && !user.is_admin() {
                return Err(InventoryError::Forbidden(format!(
                    "cart {cart_id} belongs to another customer"
                )));
            }
            if cart.state != CartState::Draft {
                return Err(InventoryError::InvalidTransition {
                    from: cart.state,
                    to: CartState::AssignedReview,
                });
            }

            active_seller(&self.store, txn, vendor_id)?;

            cart.vendor_id = Some(vendor_id);
            cart.state = CartState::AssignedReview;
            cart.updated_at = now;
            self.store.put_cart(txn, &cart)?;

            outbox.push(
                vendor_id,
                format!("Cart #{cart_id} was transferred to you for review."),
            );
            Ok(cart)
        })?;

        self.notifier.dispatch(outbox);
        tracing::info!(cart_id, vendor_id, "Cart transferred to seller");
        Ok(cart)
    }

    /// Client-requested state change
    ///
    /// `ready_for_payment` runs the commit engine in the same transaction;
    /// `cancelled` releases every reservation; `committed` (payment
    /// confirmed) is reserved to the assigned seller or an administrator.
    /// `expired` and `awaiting_seller` are system-only.
    pub fn update_status(
        &self,
        user: &CurrentUser,
        cart_id: i64,
        target: CartState,
    ) -> InventoryResult<Cart> {
        if matches!(target, CartState::Expired | CartState::AwaitingSeller) {
            return Err(InventoryError::Validation(format!(
                "state {target} cannot be requested"
            )));
        }
        let now = now_millis();
        let mut outbox = Outbox::new();

        let cart = self.store.write(|txn| -> InventoryResult<(CartState, Cart)> {
            let mut cart = self
                .store
                .get_cart(txn, cart_id)?
                .ok_or(InventoryError::CartNotFound(cart_id))?;
            ensure_operator(&cart, user)?;
            let from = cart.state;
            check_transition(from, target)?;

            match target {
                CartState::ReadyForPayment => {
                    self.commit
                        .commit(&self.store, txn, &mut cart, target, Some(user.id), now)?;
                    if cart.vendor_id != Some(cart.user_id) {
                        outbox.push(
                            cart.user_id,
                            format!("Cart #{cart_id} is ready for payment."),
                        );
                    }
                }
                CartState::Committed => {
                    ensure_vendor_or_admin(&cart, user)?;
                    cart.state = target;
                    cart.expires_at = None;
                    outbox.push(
                        cart.user_id,
                        format!("Payment for cart #{cart_id} was confirmed."),
                    );
                }
                CartState::Cancelled => {
                    ReservationManager::new(&self.store, txn).release_all(&mut cart.lines)?;
                    cart.state = target;
                    cart.expires_at = None;
                    if let Some(vendor) = cart.vendor_id {
                        if vendor != user.id {
                            outbox.push(vendor, format!("Cart #{cart_id} was cancelled."));
                        }
                    }
                }
                CartState::AssignedReview => {
                    // Sellers are attached through `transfer_to_seller`
                    if cart.vendor_id.is_none() {
                        return Err(InventoryError::Validation(
                            "transfer the cart to a seller before review".to_string(),
                        ));
                    }
                    cart.state = target;
                }
                _ => cart.state = target,
            }

            cart.updated_at = now;
            sync_order_with_cart(&self.store, txn, &cart, now)?;
            self.store.put_cart(txn, &cart)?;
            Ok((from, cart))
        });

        let (from, cart) = match cart {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(cart_id, target = %target, error = %e, "Cart transition rejected");
                return Err(e);
            }
        };

        self.notifier.dispatch(outbox);
        tracing::info!(cart_id, from = %from, to = %cart.state, "Cart state changed");
        Ok(cart)
    }
}
