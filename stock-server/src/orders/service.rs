//! Orders derived from carts and their seller assignment

use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::models::{
    AssignmentResponse, Cart, CartLine, CartState, Order, OrderItem, OrderStatus, Role,
    StaffMember,
};
use shared::util::{now_millis, snowflake_id};

use crate::assignment::AssignmentScheduler;
use crate::auth::CurrentUser;
use crate::carts::machine::check_transition;
use crate::inventory::{
    CommitEngine, InventoryError, InventoryResult, InventoryStore, ReservationManager,
};
use crate::notify::{NotificationQueue, Outbox};
use crate::pricing::{PriceCalculator, TieredPricing, round_money};

/// Mirror a terminal cart state onto its order
pub fn sync_order_with_cart(
    store: &InventoryStore,
    txn: &WriteTransaction,
    cart: &Cart,
    now: i64,
) -> InventoryResult<()> {
    let Some(order_id) = cart.order_id else {
        return Ok(());
    };
    let status = match cart.state {
        CartState::Committed => OrderStatus::Completed,
        CartState::Expired | CartState::Cancelled => OrderStatus::Cancelled,
        _ => return Ok(()),
    };
    let Some(mut order) = store.get_order(txn, order_id)? else {
        tracing::warn!(cart_id = cart.id, order_id, "Cart references a missing order");
        return Ok(());
    };
    if order.status != status {
        order.status = status;
        order.updated_at = now;
        store.put_order(txn, &order)?;
    }
    Ok(())
}

/// Move a live cart into review by `seller_id`
fn hand_cart_to_seller(cart: &mut Cart, seller_id: i64, now: i64) {
    cart.vendor_id = Some(seller_id);
    if matches!(cart.state, CartState::Draft | CartState::AwaitingSeller) {
        cart.state = CartState::AssignedReview;
    }
    cart.updated_at = now;
}

/// Active roster entry with the seller role
pub(crate) fn active_seller(
    store: &InventoryStore,
    txn: &WriteTransaction,
    seller_id: i64,
) -> InventoryResult<StaffMember> {
    let member = store
        .get_staff(txn, seller_id)?
        .filter(|m| m.role == Role::Seller)
        .ok_or(InventoryError::SellerNotFound(seller_id))?;
    if !member.active {
        return Err(InventoryError::SellerInactive(seller_id));
    }
    Ok(member)
}

#[derive(Debug, Clone)]
pub struct OrderService {
    store: InventoryStore,
    scheduler: AssignmentScheduler,
    commit: CommitEngine,
    notifier: NotificationQueue,
}

impl OrderService {
    pub fn new(
        store: InventoryStore,
        scheduler: AssignmentScheduler,
        commit: CommitEngine,
        notifier: NotificationQueue,
    ) -> Self {
        Self {
            store,
            scheduler,
            commit,
            notifier,
        }
    }

    /// Direct checkout by the cart's assigned seller
    ///
    /// Lines still pending a stock check are released and dropped; the rest
    /// are committed (unless the cart already went through
    /// `ready_for_payment`) and the cart is finalized as `committed`. An open
    /// order for the cart is completed in place, otherwise a new one is
    /// created already completed.
    pub fn checkout(&self, user: &CurrentUser, cart_id: i64) -> InventoryResult<Order> {
        let now = now_millis();
        let mut outbox = Outbox::new();

        let order = self.store.write(|txn| -> InventoryResult<Order> {
            let mut cart = self
                .store
                .get_cart(txn, cart_id)?
                .ok_or(InventoryError::CartNotFound(cart_id))?;
            if cart.vendor_id != Some(user.id) {
                return Err(InventoryError::Forbidden(format!(
                    "cart {cart_id} is not assigned to you"
                )));
            }
            active_seller(&self.store, txn, user.id)?;
            if cart.lines.is_empty() {
                return Err(InventoryError::CartEmpty(cart_id));
            }

            let mut order = self.price_order(txn, &cart, now)?;

            if cart.state != CartState::ReadyForPayment {
                check_transition(cart.state, CartState::ReadyForPayment)?;
                let reservations = ReservationManager::new(&self.store, txn);
                for line in cart.lines.iter_mut().filter(|l| l.is_pending_confirmation()) {
                    reservations.release(line)?;
                }
                cart.lines.retain(|l| !l.is_pending_confirmation());
                self.commit.commit(
                    &self.store,
                    txn,
                    &mut cart,
                    CartState::ReadyForPayment,
                    Some(user.id),
                    now,
                )?;
            }
            check_transition(cart.state, CartState::Committed)?;

            if let Some(existing) = self.store.open_order_for_cart(txn, cart_id)? {
                if let Some(previous) = self.store.get_order(txn, existing)? {
                    order.id = previous.id;
                    order.created_at = previous.created_at;
                }
            }
            order.assigned_to = Some(user.id);
            order.status = OrderStatus::Completed;

            cart.state = CartState::Committed;
            cart.expires_at = None;
            cart.order_id = Some(order.id);
            cart.updated_at = now;
            self.store.put_order(txn, &order)?;
            self.store.put_cart(txn, &cart)?;

            outbox.push(
                cart.user_id,
                format!("Your purchase is complete. Order #{} is ready.", order.id),
            );
            Ok(order)
        })?;

        self.notifier.dispatch(outbox);
        tracing::info!(
            order_id = order.id,
            cart_id,
            seller_id = user.id,
            total = %order.total,
            "Cart checked out by seller"
        );
        Ok(order)
    }

    /// Create a priced order for a cart and try to give it a seller
    ///
    /// A seller already reviewing the cart keeps it; otherwise round-robin
    /// picks one. With no active seller the order stays pending, the cart
    /// waits for a seller and administrators are notified.
    pub fn request_assignment(
        &self,
        user: &CurrentUser,
        cart_id: i64,
    ) -> InventoryResult<AssignmentResponse> {
        let now = now_millis();
        let mut outbox = Outbox::new();

        let (order, seller_id) = self.store.write(|txn| -> InventoryResult<(Order, Option<i64>)> {
            let mut cart = self
                .store
                .get_cart(txn, cart_id)?
                .ok_or(InventoryError::CartNotFound(cart_id))?;
            if cart.user_id != user.id && !user.is_admin() {
                return Err(InventoryError::Forbidden(format!(
                    "cart {cart_id} belongs to another customer"
                )));
            }
            if cart.state.is_terminal() {
                return Err(InventoryError::InvalidTransition {
                    from: cart.state,
                    to: CartState::AssignedReview,
                });
            }
            if cart.lines.is_empty() {
                return Err(InventoryError::CartEmpty(cart_id));
            }
            if let Some(order_id) = self.store.open_order_for_cart(txn, cart_id)? {
                return Err(InventoryError::OrderAlreadyExists { cart_id, order_id });
            }

            let mut order = self.price_order(txn, &cart, now)?;

            let reviewing = match cart.vendor_id {
                Some(vendor) => active_seller(&self.store, txn, vendor).ok().map(|m| m.id),
                None => None,
            };
            let chosen = match reviewing {
                Some(vendor) => Some(vendor),
                None => self.scheduler.assign_next(&self.store, txn, now)?,
            };

            match chosen {
                Some(seller_id) => {
                    order.assigned_to = Some(seller_id);
                    order.status = OrderStatus::Assigned;
                    hand_cart_to_seller(&mut cart, seller_id, now);
                    outbox.push(
                        seller_id,
                        format!(
                            "Order #{} was assigned to you. Review it and contact the customer.",
                            order.id
                        ),
                    );
                    outbox.push(
                        cart.user_id,
                        format!(
                            "Your order #{} was assigned to a seller who will contact you soon.",
                            order.id
                        ),
                    );
                }
                None => {
                    if cart.state != CartState::AwaitingSeller
                        && cart.state != CartState::ReadyForPayment
                    {
                        check_transition(cart.state, CartState::AwaitingSeller)?;
                        cart.state = CartState::AwaitingSeller;
                    }
                    let staff = self.store.list_staff(txn)?;
                    for admin in AssignmentScheduler::admins(&staff) {
                        outbox.push(
                            admin,
                            format!(
                                "New order #{} is pending: no sellers are active.",
                                order.id
                            ),
                        );
                    }
                }
            }

            cart.order_id = Some(order.id);
            cart.updated_at = now;
            self.store.put_order(txn, &order)?;
            self.store.put_cart(txn, &cart)?;
            Ok((order, chosen))
        })?;

        self.notifier.dispatch(outbox);

        let response = match seller_id {
            Some(seller_id) => {
                tracing::info!(order_id = order.id, cart_id, seller_id, "Order assigned");
                AssignmentResponse {
                    order,
                    seller_id: Some(seller_id),
                    pending: false,
                    message: "A seller was assigned automatically.".to_string(),
                }
            }
            None => {
                tracing::warn!(order_id = order.id, cart_id, "Order pending, no active sellers");
                AssignmentResponse {
                    order,
                    seller_id: None,
                    pending: true,
                    message: "No sellers are active. The order is pending and the team has been notified."
                        .to_string(),
                }
            }
        };
        Ok(response)
    }

    fn price_order(
        &self,
        txn: &WriteTransaction,
        cart: &Cart,
        now: i64,
    ) -> InventoryResult<Order> {
        // Lines still waiting for a stock check are not sold yet
        let confirmed: Vec<&CartLine> = cart
            .lines
            .iter()
            .filter(|l| !l.is_pending_confirmation())
            .collect();
        if confirmed.is_empty() {
            return Err(InventoryError::StockConfirmationPending(cart.id));
        }

        let pricing = TieredPricing::new(self.store.get_price_tiers(txn)?);
        let total_quantity: i64 = confirmed.iter().map(|l| l.quantity).sum();

        let mut items = Vec::with_capacity(confirmed.len());
        let mut total = Decimal::ZERO;
        for line in confirmed {
            let product = self
                .store
                .get_product(txn, line.product_id)?
                .ok_or(InventoryError::ProductNotFound(line.product_id))?;
            let unit_price = pricing.unit_price(product.cost_price, total_quantity);
            total += unit_price * Decimal::from(line.quantity);
            items.push(OrderItem {
                product_id: line.product_id,
                variant_id: line.variant_id,
                quantity: line.quantity,
                unit_price,
                base_cost: product.cost_price,
            });
        }

        Ok(Order {
            id: snowflake_id(),
            user_id: cart.user_id,
            cart_id: cart.id,
            assigned_to: None,
            status: OrderStatus::PendingAssignment,
            items,
            total: round_money(total),
            created_at: now,
            updated_at: now,
        })
    }

    /// A seller claims an unassigned order
    ///
    /// Compare-and-set on `assigned_to`: fails with `AssignmentUnavailable`
    /// when someone got there first.
    pub fn assign_self(&self, user: &CurrentUser, order_id: i64) -> InventoryResult<Order> {
        if user.role != Role::Seller {
            return Err(InventoryError::Forbidden(
                "only sellers can take orders".to_string(),
            ));
        }
        let now = now_millis();
        let mut outbox = Outbox::new();

        let order = self.store.write(|txn| -> InventoryResult<Order> {
            active_seller(&self.store, txn, user.id)?;
            let mut order = self
                .store
                .get_order(txn, order_id)?
                .ok_or(InventoryError::OrderNotFound(order_id))?;
            if order.assigned_to.is_some() || !order.status.is_open() {
                return Err(InventoryError::AssignmentUnavailable(order_id));
            }
            self.apply_assignment(txn, &mut order, user.id, now, &mut outbox)?;
            Ok(order)
        })?;

        self.notifier.dispatch(outbox);
        tracing::info!(order_id, seller_id = user.id, "Seller self-assigned order");
        Ok(order)
    }

    /// Administrator assigns or reassigns an open order
    pub fn assign_to(
        &self,
        user: &CurrentUser,
        order_id: i64,
        seller_id: i64,
    ) -> InventoryResult<Order> {
        if !user.is_admin() {
            return Err(InventoryError::Forbidden(
                "only administrators can assign orders".to_string(),
            ));
        }
        let now = now_millis();
        let mut outbox = Outbox::new();

        let order = self.store.write(|txn| -> InventoryResult<Order> {
            active_seller(&self.store, txn, seller_id)?;
            let mut order = self
                .store
                .get_order(txn, order_id)?
                .ok_or(InventoryError::OrderNotFound(order_id))?;
            if !order.status.is_open() {
                return Err(InventoryError::AssignmentUnavailable(order_id));
            }
            self.apply_assignment(txn, &mut order, seller_id, now, &mut outbox)?;
            Ok(order)
        })?;

        self.notifier.dispatch(outbox);
        tracing::info!(order_id, seller_id, admin_id = user.id, "Order assigned by admin");
        Ok(order)
    }

    fn apply_assignment(
        &self,
        txn: &WriteTransaction,
        order: &mut Order,
        seller_id: i64,
        now: i64,
        outbox: &mut Outbox,
    ) -> InventoryResult<()> {
        order.assigned_to = Some(seller_id);
        order.status = OrderStatus::Assigned;
        order.updated_at = now;
        self.store.put_order(txn, order)?;

        if let Some(mut cart) = self.store.get_cart(txn, order.cart_id)? {
            if !cart.state.is_terminal() {
                hand_cart_to_seller(&mut cart, seller_id, now);
                self.store.put_cart(txn, &cart)?;
            }
        }

        outbox.push(seller_id, format!("Order #{} is now yours.", order.id));
        outbox.push(
            order.user_id,
            format!("Your order #{} was assigned to a seller.", order.id),
        );
        Ok(())
    }

    fn visible_to(order: &Order, user: &CurrentUser) -> bool {
        match user.role {
            Role::Admin => true,
            Role::Seller => order.assigned_to.is_none() || order.assigned_to == Some(user.id),
            Role::Customer => order.user_id == user.id,
        }
    }

    pub fn get(&self, user: &CurrentUser, order_id: i64) -> InventoryResult<Order> {
        let order = self
            .store
            .read_order(order_id)?
            .ok_or(InventoryError::OrderNotFound(order_id))?;
        if !Self::visible_to(&order, user) {
            return Err(InventoryError::OrderNotFound(order_id));
        }
        Ok(order)
    }

    /// Orders visible to the caller, newest first
    pub fn list(
        &self,
        user: &CurrentUser,
        status: Option<OrderStatus>,
    ) -> InventoryResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .store
            .read_orders()?
            .into_iter()
            .filter(|o| Self::visible_to(o, user))
            .filter(|o| status.is_none_or(|s| o.status == s))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;
    use shared::models::{PriceFormula, PriceTier, Product};
    use tokio::sync::mpsc;

    struct Fixture {
        store: InventoryStore,
        service: OrderService,
        rx: mpsc::Receiver<(i64, String)>,
    }

    fn create_fixture() -> Fixture {
        let store = InventoryStore::open_in_memory().unwrap();
        let (queue, rx) = NotificationQueue::channel(64);
        let service = OrderService::new(
            store.clone(),
            AssignmentScheduler::new(Tz::UTC),
            CommitEngine::default(),
            queue,
        );
        store
            .write(|txn| {
                store.put_product(
                    txn,
                    &Product {
                        id: 1,
                        name: "Jean".into(),
                        cost_price: Decimal::new(1000, 2),
                        total_stock_cap: None,
                        updated_at: 0,
                    },
                )
            })
            .unwrap();
        Fixture { store, service, rx }
    }

    fn staff(id: i64, role: Role) -> StaffMember {
        StaffMember {
            id,
            name: format!("staff-{id}"),
            role,
            active: true,
            working_from: None,
            working_to: None,
            updated_at: 0,
        }
    }

    fn user(id: i64, role: Role) -> CurrentUser {
        CurrentUser {
            id,
            username: format!("u{id}"),
            role,
        }
    }

    fn seed_cart(store: &InventoryStore, cart_id: i64, user_id: i64, quantity: i64) {
        let mut cart = Cart::new(cart_id, user_id, 0);
        cart.lines.push(CartLine {
            id: cart_id * 10,
            product_id: 1,
            variant_id: 1,
            quantity,
            reserved_quantity: 0,
            location: String::new(),
            requires_stock_check: false,
            stock_confirmed: false,
            created_at: 0,
            updated_at: 0,
        });
        store.write(|txn| store.put_cart(txn, &cart)).unwrap();
    }

    fn line(id: i64, variant_id: i64, quantity: i64, pending: bool) -> CartLine {
        CartLine {
            id,
            product_id: 1,
            variant_id,
            quantity,
            reserved_quantity: 0,
            location: String::new(),
            requires_stock_check: pending,
            stock_confirmed: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<(i64, String)>) -> Vec<i64> {
        let mut users = Vec::new();
        while let Ok((user_id, _)) = rx.try_recv() {
            users.push(user_id);
        }
        users
    }

    #[test]
    fn test_round_robin_assignment_updates_cart() {
        let mut fx = create_fixture();
        fx.store
            .write(|txn| -> InventoryResult<()> {
                for id in [2, 5, 9] {
                    fx.store.put_staff(txn, &staff(id, Role::Seller))?;
                }
                fx.store.set_cursor(txn, "seller_rr", 5)?;
                Ok(())
            })
            .unwrap();
        seed_cart(&fx.store, 100, 7, 3);

        let response = fx
            .service
            .request_assignment(&user(7, Role::Customer), 100)
            .unwrap();
        assert_eq!(response.seller_id, Some(9));
        assert!(!response.pending);
        assert_eq!(response.order.status, OrderStatus::Assigned);

        let cart = fx.store.read_cart(100).unwrap().unwrap();
        assert_eq!(cart.vendor_id, Some(9));
        assert_eq!(cart.state, CartState::AssignedReview);
        assert_eq!(cart.order_id, Some(response.order.id));
        assert_eq!(drain(&mut fx.rx), vec![9, 7]);
    }

    #[test]
    fn test_no_sellers_leaves_order_pending_and_notifies_admins() {
        let mut fx = create_fixture();
        fx.store
            .write(|txn| fx.store.put_staff(txn, &staff(1, Role::Admin)))
            .unwrap();
        seed_cart(&fx.store, 100, 7, 3);

        let response = fx
            .service
            .request_assignment(&user(7, Role::Customer), 100)
            .unwrap();
        assert!(response.pending);
        assert_eq!(response.order.status, OrderStatus::PendingAssignment);
        assert_eq!(response.order.assigned_to, None);
        assert_eq!(
            fx.store.read_cart(100).unwrap().unwrap().state,
            CartState::AwaitingSeller
        );
        assert_eq!(drain(&mut fx.rx), vec![1]);

        let err = fx
            .service
            .request_assignment(&user(7, Role::Customer), 100)
            .unwrap_err();
        assert!(matches!(err, InventoryError::OrderAlreadyExists { cart_id: 100, .. }));
    }

    #[test]
    fn test_order_is_priced_on_total_quantity() {
        let fx = create_fixture();
        fx.store
            .write(|txn| {
                fx.store.put_price_tiers(
                    txn,
                    &[
                        PriceTier {
                            name: "base".into(),
                            formula: PriceFormula::PercentageMarkup,
                            value: Decimal::from(100),
                            min_quantity: 0,
                            order_index: 2,
                            is_default: true,
                            active: true,
                        },
                        PriceTier {
                            name: "bulk".into(),
                            formula: PriceFormula::PercentageMarkup,
                            value: Decimal::from(50),
                            min_quantity: 12,
                            order_index: 1,
                            is_default: false,
                            active: true,
                        },
                    ],
                )
            })
            .unwrap();
        seed_cart(&fx.store, 100, 7, 12);

        let order = fx
            .service
            .request_assignment(&user(7, Role::Customer), 100)
            .unwrap()
            .order;
        assert_eq!(order.items[0].unit_price, Decimal::new(1500, 2));
        assert_eq!(order.total, Decimal::new(18000, 2));
    }

    #[test]
    fn test_self_assign_is_compare_and_set() {
        let fx = create_fixture();
        fx.store
            .write(|txn| -> InventoryResult<()> {
                fx.store.put_staff(txn, &staff(2, Role::Seller))?;
                fx.store.put_staff(txn, &staff(3, Role::Seller))?;
                Ok(())
            })
            .unwrap();
        seed_cart(&fx.store, 100, 7, 1);

        // Leave the order pending by deactivating everyone first
        fx.store
            .write(|txn| -> InventoryResult<()> {
                for id in [2, 3] {
                    let mut member = staff(id, Role::Seller);
                    member.active = false;
                    fx.store.put_staff(txn, &member)?;
                }
                Ok(())
            })
            .unwrap();
        let order_id = fx
            .service
            .request_assignment(&user(7, Role::Customer), 100)
            .unwrap()
            .order
            .id;
        fx.store
            .write(|txn| -> InventoryResult<()> {
                fx.store.put_staff(txn, &staff(2, Role::Seller))?;
                fx.store.put_staff(txn, &staff(3, Role::Seller))?;
                Ok(())
            })
            .unwrap();

        let first = fx.service.assign_self(&user(2, Role::Seller), order_id).unwrap();
        assert_eq!(first.assigned_to, Some(2));
        let err = fx
            .service
            .assign_self(&user(3, Role::Seller), order_id)
            .unwrap_err();
        assert!(matches!(err, InventoryError::AssignmentUnavailable(id) if id == order_id));

        let cart = fx.store.read_cart(100).unwrap().unwrap();
        assert_eq!(cart.vendor_id, Some(2));
        assert_eq!(cart.state, CartState::AssignedReview);

        let err = fx
            .service
            .assign_self(&user(7, Role::Customer), order_id)
            .unwrap_err();
        assert!(matches!(err, InventoryError::Forbidden(_)));
    }

    #[test]
    fn test_visibility() {
        let fx = create_fixture();
        seed_cart(&fx.store, 100, 7, 1);
        let order_id = fx
            .service
            .request_assignment(&user(7, Role::Customer), 100)
            .unwrap()
            .order
            .id;

        assert!(fx.service.get(&user(7, Role::Customer), order_id).is_ok());
        assert!(fx.service.get(&user(8, Role::Customer), order_id).is_err());
        assert!(fx.service.get(&user(2, Role::Seller), order_id).is_ok());
        assert_eq!(
            fx.service
                .list(&user(1, Role::Admin), Some(OrderStatus::PendingAssignment))
                .unwrap()
                .len(),
            1
        );
        assert!(fx
            .service
            .list(&user(1, Role::Admin), Some(OrderStatus::Completed))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_pending_lines_are_left_out_of_the_order() {
        let fx = create_fixture();
        let mut cart = Cart::new(100, 7, 0);
        cart.lines.push(line(1, 1, 3, false));
        cart.lines.push(line(2, 2, 3, true));
        fx.store.write(|txn| fx.store.put_cart(txn, &cart)).unwrap();

        let order = fx
            .service
            .request_assignment(&user(7, Role::Customer), 100)
            .unwrap()
            .order;
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].variant_id, 1);
        assert_eq!(order.total, Decimal::new(3000, 2));

        let mut waiting = Cart::new(200, 8, 0);
        waiting.lines.push(line(3, 1, 2, true));
        fx.store.write(|txn| fx.store.put_cart(txn, &waiting)).unwrap();
        let err = fx
            .service
            .request_assignment(&user(8, Role::Customer), 200)
            .unwrap_err();
        assert!(matches!(err, InventoryError::StockConfirmationPending(200)));
        assert!(fx.store.read_cart(200).unwrap().unwrap().order_id.is_none());
    }

    #[test]
    fn test_seller_checkout_commits_confirmed_lines() {
        use crate::inventory::{MovementInfo, StockLedger};
        use shared::models::{MovementType, StockKey};

        let mut fx = create_fixture();
        let confirmed_key = StockKey::new(1, 1, "deposito");
        let pending_key = StockKey::new(1, 2, "deposito");
        let mut cart = Cart::new(100, 7, 0);
        cart.vendor_id = Some(2);
        cart.state = CartState::AssignedReview;
        cart.lines.push(line(1, 1, 3, false));
        cart.lines.push(line(2, 2, 2, true));
        fx.store
            .write(|txn| -> InventoryResult<()> {
                fx.store.put_staff(txn, &staff(2, Role::Seller))?;
                fx.store.put_staff(txn, &staff(3, Role::Seller))?;
                let ledger = StockLedger::new(&fx.store, txn);
                ledger.set_stock(&confirmed_key, 10, MovementInfo::new(MovementType::Adjustment))?;
                ledger.set_stock(&pending_key, 5, MovementInfo::new(MovementType::Adjustment))?;
                ReservationManager::new(&fx.store, txn).reserve(
                    &mut cart.lines[1],
                    "deposito",
                    2,
                )?;
                fx.store.put_cart(txn, &cart)?;
                Ok(())
            })
            .unwrap();

        let err = fx
            .service
            .checkout(&user(3, Role::Seller), 100)
            .unwrap_err();
        assert!(matches!(err, InventoryError::Forbidden(_)));

        let order = fx.service.checkout(&user(2, Role::Seller), 100).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.assigned_to, Some(2));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.total, Decimal::new(3000, 2));

        let stocked = fx.store.read_stock(&confirmed_key).unwrap().unwrap();
        assert_eq!((stocked.stock, stocked.reserved), (7, 0));
        let released = fx.store.read_stock(&pending_key).unwrap().unwrap();
        assert_eq!((released.stock, released.reserved), (5, 0));

        let cart = fx.store.read_cart(100).unwrap().unwrap();
        assert_eq!(cart.state, CartState::Committed);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.order_id, Some(order.id));
        assert_eq!(cart.expires_at, None);
        assert_eq!(drain(&mut fx.rx), vec![7]);

        let err = fx
            .service
            .checkout(&user(2, Role::Seller), 100)
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidTransition { .. }));
    }

    #[test]
    fn test_seller_checkout_completes_the_open_order() {
        let fx = create_fixture();
        fx.store
            .write(|txn| -> InventoryResult<()> {
                fx.store.put_staff(txn, &staff(2, Role::Seller))?;
                crate::inventory::StockLedger::new(&fx.store, txn).set_stock(
                    &shared::models::StockKey::new(1, 1, "deposito"),
                    10,
                    crate::inventory::MovementInfo::new(shared::models::MovementType::Adjustment),
                )?;
                Ok(())
            })
            .unwrap();
        seed_cart(&fx.store, 100, 7, 4);
        let assigned = fx
            .service
            .request_assignment(&user(7, Role::Customer), 100)
            .unwrap();
        assert_eq!(assigned.seller_id, Some(2));

        let order = fx.service.checkout(&user(2, Role::Seller), 100).unwrap();
        assert_eq!(order.id, assigned.order.id);
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(fx.store.read_orders().unwrap().len(), 1);
    }
}
