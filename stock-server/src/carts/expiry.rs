//! Expiry Sweeper
//!
//! Periodically moves `ready_for_payment` carts whose payment window has
//! closed to `expired`, releasing whatever reservations they still hold.
//! Each cart is handled in its own transaction; a failure on one cart is
//! logged and the sweep moves on.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use shared::models::CartState;
use shared::util::now_millis;
use tokio_util::sync::CancellationToken;

use crate::inventory::{InventoryError, InventoryResult, InventoryStore, ReservationManager};
use crate::notify::{NotificationQueue, Outbox};
use crate::orders::sync_order_with_cart;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Carts found in the due window index
    pub examined: usize,
    pub expired: usize,
    /// Changed state or window since the index was read
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSnapshot {
    pub last_run_at: Option<i64>,
    pub last_report: Option<SweepReport>,
    pub total_expired: u64,
}

/// Last sweep summary, shared with `/health`
#[derive(Debug, Clone, Default)]
pub struct SweepStats {
    inner: Arc<RwLock<SweepSnapshot>>,
}

impl SweepStats {
    pub fn snapshot(&self) -> SweepSnapshot {
        self.inner.read().clone()
    }

    fn record(&self, at: i64, report: SweepReport) {
        let mut inner = self.inner.write();
        inner.last_run_at = Some(at);
        inner.last_report = Some(report);
        inner.total_expired += report.expired as u64;
    }
}

enum Outcome {
    Expired,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    store: InventoryStore,
    notifier: NotificationQueue,
    interval: Duration,
    stats: SweepStats,
}

impl ExpirySweeper {
    pub fn new(
        store: InventoryStore,
        notifier: NotificationQueue,
        interval: Duration,
        stats: SweepStats,
    ) -> Self {
        Self {
            store,
            notifier,
            interval,
            stats,
        }
    }

    pub fn stats(&self) -> &SweepStats {
        &self.stats
    }

    /// Expire every cart whose window closed at or before `now`
    pub fn sweep_once(&self, now: i64) -> SweepReport {
        let mut report = SweepReport::default();

        let due = match self.store.read_due_payment_windows(now) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read payment windows");
                report.failed = 1;
                self.stats.record(now, report);
                return report;
            }
        };

        for cart_id in due {
            report.examined += 1;
            match self.expire_cart(cart_id, now) {
                Ok(Outcome::Expired) => report.expired += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(cart_id, error = %e, "Failed to expire cart");
                }
            }
        }

        if report.examined > 0 {
            tracing::info!(
                examined = report.examined,
                expired = report.expired,
                skipped = report.skipped,
                failed = report.failed,
                "Expiry sweep finished"
            );
        }
        self.stats.record(now, report);
        report
    }

    fn expire_cart(&self, cart_id: i64, now: i64) -> InventoryResult<Outcome> {
        let mut outbox = Outbox::new();

        let outcome = self.store.write(|txn| -> InventoryResult<Outcome> {
            let mut cart = self
                .store
                .get_cart(txn, cart_id)?
                .ok_or(InventoryError::CartNotFound(cart_id))?;

            // Paid, cancelled or re-windowed after the index was read
            let due = cart.state == CartState::ReadyForPayment
                && cart.expires_at.is_some_and(|at| at <= now);
            if !due {
                return Ok(Outcome::Skipped);
            }

            ReservationManager::new(&self.store, txn).release_all(&mut cart.lines)?;
            cart.state = CartState::Expired;
            cart.updated_at = now;
            sync_order_with_cart(&self.store, txn, &cart, now)?;
            self.store.put_cart(txn, &cart)?;

            outbox.push(
                cart.user_id,
                format!("The payment window for cart #{cart_id} has expired."),
            );
            Ok(Outcome::Expired)
        })?;

        self.notifier.dispatch(outbox);
        if matches!(outcome, Outcome::Expired) {
            tracing::info!(cart_id, "Cart expired");
        }
        Ok(outcome)
    }

    /// Sweep immediately, then every `interval` until shutdown
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Expiry sweeper received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    let sweeper = self.clone();
                    let result =
                        tokio::task::spawn_blocking(move || sweeper.sweep_once(now_millis())).await;
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Expiry sweep task failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{MovementInfo, StockLedger};
    use shared::models::{Cart, CartLine, MovementType, StockKey};
    use tokio::sync::mpsc;

    fn create_sweeper() -> (ExpirySweeper, mpsc::Receiver<(i64, String)>) {
        let store = InventoryStore::open_in_memory().unwrap();
        let (queue, rx) = NotificationQueue::channel(16);
        let sweeper = ExpirySweeper::new(
            store,
            queue,
            Duration::from_secs(60),
            SweepStats::default(),
        );
        (sweeper, rx)
    }

    /// A payment-window cart still holding `reserved` units at "deposito"
    fn seed_cart(store: &InventoryStore, cart_id: i64, reserved: i64, expires_at: i64) {
        let key = StockKey::new(1, 1, "deposito");
        store
            .write(|txn| -> InventoryResult<()> {
                let ledger = StockLedger::new(store, txn);
                if ledger.record(&key)?.is_none() {
                    ledger.set_stock(&key, 10, MovementInfo::new(MovementType::Adjustment))?;
                }
                ledger.adjust_reserved(&key, reserved)?;

                let mut cart = Cart::new(cart_id, 7, 0);
                cart.lines.push(CartLine {
                    id: cart_id * 10,
                    product_id: 1,
                    variant_id: 1,
                    quantity: reserved,
                    reserved_quantity: reserved,
                    location: "deposito".to_string(),
                    requires_stock_check: false,
                    stock_confirmed: false,
                    created_at: 0,
                    updated_at: 0,
                });
                cart.state = CartState::ReadyForPayment;
                cart.reserved_at = Some(0);
                cart.expires_at = Some(expires_at);
                store.put_cart(txn, &cart)?;
                Ok(())
            })
            .unwrap();
    }

    fn reserved(store: &InventoryStore) -> i64 {
        store
            .read_stock(&StockKey::new(1, 1, "deposito"))
            .unwrap()
            .unwrap()
            .reserved
    }

    #[test]
    fn test_sweep_expires_and_releases() {
        let (sweeper, mut rx) = create_sweeper();
        seed_cart(&sweeper.store, 100, 3, 1_000);
        assert_eq!(reserved(&sweeper.store), 3);

        let report = sweeper.sweep_once(2_000);
        assert_eq!(report.expired, 1);
        assert_eq!(report.failed, 0);

        let cart = sweeper.store.read_cart(100).unwrap().unwrap();
        assert_eq!(cart.state, CartState::Expired);
        assert_eq!(cart.lines[0].reserved_quantity, 0);
        assert_eq!(reserved(&sweeper.store), 0);
        assert_eq!(rx.try_recv().unwrap().0, 7);
        assert!(sweeper.store.read_due_payment_windows(i64::MAX).unwrap().is_empty());
    }

    #[test]
    fn test_sweep_leaves_open_windows_alone() {
        let (sweeper, _rx) = create_sweeper();
        seed_cart(&sweeper.store, 100, 2, 5_000);

        let report = sweeper.sweep_once(4_999);
        assert_eq!(report, SweepReport::default());
        assert_eq!(
            sweeper.store.read_cart(100).unwrap().unwrap().state,
            CartState::ReadyForPayment
        );
        assert_eq!(reserved(&sweeper.store), 2);
    }

    #[test]
    fn test_second_sweep_is_a_no_op() {
        let (sweeper, _rx) = create_sweeper();
        seed_cart(&sweeper.store, 100, 3, 1_000);
        seed_cart(&sweeper.store, 200, 2, 1_500);

        assert_eq!(sweeper.sweep_once(2_000).expired, 2);
        assert_eq!(sweeper.sweep_once(3_000).examined, 0);
        assert_eq!(reserved(&sweeper.store), 0);
        assert_eq!(sweeper.store.drift_count(), 0);

        let snapshot = sweeper.stats().snapshot();
        assert_eq!(snapshot.last_run_at, Some(3_000));
        assert_eq!(snapshot.total_expired, 2);
    }

    #[tokio::test]
    async fn test_run_sweeps_on_start_and_stops_on_shutdown() {
        let (sweeper, _rx) = create_sweeper();
        seed_cart(&sweeper.store, 100, 3, 1_000);
        let store = sweeper.store.clone();
        let stats = sweeper.stats().clone();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));

        for _ in 0..50 {
            if stats.snapshot().last_run_at.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(
            store.read_cart(100).unwrap().unwrap().state,
            CartState::Expired
        );
    }

    #[test]
    fn test_unreadable_cart_does_not_stop_the_sweep() {
        let (sweeper, mut rx) = create_sweeper();
        seed_cart(&sweeper.store, 100, 3, 1_000);
        seed_cart(&sweeper.store, 200, 2, 1_000);
        sweeper.store.overwrite_cart_bytes(100, b"{not json").unwrap();
        assert_eq!(reserved(&sweeper.store), 5);

        let report = sweeper.sweep_once(2_000);
        assert_eq!(report.examined, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.expired, 1);

        assert_eq!(
            sweeper.store.read_cart(200).unwrap().unwrap().state,
            CartState::Expired
        );
        // Only the readable cart gave its units back
        assert_eq!(reserved(&sweeper.store), 3);
        assert_eq!(rx.try_recv().unwrap().0, 7);
        assert!(rx.try_recv().is_err());
    }
}
