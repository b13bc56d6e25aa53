use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::assignment::{AssignmentScheduler, StaffRoster};
use crate::auth::JwtService;
use crate::carts::{CartService, ExpirySweeper, SweepStats};
use crate::core::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::inventory::{CommitEngine, InventoryStore, StockService, StorageResult};
use crate::notify::{InboxSink, NotificationDispatcher, NotificationQueue};
use crate::orders::OrderService;
use crate::pricing::PricingService;

/// Server state - shared handles to every service
///
/// Cloning is cheap: every field is an `Arc` or a handle over the same
/// [`InventoryStore`].
///
/// | Field | Meaning |
/// |-------|---------|
/// | config | immutable configuration |
/// | store | redb ledger store |
/// | carts / orders / stock / roster / pricing | domain services |
/// | inbox | in-process notification sink |
/// | sweep_stats | last expiry sweep, for `/health` |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: InventoryStore,
    pub jwt_service: Arc<JwtService>,
    pub carts: CartService,
    pub orders: OrderService,
    pub stock: StockService,
    pub roster: StaffRoster,
    pub pricing: PricingService,
    pub inbox: Arc<InboxSink>,
    pub sweep_stats: SweepStats,
    notifier: NotificationQueue,
    /// Taken once by [`ServerState::start_background_tasks`]
    notification_rx: Arc<Mutex<Option<mpsc::Receiver<(i64, String)>>>>,
}

impl ServerState {
    /// Open the file-backed store under `work_dir` and build the services
    pub fn initialize(config: &Config) -> StorageResult<Self> {
        let work_dir = PathBuf::from(&config.work_dir);
        if let Err(e) = std::fs::create_dir_all(&work_dir) {
            tracing::warn!(path = %work_dir.display(), error = %e, "Failed to create work dir");
        }
        let store = InventoryStore::open(config.database_path())?
            .with_lock_timeout(config.lock_timeout());
        tracing::info!(path = %config.database_path().display(), "Inventory store opened");
        Ok(Self::with_store(config.clone(), store))
    }

    /// Build the services over an existing store (tests use in-memory redb)
    pub fn with_store(config: Config, store: InventoryStore) -> Self {
        let (notifier, notification_rx) =
            NotificationQueue::channel(config.notification_queue_size);
        let scheduler = AssignmentScheduler::new(config.business_timezone());
        let commit = CommitEngine::new(config.reservation_window());

        Self {
            jwt_service: Arc::new(JwtService::with_config(config.jwt.clone())),
            carts: CartService::new(store.clone(), commit.clone(), notifier.clone()),
            orders: OrderService::new(store.clone(), scheduler, commit, notifier.clone()),
            stock: StockService::new(store.clone()),
            roster: StaffRoster::new(store.clone()),
            pricing: PricingService::new(store.clone()),
            inbox: Arc::new(InboxSink::new()),
            sweep_stats: SweepStats::default(),
            notifier,
            notification_rx: Arc::new(Mutex::new(Some(notification_rx))),
            store,
            config,
        }
    }

    pub fn jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }

    /// Start the notification dispatcher and the expiry sweeper
    ///
    /// The dispatcher can only be started once per state; later calls
    /// start the sweeper alone.
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        match self.notification_rx.lock().take() {
            Some(rx) => {
                let dispatcher =
                    NotificationDispatcher::new(rx, self.inbox.clone(), tasks.shutdown_token());
                tasks.spawn("notification_dispatcher", TaskKind::Worker, dispatcher.run());
            }
            None => tracing::warn!("Notification dispatcher already started"),
        }

        let sweeper = ExpirySweeper::new(
            self.store.clone(),
            self.notifier.clone(),
            self.config.sweep_interval(),
            self.sweep_stats.clone(),
        );
        tasks.spawn(
            "expiry_sweeper",
            TaskKind::Periodic,
            sweeper.run(tasks.shutdown_token()),
        );

        tasks.log_summary();
        tasks
    }
}
