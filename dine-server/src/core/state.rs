use std::sync::Arc;
use std::time::Duration;

use crate::auth::{JwtConfig, JwtService};
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result, ServerError};
use crate::menu::MenuCatalog;
use crate::orders::{OrderAggregator, OrderQueries, OrderStatusMachine};
use crate::realtime::{ChangeFeed, ConnectionRegistry, alert_listener};
use crate::services::HttpService;
use crate::storage::DineStorage;
use crate::tables::TableSessionManager;

/// Log files older than this are removed
const LOG_RETENTION_DAYS: u64 = 14;
const LOG_CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Server state; every field is a cheap shared handle
///
/// | Field | Type | Role |
/// |-------|------|------|
/// | config | Config | immutable settings |
/// | storage | DineStorage | redb store |
/// | feed | ChangeFeed | post-commit change fan-out |
/// | tables | TableSessionManager | table status writes |
/// | aggregator | OrderAggregator | cart submission |
/// | status | OrderStatusMachine | order status writes |
/// | queries | OrderQueries | order reads |
/// | menu | MenuCatalog | menu reads and soft delete |
/// | registry | ConnectionRegistry | live realtime subscriptions |
/// | http | HttpService | router (also used in-process) |
/// | jwt_service | Arc<JwtService> | token validation |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub storage: DineStorage,
    pub feed: ChangeFeed,
    pub tables: TableSessionManager,
    pub aggregator: OrderAggregator,
    pub status: OrderStatusMachine,
    pub queries: OrderQueries,
    pub menu: MenuCatalog,
    pub registry: ConnectionRegistry,
    pub http: HttpService,
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// Open `WORK_DIR/dine.redb` and wire the services
    pub async fn initialize(config: &Config) -> Result<Self> {
        config.ensure_work_dir_structure()?;
        let storage = DineStorage::open(config.db_path())?;
        tracing::info!(path = %config.db_path().display(), "Store opened");
        Self::with_storage(config, storage)
    }

    /// Wire the services around an already opened store
    ///
    /// Used with the in-memory backend by tests and the in-process client.
    pub fn with_storage(config: &Config, storage: DineStorage) -> Result<Self> {
        let jwt_config = JwtConfig::from_secret(config.jwt_secret.clone(), config.is_production())
            .map_err(|e| ServerError::Config(e.to_string()))?;
        Ok(Self::with_jwt(config, storage, JwtService::with_config(jwt_config)))
    }

    /// Wire the services with an explicit token service
    pub fn with_jwt(config: &Config, storage: DineStorage, jwt_service: JwtService) -> Self {
        let feed = ChangeFeed::new(config.change_feed_capacity);
        let http = HttpService::new();

        let state = Self {
            config: config.clone(),
            tables: TableSessionManager::new(
                storage.clone(),
                feed.clone(),
                config.public_base_url.clone(),
            ),
            aggregator: OrderAggregator::new(storage.clone(), feed.clone()),
            status: OrderStatusMachine::new(
                storage.clone(),
                feed.clone(),
                config.order_status_policy,
            ),
            queries: OrderQueries::new(storage.clone()),
            menu: MenuCatalog::new(storage.clone()),
            registry: ConnectionRegistry::new(),
            http: http.clone(),
            jwt_service: Arc::new(jwt_service),
            storage,
            feed,
        };

        // The router needs the finished state
        http.initialize(state.clone());
        state
    }

    /// Start the alert listener and log housekeeping
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        tasks.spawn(
            "alert_listener",
            TaskKind::Listener,
            alert_listener(self.feed.clone(), tasks.shutdown_token()),
        );

        let log_dir = self.config.log_dir().to_string_lossy().into_owned();
        let token = tasks.shutdown_token();
        tasks.spawn("log_cleanup", TaskKind::Periodic, async move {
            let mut interval = tokio::time::interval(LOG_CLEANUP_INTERVAL);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        match crate::utils::logger::cleanup_old_logs(&log_dir, LOG_RETENTION_DAYS) {
                            Ok(0) => {}
                            Ok(removed) => tracing::info!(removed, "Old log files removed"),
                            Err(e) => tracing::warn!(error = %e, "Log cleanup failed"),
                        }
                    }
                }
            }
        });

        tasks.log_summary();
        tasks
    }

    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    pub fn http_service(&self) -> &HttpService {
        &self.http
    }
}
