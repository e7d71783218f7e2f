//! Dine Server - QR table ordering backend
//!
//! Diners scan a table's QR code, build a cart on their phone and submit
//! it; staff follow orders and waiter calls live and move orders through
//! their statuses until payment closes the table session.
//!
//! # Modules
//!
//! ```text
//! dine-server/src/
//! ├── storage.rs     # redb store, change log, sequence
//! ├── tables/        # Table Session Manager (sole writer of table status)
//! ├── orders/        # Order Aggregator, Order Status Machine, queries
//! ├── menu/          # menu catalog, soft delete
//! ├── realtime/      # change feed, catch-up, subscriptions, alerts
//! ├── auth/          # JWT validation, role lookup, route guards
//! ├── api/           # HTTP and WebSocket handlers
//! ├── services/      # router, serving, in-process dispatch
//! ├── core/          # config, state, server, background tasks
//! └── utils/         # logging, validation helpers
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod menu;
pub mod orders;
pub mod realtime;
pub mod services;
pub mod storage;
pub mod tables;
pub mod utils;

// Re-exports
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use menu::MenuCatalog;
pub use orders::{OrderAggregator, OrderQueries, OrderStatusMachine, StatusPolicy};
pub use realtime::ChangeFeed;
pub use services::HttpService;
pub use storage::DineStorage;
pub use tables::TableSessionManager;
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Security event log; accepts tracing field syntax (`uri = %uri`)
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($fields:tt)*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($fields)*
        );
    };
}

/// Load `.env`, prepare the work directory and start logging
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    config.ensure_work_dir_structure()?;
    let log_dir = config.log_dir();
    init_logger_with_file(Some(&config.log_level), log_dir.to_str());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____  _
   / __ \(_)___  ___
  / / / / / __ \/ _ \
 / /_/ / / / / /  __/
/_____/_/_/ /_/\___/
    "#
    );
}
