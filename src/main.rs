//! Rest Timer - one device's countdown page and background scheduler
//!
//! This is the main entry point for the rest-timer daemon.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use rest_timer::{
    api::create_router,
    clock::{SharedClock, SystemClock},
    config::Config,
    controller::CountdownController,
    services::{Chime, CommandNotifier, LogNotifier, Notifier, NullChime, TerminalBell},
    state::AppState,
    storage::{CacheEntry, JsonFileKv, SharedExpiry, SharedExpiryStore, TimerCache},
    tasks::{
        countdown_ticker_task, spawn_background_scheduler, store_refresh_task,
        wake_up_recovery_task,
    },
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("rest_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting rest-timer v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, household={}, rest={}s, max_interval={}s",
          config.host, config.port, config.household, config.rest_seconds, config.max_interval_secs);

    let clock: SharedClock = Arc::new(SystemClock);

    let cache = match &config.cache_file {
        Some(path) => {
            info!("Timer cache: {}", path.display());
            TimerCache::new(Arc::new(JsonFileKv::<CacheEntry>::new(path)))
        }
        None => TimerCache::in_memory(),
    };
    let store = match &config.shared_store_file {
        Some(path) => {
            info!("Shared expiry store: {}", path.display());
            SharedExpiryStore::new(Arc::new(JsonFileKv::<SharedExpiry>::new(path)))
        }
        None => SharedExpiryStore::in_memory(),
    };

    let notifier: Arc<dyn Notifier> = match &config.notify_command {
        Some(program) => Arc::new(CommandNotifier::new(program.clone())),
        None => Arc::new(LogNotifier),
    };
    let chime: Arc<dyn Chime> = if config.bell {
        Arc::new(TerminalBell)
    } else {
        Arc::new(NullChime)
    };

    // The scheduler owns its own task; everything else talks to it by message
    let (scheduler, _scheduler_task) = spawn_background_scheduler(
        cache,
        Arc::clone(&notifier),
        Arc::clone(&clock),
        config.max_interval(),
    );

    let mut controller = CountdownController::new(
        config.household.clone(),
        config.rest_seconds,
        clock,
        store,
        scheduler.clone(),
    )
    .with_signals(chime, notifier);

    // Pick up a timer armed on another device or before a restart
    let initial = controller.refresh().await;
    info!("Initial timer state: active={}, time_left={}s", initial.active, initial.time_left);

    let state = Arc::new(AppState::new(
        controller,
        scheduler,
        config.app_route.clone(),
        config.port,
        config.host.clone(),
    ));

    tokio::spawn(countdown_ticker_task(Arc::clone(&state)));
    tokio::spawn(wake_up_recovery_task(Arc::clone(&state), config.wake_interval()));
    tokio::spawn(store_refresh_task(Arc::clone(&state), config.refresh_interval()));

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /timer               - Current countdown (wakes the scheduler)");
    info!("  POST /timer/start         - Start or restart the countdown");
    info!("  POST /timer/cancel        - Cancel the countdown");
    info!("  POST /timer/pause         - Pause the countdown");
    info!("  POST /timer/resume        - Resume a paused countdown");
    info!("  POST /timer/adjust        - Add or remove seconds");
    info!("  POST /timer/overlay       - Show or hide the overlay");
    info!("  POST /timer/refresh       - Reconcile with the shared store");
    info!("  PUT  /settings/rest       - Set the default rest duration");
    info!("  POST /wake                - Wake the background scheduler");
    info!("  POST /notification/click  - Route to focus after a notification click");
    info!("  GET  /status              - Service status");
    info!("  GET  /health              - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
