//! HTTP API module
//!
//! The timer page's surface: every countdown action plus the wake and
//! notification-click hooks.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer", get(timer_handler))
        .route("/timer/start", post(start_handler))
        .route("/timer/cancel", post(cancel_handler))
        .route("/timer/pause", post(pause_handler))
        .route("/timer/resume", post(resume_handler))
        .route("/timer/adjust", post(adjust_handler))
        .route("/timer/overlay", post(overlay_handler))
        .route("/timer/refresh", post(refresh_handler))
        .route("/settings/rest", put(rest_setting_handler))
        .route("/wake", post(wake_handler))
        .route("/notification/click", post(notification_click_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
