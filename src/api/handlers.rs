//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use tracing::{info, warn};

use crate::state::AppState;
use super::responses::{
    AckResponse, AdjustRequest, NotificationClickResponse, OverlayRequest, RestSettingRequest,
    RestSettingResponse, StartRequest, StatusResponse, TimerResponse,
};

/// Handle GET /timer - Current countdown. Loading the page also wakes the scheduler.
pub async fn timer_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    state.wake_scheduler();

    let controller = state.controller.lock().await;
    Json(TimerResponse::current("Current rest timer", controller.snapshot()))
}

/// Handle POST /timer/start - Start or restart the countdown
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<TimerResponse>, StatusCode> {
    let mut controller = state.controller.lock().await;
    let duration = body
        .and_then(|Json(request)| request.duration)
        .unwrap_or_else(|| controller.default_duration());

    match controller.start(duration).await {
        Ok(_) => {
            let snapshot = controller.snapshot();
            drop(controller);
            state.record_action("start");
            info!("Start endpoint called - rest timer running for {}s", duration);
            Ok(Json(TimerResponse::running(
                format!("Rest timer started for {}s", duration),
                snapshot,
            )))
        }
        Err(e) => {
            warn!("Rejected rest timer start: {}", e);
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

/// Handle POST /timer/cancel - Stop the countdown (no-op when idle)
pub async fn cancel_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    let mut controller = state.controller.lock().await;
    controller.cancel().await;
    let snapshot = controller.snapshot();
    drop(controller);

    state.record_action("cancel");
    Json(TimerResponse::idle("Rest timer cancelled", snapshot))
}

/// Handle POST /timer/pause - Freeze the countdown
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    let mut controller = state.controller.lock().await;
    controller.pause().await;
    let snapshot = controller.snapshot();
    drop(controller);

    state.record_action("pause");
    Json(TimerResponse::current("Rest timer paused", snapshot))
}

/// Handle POST /timer/resume - Continue a paused countdown
pub async fn resume_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimerResponse>, StatusCode> {
    let mut controller = state.controller.lock().await;
    match controller.resume().await {
        Ok(_) => {
            let snapshot = controller.snapshot();
            drop(controller);
            state.record_action("resume");
            Ok(Json(TimerResponse::current("Rest timer resumed", snapshot)))
        }
        Err(e) => {
            warn!("Rejected rest timer resume: {}", e);
            Err(StatusCode::CONFLICT)
        }
    }
}

/// Handle POST /timer/adjust - Add or remove seconds
pub async fn adjust_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdjustRequest>,
) -> Json<TimerResponse> {
    let mut controller = state.controller.lock().await;
    controller.adjust(request.seconds).await;
    let snapshot = controller.snapshot();
    drop(controller);

    state.record_action("adjust");
    Json(TimerResponse::current(
        format!("Rest timer adjusted by {}s", request.seconds),
        snapshot,
    ))
}

/// Handle POST /timer/overlay - Show or hide the timer overlay
pub async fn overlay_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OverlayRequest>,
) -> Json<TimerResponse> {
    let mut controller = state.controller.lock().await;
    controller.set_overlay(request.open);
    Json(TimerResponse::current(
        if request.open { "Timer overlay opened" } else { "Timer overlay closed" },
        controller.snapshot(),
    ))
}

/// Handle POST /timer/refresh - Re-read the shared store and reconcile
pub async fn refresh_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    let mut controller = state.controller.lock().await;
    controller.refresh().await;
    Json(TimerResponse::current("Rest timer reconciled", controller.snapshot()))
}

/// Handle PUT /settings/rest - Change the default rest duration
pub async fn rest_setting_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RestSettingRequest>,
) -> Result<Json<RestSettingResponse>, StatusCode> {
    let mut controller = state.controller.lock().await;
    match controller.set_default_duration(request.seconds) {
        Ok(seconds) => {
            drop(controller);
            state.record_action("rest-setting");
            Ok(Json(RestSettingResponse {
                seconds,
                timestamp: Utc::now(),
            }))
        }
        Err(e) => {
            warn!("Rejected rest duration setting: {}", e);
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

/// Handle POST /wake - Platform wake trigger for missed-expiry recovery
pub async fn wake_handler(State(state): State<Arc<AppState>>) -> Json<AckResponse> {
    state.wake_scheduler();
    Json(AckResponse::ok())
}

/// Handle POST /notification/click - The scheduler is done; tell the UI where to go
pub async fn notification_click_handler(
    State(state): State<Arc<AppState>>,
) -> Json<NotificationClickResponse> {
    Json(NotificationClickResponse {
        route: state.app_route.clone(),
    })
}

/// Handle GET /status - Return current service status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (household, timer) = {
        let controller = state.controller.lock().await;
        (controller.household_id().to_string(), controller.snapshot())
    };
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        household,
        timer,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<AckResponse> {
    Json(AckResponse::ok())
}
