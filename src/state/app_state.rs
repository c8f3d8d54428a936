//! Main application state shared by handlers and background tasks

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    controller::CountdownController,
    protocol::SchedulerCommand,
    tasks::SchedulerHandle,
};

/// Everything one device needs to serve its timer page
#[derive(Debug)]
pub struct AppState {
    /// The page's countdown; every action and tick goes through this lock
    pub controller: tokio::sync::Mutex<CountdownController>,
    /// Channel pair to this device's background scheduler
    pub scheduler: SchedulerHandle,
    /// Where a notification click should take the user
    pub app_route: String,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    pub fn new(
        controller: CountdownController,
        scheduler: SchedulerHandle,
        app_route: String,
        port: u16,
        host: String,
    ) -> Self {
        Self {
            controller: tokio::sync::Mutex::new(controller),
            scheduler,
            app_route,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Remember the most recent timer action
    pub fn record_action(&self, action: &str) {
        debug!("Recording action: {}", action);
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    /// Give the background scheduler a chance to recover missed expiries
    pub fn wake_scheduler(&self) {
        self.scheduler.send(SchedulerCommand::Wake);
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
