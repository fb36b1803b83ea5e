//! mreq-bot library
//!
//! Chat song-request bot: turns "来一首 稻香" into a numbered search list,
//! and a numeric reply into a playable song at the best available quality.
//! The binary exposes [`dispatch::Dispatcher`] over HTTP for a chat adapter.

pub mod api;
pub mod dispatch;
pub mod error;
pub mod intent;
pub mod services;
pub mod session;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use dispatch::Dispatcher;
use mreq_common::events::EventBus;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    /// Event bus for the SSE stream
    pub event_bus: EventBus,
    /// Service startup time, for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, event_bus: EventBus) -> Self {
        Self {
            dispatcher,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::dispatch_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        // Dashboards read /events from the browser
        .layer(CorsLayer::permissive())
        .with_state(state)
}
