//! Test Helper Utilities
//!
//! Shared utilities for testing mreq-bot

#![allow(dead_code)]

pub mod fake_netease;
pub mod scripted_catalogue;

pub use scripted_catalogue::{song, ScriptedCatalogue};

use mreq_bot::dispatch::Dispatcher;
use mreq_bot::session::SessionManager;
use mreq_common::config::BotConfig;
use mreq_common::events::EventBus;
use std::sync::Arc;

/// Dispatcher over `catalogue` with default config, plus its session store
/// and event bus for assertions
pub fn create_test_dispatcher(
    catalogue: Arc<ScriptedCatalogue>,
) -> (Dispatcher, Arc<SessionManager>, EventBus) {
    create_test_dispatcher_with(catalogue, BotConfig::default())
}

pub fn create_test_dispatcher_with(
    catalogue: Arc<ScriptedCatalogue>,
    config: BotConfig,
) -> (Dispatcher, Arc<SessionManager>, EventBus) {
    let sessions = Arc::new(SessionManager::new(config.session_ttl()));
    let event_bus = EventBus::new(100);
    let dispatcher = Dispatcher::new(&config, catalogue, sessions.clone(), event_bus.clone())
        .expect("Failed to build dispatcher");
    (dispatcher, sessions, event_bus)
}
