//! HTTP API handlers
//!
//! A chat adapter posts every inbound message to `/dispatch` and relays the
//! reply; `/events` streams what the bot did for dashboards and debugging.

pub mod dispatch;
pub mod health;
pub mod sse;

pub use dispatch::dispatch_routes;
pub use health::health_routes;
pub use sse::event_stream;
