//! Event types for the mreq event system
//!
//! Provides the shared event definitions and EventBus. Every dispatch turn
//! publishes exactly one event describing its outcome; the session sweeper
//! publishes one event per reclaiming pass.

use crate::QualityTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// mreq event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BotEvent {
    /// A search returned results and a selection session was opened
    ///
    /// Any previous session for the same conversation has been replaced.
    SessionOpened {
        session_id: Uuid,
        conversation_key: String,
        search_term: String,
        candidate_count: usize,
        expires_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// A search returned no results (no session opened)
    SearchEmpty {
        conversation_key: String,
        search_term: String,
        timestamp: DateTime<Utc>,
    },

    /// A command arrived without a search term; usage hint sent
    UsageHinted {
        conversation_key: String,
        timestamp: DateTime<Utc>,
    },

    /// A numeric reply could not be matched to a candidate
    SelectionRejected {
        conversation_key: String,
        /// NoOpenSession, Expired or IndexOutOfRange
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A selected song resolved to a playable URL
    PlaybackResolved {
        conversation_key: String,
        song_id: u64,
        requested_tier: QualityTier,
        resolved_tier: QualityTier,
        timestamp: DateTime<Utc>,
    },

    /// A selected song has no playable tier (VIP/region gated or delisted)
    PlaybackUnavailable {
        conversation_key: String,
        song_id: u64,
        timestamp: DateTime<Utc>,
    },

    /// The catalogue service failed or timed out
    ServiceFailed {
        conversation_key: String,
        /// search, song_detail or playable_url
        operation: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The periodic sweeper reclaimed expired sessions
    SessionsSwept {
        count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl BotEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            BotEvent::SessionOpened { .. } => "SessionOpened",
            BotEvent::SearchEmpty { .. } => "SearchEmpty",
            BotEvent::UsageHinted { .. } => "UsageHinted",
            BotEvent::SelectionRejected { .. } => "SelectionRejected",
            BotEvent::PlaybackResolved { .. } => "PlaybackResolved",
            BotEvent::PlaybackUnavailable { .. } => "PlaybackUnavailable",
            BotEvent::ServiceFailed { .. } => "ServiceFailed",
            BotEvent::SessionsSwept { .. } => "SessionsSwept",
        }
    }

    /// Conversation the event belongs to, if any
    pub fn conversation_key(&self) -> Option<&str> {
        match self {
            BotEvent::SessionOpened { conversation_key, .. }
            | BotEvent::SearchEmpty { conversation_key, .. }
            | BotEvent::UsageHinted { conversation_key, .. }
            | BotEvent::SelectionRejected { conversation_key, .. }
            | BotEvent::PlaybackResolved { conversation_key, .. }
            | BotEvent::PlaybackUnavailable { conversation_key, .. }
            | BotEvent::ServiceFailed { conversation_key, .. } => Some(conversation_key),
            BotEvent::SessionsSwept { .. } => None,
        }
    }
}

/// Broadcast channel for BotEvents
///
/// Cheap to clone; all clones share the same channel.
///
/// # Examples
///
/// ```
/// use mreq_common::events::{BotEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(BotEvent::SessionsSwept {
///     count: 2,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BotEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers
    ///   start dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<BotEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: BotEvent) -> Result<usize, broadcast::error::SendError<BotEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BotEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No event subscribers");
        }
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
