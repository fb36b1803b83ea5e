//! Per-conversation selection sessions
//!
//! A session holds the numbered search results shown to one conversation and
//! waits for a numeric reply. State machine per conversation key:
//!
//! ```text
//! NoSession ──open──► HasOpenSession ──valid index──► NoSession (consumed)
//!                        │  ▲   │
//!                        │  └───┘ out-of-range index (session kept)
//!                        ├──open──► HasOpenSession (replaced, last search wins)
//!                        └──access after expiry──► NoSession (expired)
//! ```
//!
//! Expiry is enforced lazily on access. The optional sweeper only reclaims
//! memory; correctness never depends on it.
//!
//! All reads and writes go through one mutex, so a superseding search and a
//! concurrent selection can never interleave inside a read-modify-write.

use crate::services::catalogue::CatalogueSong;
use chrono::{DateTime, Duration, Utc};
use mreq_common::events::{BotEvent, EventBus};
use mreq_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// One numbered search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    /// 1-based, stable within one search
    pub index: usize,
    pub song_id: u64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_seconds: u64,
}

impl SearchCandidate {
    /// Number search results `1..=N` in catalogue order
    pub fn from_songs(songs: Vec<CatalogueSong>) -> Vec<SearchCandidate> {
        songs
            .into_iter()
            .enumerate()
            .map(|(i, song)| SearchCandidate {
                index: i + 1,
                song_id: song.song_id,
                title: song.title,
                artist: song.artist,
                album: song.album,
                duration_seconds: song.duration_seconds,
            })
            .collect()
    }
}

/// Open selection session for one conversation
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: Uuid,
    pub conversation_key: String,
    pub search_term: String,
    /// Never empty
    pub candidates: Vec<SearchCandidate>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Candidate at 1-based `index`
    pub fn candidate(&self, index: usize) -> Option<&SearchCandidate> {
        index
            .checked_sub(1)
            .and_then(|i| self.candidates.get(i))
    }
}

/// Why a numeric reply could not be matched
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("no open session")]
    NoOpenSession,

    #[error("session expired")]
    Expired,

    #[error("index {index} is outside 1..={max}")]
    IndexOutOfRange { index: usize, max: usize },
}

impl SelectionError {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionError::NoOpenSession => "NoOpenSession",
            SelectionError::Expired => "Expired",
            SelectionError::IndexOutOfRange { .. } => "IndexOutOfRange",
        }
    }
}

/// Keyed store of open sessions, at most one per conversation key
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create or replace the session for `conversation_key`
    pub async fn open_session(
        &self,
        conversation_key: &str,
        search_term: &str,
        candidates: Vec<SearchCandidate>,
    ) -> Result<Session> {
        self.open_session_at(conversation_key, search_term, candidates, Utc::now())
            .await
    }

    /// [`open_session`](Self::open_session) with an explicit clock
    ///
    /// Rejects an empty list and any list not numbered `1..=N` in order.
    pub async fn open_session_at(
        &self,
        conversation_key: &str,
        search_term: &str,
        candidates: Vec<SearchCandidate>,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        if candidates.is_empty() {
            return Err(Error::InvalidInput(
                "cannot open a session without candidates".to_string(),
            ));
        }
        if candidates.iter().enumerate().any(|(i, c)| c.index != i + 1) {
            return Err(Error::InvalidInput(
                "candidates must be numbered 1..=N in order".to_string(),
            ));
        }

        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            Error::InvalidInput(format!("session expiry out of range for ttl {}", self.ttl))
        })?;

        let session = Session {
            session_id: Uuid::new_v4(),
            conversation_key: conversation_key.to_string(),
            search_term: search_term.to_string(),
            candidates,
            created_at: now,
            expires_at,
        };

        let previous = self
            .sessions
            .lock()
            .await
            .insert(conversation_key.to_string(), session.clone());

        if let Some(previous) = previous {
            debug!(
                conversation_key = %conversation_key,
                replaced = %previous.session_id,
                "Superseded open session"
            );
        }
        debug!(
            conversation_key = %conversation_key,
            session_id = %session.session_id,
            candidates = session.candidates.len(),
            "Opened session"
        );

        Ok(session)
    }

    /// Take the candidate at `index`, consuming the session on success
    pub async fn resolve_selection(
        &self,
        conversation_key: &str,
        index: usize,
    ) -> std::result::Result<SearchCandidate, SelectionError> {
        self.resolve_selection_at(conversation_key, index, Utc::now())
            .await
    }

    /// [`resolve_selection`](Self::resolve_selection) with an explicit clock
    ///
    /// - no session → `NoOpenSession`
    /// - expired → `Expired`, session deleted
    /// - out of range → `IndexOutOfRange`, session kept for a retry
    /// - otherwise the candidate, session deleted
    pub async fn resolve_selection_at(
        &self,
        conversation_key: &str,
        index: usize,
        now: DateTime<Utc>,
    ) -> std::result::Result<SearchCandidate, SelectionError> {
        let mut sessions = self.sessions.lock().await;

        let Some(session) = sessions.remove(conversation_key) else {
            return Err(SelectionError::NoOpenSession);
        };

        if session.is_expired_at(now) {
            debug!(
                conversation_key = %conversation_key,
                session_id = %session.session_id,
                "Session expired"
            );
            return Err(SelectionError::Expired);
        }

        match session.candidate(index).cloned() {
            Some(candidate) => {
                debug!(
                    conversation_key = %conversation_key,
                    session_id = %session.session_id,
                    index = index,
                    song_id = candidate.song_id,
                    "Session consumed"
                );
                Ok(candidate)
            }
            None => {
                let max = session.candidates.len();
                sessions.insert(conversation_key.to_string(), session);
                Err(SelectionError::IndexOutOfRange { index, max })
            }
        }
    }

    /// True while an entry exists for the key, including an expired entry
    /// that has not been accessed or swept yet
    pub async fn has_open_session(&self, conversation_key: &str) -> bool {
        self.sessions.lock().await.contains_key(conversation_key)
    }

    /// Remove every expired session; returns how many were removed
    pub async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now()).await
    }

    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Spawn the periodic sweeper. Abort the returned handle to stop it.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: std::time::Duration,
        event_bus: EventBus,
    ) -> JoinHandle<()> {
        info!("Session sweeper started (every {:?})", interval);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let count = self.sweep_expired().await;
                if count > 0 {
                    info!("Swept {} expired session(s)", count);
                    event_bus.emit_lossy(BotEvent::SessionsSwept {
                        count,
                        timestamp: Utc::now(),
                    });
                }
            }
        })
    }
}
