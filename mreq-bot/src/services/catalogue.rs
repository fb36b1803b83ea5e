//! Music catalogue abstraction
//!
//! The catalogue is an external service exposing search, song detail and
//! playable-URL lookups. Implementations must be safe to share and call
//! concurrently; no coordination is done on their behalf.

use async_trait::async_trait;
use mreq_common::QualityTier;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Catalogue client errors
#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl CatalogueError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CatalogueError::Timeout)
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueSong {
    pub song_id: u64,
    pub title: String,
    /// Artist names joined with " / "
    pub artist: String,
    pub album: String,
    pub duration_seconds: u64,
}

/// Metadata used to populate the playback card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongDetail {
    pub song_id: u64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_seconds: u64,
    pub cover_url: String,
}

/// External music catalogue
#[async_trait]
pub trait MusicCatalogue: Send + Sync {
    /// Search songs by keyword, at most `limit` results, in catalogue order
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<CatalogueSong>, CatalogueError>;

    /// Song detail; `Ok(None)` when the song no longer exists
    async fn song_detail(&self, song_id: u64) -> Result<Option<SongDetail>, CatalogueError>;

    /// Playable URL at exactly `tier`; `Ok(None)` when the song is not
    /// available at that tier (not an error)
    async fn playable_url(
        &self,
        song_id: u64,
        tier: QualityTier,
    ) -> Result<Option<String>, CatalogueError>;
}

/// Run a catalogue call with an upper time bound.
///
/// Elapsed calls become [`CatalogueError::Timeout`].
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, CatalogueError>
where
    F: Future<Output = Result<T, CatalogueError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(CatalogueError::Timeout))
}
