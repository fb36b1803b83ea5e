//! In-memory catalogue with scripted answers
//!
//! Records every call so tests can assert on what was (and was not) asked.

use async_trait::async_trait;
use mreq_bot::services::{CatalogueError, CatalogueSong, MusicCatalogue, SongDetail};
use mreq_common::QualityTier;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Term and the limit the caller asked for
    Search(String, usize),
    Detail(u64),
    Url(u64, QualityTier),
}

pub fn song(song_id: u64, title: &str) -> CatalogueSong {
    CatalogueSong {
        song_id,
        title: title.to_string(),
        artist: "周杰伦".to_string(),
        album: "叶惠美".to_string(),
        duration_seconds: 240,
    }
}

#[derive(Default)]
pub struct ScriptedCatalogue {
    results: HashMap<String, Vec<CatalogueSong>>,
    details: HashMap<u64, SongDetail>,
    urls: HashMap<(u64, QualityTier), String>,
    failing_search: bool,
    failing_urls: bool,
    ignores_limit: bool,
    search_delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search results for `term`; songs also get a matching detail entry
    pub fn with_results(mut self, term: &str, songs: Vec<CatalogueSong>) -> Self {
        for s in &songs {
            self.details.insert(
                s.song_id,
                SongDetail {
                    song_id: s.song_id,
                    title: s.title.clone(),
                    artist: s.artist.clone(),
                    album: s.album.clone(),
                    duration_seconds: s.duration_seconds,
                    cover_url: format!("https://img.example/{}.jpg", s.song_id),
                },
            );
        }
        self.results.insert(term.to_string(), songs);
        self
    }

    /// Song is playable at `tier`
    pub fn with_url(mut self, song_id: u64, tier: QualityTier) -> Self {
        self.urls.insert(
            (song_id, tier),
            format!("https://audio.example/{}/{}.mp3", song_id, tier.level()),
        );
        self
    }

    /// Drop the detail entry, as if the song was delisted after the search
    pub fn delisted(mut self, song_id: u64) -> Self {
        self.details.remove(&song_id);
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.failing_search = true;
        self
    }

    pub fn failing_urls(mut self) -> Self {
        self.failing_urls = true;
        self
    }

    /// Return every scripted result regardless of `limit`
    pub fn ignoring_limit(mut self) -> Self {
        self.ignores_limit = true;
        self
    }

    pub fn slow_search(mut self, delay: Duration) -> Self {
        self.search_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Tiers probed for `song_id`, in order
    pub fn probes(&self, song_id: u64) -> Vec<QualityTier> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Url(id, tier) if id == song_id => Some(tier),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MusicCatalogue for ScriptedCatalogue {
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<CatalogueSong>, CatalogueError> {
        self.record(Call::Search(term.to_string(), limit));

        if let Some(delay) = self.search_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_search {
            return Err(CatalogueError::Network("connection refused".to_string()));
        }

        let songs = self.results.get(term).cloned().unwrap_or_default();
        if self.ignores_limit {
            return Ok(songs);
        }
        Ok(songs.into_iter().take(limit).collect())
    }

    async fn song_detail(&self, song_id: u64) -> Result<Option<SongDetail>, CatalogueError> {
        self.record(Call::Detail(song_id));
        Ok(self.details.get(&song_id).cloned())
    }

    async fn playable_url(
        &self,
        song_id: u64,
        tier: QualityTier,
    ) -> Result<Option<String>, CatalogueError> {
        self.record(Call::Url(song_id, tier));

        if self.failing_urls {
            return Err(CatalogueError::Api(502, "bad gateway".to_string()));
        }
        Ok(self.urls.get(&(song_id, tier)).cloned())
    }
}
