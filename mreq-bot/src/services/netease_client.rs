//! NeteaseCloudMusicApi client
//!
//! Talks to a self-hosted NeteaseCloudMusicApi-compatible service:
//! - `GET /search?keywords=..&limit=..&type=1`
//! - `GET /song/detail?ids=..`
//! - `GET /song/url/v1?id=..&level=..[&cookie=..]`

use super::catalogue::{CatalogueError, CatalogueSong, MusicCatalogue, SongDetail};
use async_trait::async_trait;
use mreq_common::human_time::millis_to_seconds;
use mreq_common::QualityTier;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("mreq-bot/", env!("CARGO_PKG_VERSION"));
const UNKNOWN_ALBUM: &str = "Unknown album";
/// `type` parameter selecting single songs in /search
const SEARCH_TYPE_SONG: &str = "1";

/// /search response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    songs: Vec<SearchSong>,
}

#[derive(Debug, Deserialize)]
struct SearchSong {
    id: u64,
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
    album: Option<Album>,
    /// Milliseconds
    #[serde(default)]
    duration: u64,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    name: Option<String>,
    #[serde(rename = "picUrl")]
    pic_url: Option<String>,
}

/// /song/detail response (abbreviated field names are the service's own)
#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    songs: Vec<DetailSong>,
}

#[derive(Debug, Deserialize)]
struct DetailSong {
    id: u64,
    name: String,
    #[serde(default)]
    ar: Vec<Artist>,
    al: Option<Album>,
    /// Milliseconds
    #[serde(default)]
    dt: u64,
}

/// /song/url/v1 response
#[derive(Debug, Deserialize)]
struct UrlResponse {
    #[serde(default)]
    data: Vec<UrlEntry>,
}

#[derive(Debug, Deserialize)]
struct UrlEntry {
    url: Option<String>,
}

fn join_artists(artists: &[Artist]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(" / ")
}

fn album_name(album: Option<&Album>) -> String {
    album
        .and_then(|a| a.name.clone())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string())
}

impl From<SearchSong> for CatalogueSong {
    fn from(song: SearchSong) -> Self {
        Self {
            song_id: song.id,
            artist: join_artists(&song.artists),
            album: album_name(song.album.as_ref()),
            duration_seconds: millis_to_seconds(song.duration),
            title: song.name,
        }
    }
}

impl From<DetailSong> for SongDetail {
    fn from(song: DetailSong) -> Self {
        Self {
            song_id: song.id,
            artist: join_artists(&song.ar),
            album: album_name(song.al.as_ref()),
            cover_url: song
                .al
                .as_ref()
                .and_then(|a| a.pic_url.clone())
                .unwrap_or_default(),
            duration_seconds: millis_to_seconds(song.dt),
            title: song.name,
        }
    }
}

/// Netease catalogue client
pub struct NeteaseClient {
    http_client: reqwest::Client,
    base_url: String,
    cookie: String,
}

impl NeteaseClient {
    /// * `base_url` - service root, trailing slashes ignored
    /// * `cookie` - login cookie for VIP tiers, empty for anonymous
    /// * `timeout` - total per-request timeout
    pub fn new(base_url: &str, cookie: &str, timeout: Duration) -> Result<Self, CatalogueError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogueError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie: cookie.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogueError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CatalogueError::Timeout
                } else {
                    CatalogueError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogueError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogueError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MusicCatalogue for NeteaseClient {
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<CatalogueSong>, CatalogueError> {
        tracing::debug!(term = %term, limit = limit, "Searching catalogue");

        let limit = limit.to_string();
        let response: SearchResponse = self
            .get_json(
                "/search",
                &[("keywords", term), ("limit", limit.as_str()), ("type", SEARCH_TYPE_SONG)],
            )
            .await?;

        let songs: Vec<CatalogueSong> = response
            .result
            .map(|r| r.songs)
            .unwrap_or_default()
            .into_iter()
            .map(CatalogueSong::from)
            .collect();

        tracing::info!(term = %term, results = songs.len(), "Catalogue search complete");
        Ok(songs)
    }

    async fn song_detail(&self, song_id: u64) -> Result<Option<SongDetail>, CatalogueError> {
        let ids = song_id.to_string();
        let response: DetailResponse = self
            .get_json("/song/detail", &[("ids", ids.as_str())])
            .await?;

        Ok(response.songs.into_iter().next().map(SongDetail::from))
    }

    async fn playable_url(
        &self,
        song_id: u64,
        tier: QualityTier,
    ) -> Result<Option<String>, CatalogueError> {
        let id = song_id.to_string();
        let mut query = vec![("id", id.as_str()), ("level", tier.level())];
        if !self.cookie.is_empty() {
            query.push(("cookie", self.cookie.as_str()));
        }

        let response: UrlResponse = self.get_json("/song/url/v1", &query).await?;

        Ok(response
            .data
            .into_iter()
            .next()
            .and_then(|entry| entry.url)
            .filter(|url| !url.trim().is_empty()))
    }
}
