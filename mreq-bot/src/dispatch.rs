//! Dispatch orchestration
//!
//! Entry point for one inbound chat message. Parses the text, drives the
//! search or selection path, and returns exactly one [`OutboundPayload`]
//! (or `None` when the message is not for this bot).
//!
//! Every branch is terminal for the turn: no partial output and no work left
//! running after `handle` returns.

use crate::intent::{IntentParser, ParsedInput, QueryIntent, SelectionInput};
use crate::services::catalogue::{bounded, MusicCatalogue};
use crate::services::quality_resolver::{QualityResolver, ResolveError};
use crate::session::{SearchCandidate, SelectionError, SessionManager};
use chrono::Utc;
use mreq_common::config::BotConfig;
use mreq_common::events::{BotEvent, EventBus};
use mreq_common::human_time::format_track_duration;
use mreq_common::{QualityTier, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Why a numeric reply was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum InvalidSelectionReason {
    NoOpenSession,
    Expired,
    IndexOutOfRange { index: usize, max: usize },
}

impl From<SelectionError> for InvalidSelectionReason {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::NoOpenSession => InvalidSelectionReason::NoOpenSession,
            SelectionError::Expired => InvalidSelectionReason::Expired,
            SelectionError::IndexOutOfRange { index, max } => {
                InvalidSelectionReason::IndexOutOfRange { index, max }
            }
        }
    }
}

/// Metadata card plus the audio to send as a voice message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackCard {
    /// Position the user picked from the list
    pub index: usize,
    pub song_id: u64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_seconds: u64,
    pub cover_url: String,
    pub audio_url: String,
    pub tier: QualityTier,
}

/// Reply for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundPayload {
    /// Numbered list awaiting a numeric reply
    SelectionPrompt {
        search_term: String,
        candidates: Vec<SearchCandidate>,
        expires_in_seconds: i64,
    },
    NoResults {
        search_term: String,
    },
    InvalidSelection {
        reason: InvalidSelectionReason,
    },
    PlaybackCard(PlaybackCard),
    /// Song exists but no tier yields a URL (content gating, or delisted)
    Unavailable {
        song_id: u64,
        title: String,
    },
    /// Catalogue unreachable or erroring
    ServiceFailure,
    /// Command typed without a search term
    Usage {
        example: String,
    },
}

impl OutboundPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundPayload::SelectionPrompt { .. } => "selection_prompt",
            OutboundPayload::NoResults { .. } => "no_results",
            OutboundPayload::InvalidSelection { .. } => "invalid_selection",
            OutboundPayload::PlaybackCard(_) => "playback_card",
            OutboundPayload::Unavailable { .. } => "unavailable",
            OutboundPayload::ServiceFailure => "service_failure",
            OutboundPayload::Usage { .. } => "usage",
        }
    }

    /// User-facing message text
    pub fn to_text(&self) -> String {
        match self {
            OutboundPayload::SelectionPrompt {
                candidates,
                expires_in_seconds,
                ..
            } => {
                let mut text = format!(
                    "找到 {} 首歌曲，请在 {} 秒内回复序号选择：",
                    candidates.len(),
                    expires_in_seconds
                );
                for c in candidates {
                    let _ = write!(
                        text,
                        "\n{}. {} - {} 《{}》 [{}]",
                        c.index,
                        c.title,
                        c.artist,
                        c.album,
                        format_track_duration(c.duration_seconds)
                    );
                }
                text
            }
            OutboundPayload::NoResults { search_term } => {
                format!("没有找到与「{}」相关的歌曲。", search_term)
            }
            OutboundPayload::InvalidSelection { reason } => match reason {
                InvalidSelectionReason::NoOpenSession => {
                    "当前没有待选择的搜索结果，请先点歌。".to_string()
                }
                InvalidSelectionReason::Expired => {
                    "搜索结果已过期，请重新点歌。".to_string()
                }
                InvalidSelectionReason::IndexOutOfRange { max, .. } => {
                    format!("序号无效，请回复 1 到 {} 之间的数字。", max)
                }
            },
            OutboundPayload::PlaybackCard(card) => format!(
                "正在播放第 {} 首\n歌名：{}\n歌手：{}\n专辑：{}\n时长：{}\n音质：{}",
                card.index,
                card.title,
                card.artist,
                card.album,
                format_track_duration(card.duration_seconds),
                card.tier
            ),
            OutboundPayload::Unavailable { title, .. } => {
                format!("「{}」可能需要会员或暂无版权，目前无法播放。", title)
            }
            OutboundPayload::ServiceFailure => {
                "音乐服务暂时无法连接，请稍后再试。".to_string()
            }
            OutboundPayload::Usage { example } => {
                format!("请告诉我想听的歌，例如：{}", example)
            }
        }
    }
}

/// Wires the intent parser, session store, catalogue and quality resolver
pub struct Dispatcher {
    parser: IntentParser,
    sessions: Arc<SessionManager>,
    catalogue: Arc<dyn MusicCatalogue>,
    resolver: QualityResolver,
    event_bus: EventBus,
    search_limit: usize,
    default_quality: QualityTier,
    request_timeout: Duration,
    usage_example: String,
}

impl Dispatcher {
    pub fn new(
        config: &BotConfig,
        catalogue: Arc<dyn MusicCatalogue>,
        sessions: Arc<SessionManager>,
        event_bus: EventBus,
    ) -> Result<Self> {
        let usage_example = format!(
            "{}{} 晴天",
            config.command_prefix,
            config.command_names.first().map_or("", |c| c.as_str())
        );

        Ok(Self {
            parser: IntentParser::new(config)?,
            resolver: QualityResolver::new(catalogue.clone(), config.request_timeout()),
            sessions,
            catalogue,
            event_bus,
            search_limit: config.search_result_limit,
            default_quality: config.default_quality,
            request_timeout: config.request_timeout(),
            usage_example,
        })
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Handle one inbound message; `None` means "not for me"
    pub async fn handle(&self, conversation_key: &str, raw_text: &str) -> Option<OutboundPayload> {
        let has_open_session = self.sessions.has_open_session(conversation_key).await;

        let payload = match self.parser.parse(raw_text, has_open_session) {
            ParsedInput::Query(intent) => self.handle_query(conversation_key, intent).await,
            ParsedInput::Selection(selection) => {
                self.handle_selection(conversation_key, selection).await
            }
            ParsedInput::EmptyCommand => {
                self.event_bus.emit_lossy(BotEvent::UsageHinted {
                    conversation_key: conversation_key.to_string(),
                    timestamp: Utc::now(),
                });
                OutboundPayload::Usage {
                    example: self.usage_example.clone(),
                }
            }
            ParsedInput::NoMatch => return None,
        };

        info!(
            conversation_key = %conversation_key,
            kind = payload.kind(),
            "Dispatched"
        );
        Some(payload)
    }

    async fn handle_query(&self, conversation_key: &str, intent: QueryIntent) -> OutboundPayload {
        let term = intent.search_term;
        info!(conversation_key = %conversation_key, term = %term, "Song search");

        let songs = match bounded(
            self.request_timeout,
            self.catalogue.search(&term, self.search_limit),
        )
        .await
        {
            Ok(songs) => songs,
            Err(e) => {
                warn!(
                    conversation_key = %conversation_key,
                    term = %term,
                    error = %e,
                    "Search failed"
                );
                self.service_failed(conversation_key, "search", &e.to_string());
                return OutboundPayload::ServiceFailure;
            }
        };

        if songs.is_empty() {
            self.event_bus.emit_lossy(BotEvent::SearchEmpty {
                conversation_key: conversation_key.to_string(),
                search_term: term.clone(),
                timestamp: Utc::now(),
            });
            return OutboundPayload::NoResults { search_term: term };
        }

        // The catalogue may ignore the limit
        let songs = songs.into_iter().take(self.search_limit).collect();
        let candidates = SearchCandidate::from_songs(songs);

        let session = match self
            .sessions
            .open_session(conversation_key, &term, candidates)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                warn!(conversation_key = %conversation_key, error = %e, "Could not open session");
                self.service_failed(conversation_key, "search", &e.to_string());
                return OutboundPayload::ServiceFailure;
            }
        };

        self.event_bus.emit_lossy(BotEvent::SessionOpened {
            session_id: session.session_id,
            conversation_key: conversation_key.to_string(),
            search_term: term.clone(),
            candidate_count: session.candidates.len(),
            expires_at: session.expires_at,
            timestamp: Utc::now(),
        });

        OutboundPayload::SelectionPrompt {
            search_term: term,
            expires_in_seconds: self.sessions.ttl().num_seconds(),
            candidates: session.candidates,
        }
    }

    async fn handle_selection(
        &self,
        conversation_key: &str,
        selection: SelectionInput,
    ) -> OutboundPayload {
        let candidate = match self
            .sessions
            .resolve_selection(conversation_key, selection.index)
            .await
        {
            Ok(candidate) => candidate,
            Err(e) => {
                info!(conversation_key = %conversation_key, reason = %e, "Selection rejected");
                self.event_bus.emit_lossy(BotEvent::SelectionRejected {
                    conversation_key: conversation_key.to_string(),
                    reason: e.name().to_string(),
                    timestamp: Utc::now(),
                });
                return OutboundPayload::InvalidSelection { reason: e.into() };
            }
        };

        // From here on the candidate is captured; session expiry no longer matters
        let song_id = candidate.song_id;

        let detail = match bounded(self.request_timeout, self.catalogue.song_detail(song_id))
            .await
        {
            Ok(Some(detail)) => detail,
            Ok(None) => {
                info!(conversation_key = %conversation_key, song_id = song_id, "Song delisted");
                return self.unavailable(conversation_key, &candidate);
            }
            Err(e) => {
                warn!(song_id = song_id, error = %e, "Song detail failed");
                self.service_failed(conversation_key, "song_detail", &e.to_string());
                return OutboundPayload::ServiceFailure;
            }
        };

        match self.resolver.resolve(song_id, self.default_quality).await {
            Ok(audio) => {
                self.event_bus.emit_lossy(BotEvent::PlaybackResolved {
                    conversation_key: conversation_key.to_string(),
                    song_id,
                    requested_tier: audio.requested_tier,
                    resolved_tier: audio.tier,
                    timestamp: Utc::now(),
                });

                OutboundPayload::PlaybackCard(PlaybackCard {
                    index: candidate.index,
                    song_id,
                    title: detail.title,
                    artist: detail.artist,
                    album: detail.album,
                    duration_seconds: detail.duration_seconds,
                    cover_url: detail.cover_url,
                    audio_url: audio.url,
                    tier: audio.tier,
                })
            }
            Err(ResolveError::Unavailable { .. }) => self.unavailable(conversation_key, &candidate),
            Err(e @ ResolveError::Service { .. }) => {
                self.service_failed(conversation_key, "playable_url", &e.to_string());
                OutboundPayload::ServiceFailure
            }
        }
    }

    fn unavailable(&self, conversation_key: &str, candidate: &SearchCandidate) -> OutboundPayload {
        self.event_bus.emit_lossy(BotEvent::PlaybackUnavailable {
            conversation_key: conversation_key.to_string(),
            song_id: candidate.song_id,
            timestamp: Utc::now(),
        });
        OutboundPayload::Unavailable {
            song_id: candidate.song_id,
            title: candidate.title.clone(),
        }
    }

    fn service_failed(&self, conversation_key: &str, operation: &str, message: &str) {
        self.event_bus.emit_lossy(BotEvent::ServiceFailed {
            conversation_key: conversation_key.to_string(),
            operation: operation.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(index: usize) -> SearchCandidate {
        SearchCandidate {
            index,
            song_id: 186016,
            title: "晴天".to_string(),
            artist: "周杰伦".to_string(),
            album: "叶惠美".to_string(),
            duration_seconds: 269,
        }
    }

    #[test]
    fn test_selection_prompt_text_lists_candidates() {
        let payload = OutboundPayload::SelectionPrompt {
            search_term: "晴天".to_string(),
            candidates: vec![candidate(1), candidate(2)],
            expires_in_seconds: 60,
        };

        let text = payload.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "1. 晴天 - 周杰伦 《叶惠美》 [4:29]");
        assert!(lines[2].starts_with("2. "));
    }

    #[test]
    fn test_out_of_range_text_names_bound() {
        let payload = OutboundPayload::InvalidSelection {
            reason: InvalidSelectionReason::IndexOutOfRange { index: 9, max: 5 },
        };
        assert!(payload.to_text().contains("1 到 5"));
    }

    #[test]
    fn test_card_text_shows_tier() {
        let payload = OutboundPayload::PlaybackCard(PlaybackCard {
            index: 1,
            song_id: 186016,
            title: "晴天".to_string(),
            artist: "周杰伦".to_string(),
            album: "叶惠美".to_string(),
            duration_seconds: 269,
            cover_url: String::new(),
            audio_url: "http://m/1.mp3".to_string(),
            tier: QualityTier::Standard,
        });
        assert!(payload.to_text().contains("音质：Standard"));
    }

    #[test]
    fn test_payload_serialization_tags() {
        let json = serde_json::to_value(OutboundPayload::InvalidSelection {
            reason: InvalidSelectionReason::Expired,
        })
        .unwrap();
        assert_eq!(json["kind"], "invalid_selection");
        assert_eq!(json["reason"]["type"], "Expired");

        let json = serde_json::to_value(OutboundPayload::ServiceFailure).unwrap();
        assert_eq!(json["kind"], "service_failure");
    }

    #[test]
    fn test_selection_error_mapping() {
        assert_eq!(
            InvalidSelectionReason::from(SelectionError::IndexOutOfRange { index: 7, max: 3 }),
            InvalidSelectionReason::IndexOutOfRange { index: 7, max: 3 }
        );
    }
}
