//! Quality fallback resolution
//!
//! Given a song and a requested tier, probes the catalogue tier by tier,
//! highest first, and accepts the first tier that yields a non-empty URL.
//! VIP- or region-gated songs commonly reject the top tiers but accept a
//! lower one.
//!
//! Probe outcomes:
//! - URL → accepted, later tiers are never probed
//! - empty / timeout → tier unavailable, step down
//! - any other catalogue error → abort with [`ResolveError::Service`]
//!
//! Resolution is stateless and may be retried freely.

use super::catalogue::{bounded, CatalogueError, MusicCatalogue};
use mreq_common::QualityTier;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Playable URL at a concrete tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAudio {
    pub song_id: u64,
    pub requested_tier: QualityTier,
    /// Always `<= requested_tier`
    pub tier: QualityTier,
    pub url: String,
}

/// Resolution failures
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every tier in the fallback chain was probed without a usable URL
    #[error("song {song_id} is not playable at or below {requested_tier}")]
    Unavailable {
        song_id: u64,
        requested_tier: QualityTier,
    },

    /// The catalogue failed while probing `tier`
    #[error("catalogue error while probing {tier}: {source}")]
    Service {
        tier: QualityTier,
        #[source]
        source: CatalogueError,
    },
}

/// Steps down through [`QualityTier::fallback_chain`] until a URL is found
pub struct QualityResolver {
    catalogue: Arc<dyn MusicCatalogue>,
    probe_timeout: Duration,
}

impl QualityResolver {
    pub fn new(catalogue: Arc<dyn MusicCatalogue>, probe_timeout: Duration) -> Self {
        Self {
            catalogue,
            probe_timeout,
        }
    }

    pub async fn resolve(
        &self,
        song_id: u64,
        requested_tier: QualityTier,
    ) -> Result<ResolvedAudio, ResolveError> {
        for tier in requested_tier.fallback_chain() {
            let probe = bounded(
                self.probe_timeout,
                self.catalogue.playable_url(song_id, tier),
            )
            .await;

            match probe {
                Ok(Some(url)) if !url.trim().is_empty() => {
                    info!(
                        song_id = song_id,
                        requested = %requested_tier,
                        resolved = %tier,
                        "Resolved playable URL"
                    );
                    return Ok(ResolvedAudio {
                        song_id,
                        requested_tier,
                        tier,
                        url,
                    });
                }
                Ok(_) => {
                    debug!(song_id = song_id, tier = %tier, "Not available at tier");
                }
                Err(CatalogueError::Timeout) => {
                    warn!(song_id = song_id, tier = %tier, "Tier probe timed out, stepping down");
                }
                Err(source) => {
                    warn!(song_id = song_id, tier = %tier, error = %source, "Tier probe failed");
                    return Err(ResolveError::Service { tier, source });
                }
            }
        }

        info!(song_id = song_id, requested = %requested_tier, "No playable tier");
        Err(ResolveError::Unavailable {
            song_id,
            requested_tier,
        })
    }
}
