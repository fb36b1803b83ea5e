//! # mreq Common Library
//!
//! Shared code for the mreq song-request service including:
//! - Error and result types
//! - Bootstrap configuration loading
//! - Audio quality tiers and their fallback order
//! - Event types (BotEvent enum) and EventBus
//! - Human-readable duration formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod quality;

pub use error::{Error, Result};
pub use quality::QualityTier;
