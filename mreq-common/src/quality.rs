//! Audio quality tiers
//!
//! Tiers form a total order with no ties:
//! `Lossless > High > Standard > Low`.
//!
//! Each tier maps onto one catalogue `level` parameter. The fallback chain for a
//! requested tier is every tier at or below it, highest first.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete audio bitrate class
///
/// Variant declaration order is ascending so the derived `Ord` matches the
/// quality order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QualityTier {
    /// 128 kbps
    Low,
    /// 192 kbps
    Standard,
    /// 320 kbps
    High,
    /// FLAC
    Lossless,
}

impl QualityTier {
    /// All tiers, best first
    pub const DESCENDING: [QualityTier; 4] = [
        QualityTier::Lossless,
        QualityTier::High,
        QualityTier::Standard,
        QualityTier::Low,
    ];

    /// Catalogue `level` query value for this tier
    pub fn level(self) -> &'static str {
        match self {
            QualityTier::Lossless => "lossless",
            QualityTier::High => "exhigh",
            QualityTier::Standard => "higher",
            QualityTier::Low => "standard",
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Lossless => "Lossless",
            QualityTier::High => "High",
            QualityTier::Standard => "Standard",
            QualityTier::Low => "Low",
        }
    }

    /// Tiers to probe when `self` is requested: `self` first, then every lower
    /// tier in descending order. Never contains a tier above `self` and never
    /// repeats a tier.
    pub fn fallback_chain(self) -> Vec<QualityTier> {
        Self::DESCENDING
            .iter()
            .copied()
            .filter(|tier| *tier <= self)
            .collect()
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a tier name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quality tier '{0}' (expected one of: lossless, high, standard, low)")]
pub struct ParseQualityTierError(pub String);

impl FromStr for QualityTier {
    type Err = ParseQualityTierError;

    /// Accepts tier labels case-insensitively, plus the unambiguous catalogue
    /// level names `exhigh` and `higher`.
    ///
    /// `standard` always means the Standard tier, never the catalogue level of
    /// the same name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lossless" => Ok(QualityTier::Lossless),
            "high" | "exhigh" => Ok(QualityTier::High),
            "standard" | "higher" => Ok(QualityTier::Standard),
            "low" => Ok(QualityTier::Low),
            _ => Err(ParseQualityTierError(s.to_string())),
        }
    }
}

impl TryFrom<String> for QualityTier {
    type Error = ParseQualityTierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualityTier> for String {
    fn from(tier: QualityTier) -> Self {
        tier.label().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        assert!(QualityTier::Lossless > QualityTier::High);
        assert!(QualityTier::High > QualityTier::Standard);
        assert!(QualityTier::Standard > QualityTier::Low);
    }

    #[test]
    fn test_descending_is_sorted() {
        let mut sorted = QualityTier::DESCENDING.to_vec();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(sorted, QualityTier::DESCENDING.to_vec());
    }

    #[test]
    fn test_fallback_chain_from_top() {
        assert_eq!(
            QualityTier::Lossless.fallback_chain(),
            vec![
                QualityTier::Lossless,
                QualityTier::High,
                QualityTier::Standard,
                QualityTier::Low
            ]
        );
    }

    #[test]
    fn test_fallback_chain_from_middle() {
        assert_eq!(
            QualityTier::High.fallback_chain(),
            vec![QualityTier::High, QualityTier::Standard, QualityTier::Low]
        );
    }

    #[test]
    fn test_fallback_chain_from_bottom() {
        assert_eq!(QualityTier::Low.fallback_chain(), vec![QualityTier::Low]);
    }

    #[test]
    fn test_parse_labels_and_levels() {
        assert_eq!("LOSSLESS".parse::<QualityTier>(), Ok(QualityTier::Lossless));
        assert_eq!("exhigh".parse::<QualityTier>(), Ok(QualityTier::High));
        assert_eq!("higher".parse::<QualityTier>(), Ok(QualityTier::Standard));
        assert_eq!(" Low ".parse::<QualityTier>(), Ok(QualityTier::Low));
        assert!("hires".parse::<QualityTier>().is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&QualityTier::High).unwrap();
        assert_eq!(json, "\"High\"");

        let parsed: QualityTier = serde_json::from_str("\"exhigh\"").unwrap();
        assert_eq!(parsed, QualityTier::High);
    }
}
