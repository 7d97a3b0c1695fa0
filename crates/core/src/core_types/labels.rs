//! Categorical risk labels and the band tables that produce them
//!
//! Every classifier in the pipeline maps a numeric score onto one of four
//! ordered tiers. A [`Bands`] table holds three descending cut-offs and a flag
//! saying whether a score equal to a cut-off belongs to the band above it.
//!
//! With exclusive cut-offs `[c2, c1, c0]` the tiers are:
//! - tier 3: `(c2, ∞)`
//! - tier 2: `(c1, c2]`
//! - tier 1: `(c0, c1]`
//! - tier 0: `(-∞, c0]`
//!
//! Inclusive cut-offs move each boundary into the band above (`[c2, ∞)` etc.).
//! NaN compares false against every cut-off and lands in tier 0, so every
//! classifier is total.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Four-tier threshold table with descending cut-offs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    /// Descending cut-offs: `[top, upper, lower]`
    pub cut_offs: [f64; 3],
    /// Whether a score equal to a cut-off belongs to the band above it
    pub inclusive: bool,
}

impl Bands {
    /// Bands where a score must strictly exceed a cut-off to move up
    pub const fn exclusive(top: f64, upper: f64, lower: f64) -> Self {
        Bands {
            cut_offs: [top, upper, lower],
            inclusive: false,
        }
    }

    /// Bands where reaching a cut-off is enough to move up
    pub const fn inclusive(top: f64, upper: f64, lower: f64) -> Self {
        Bands {
            cut_offs: [top, upper, lower],
            inclusive: true,
        }
    }

    /// Tier of `score`, 0 (lowest) to 3 (highest)
    pub fn tier(&self, score: f64) -> usize {
        self.cut_offs
            .iter()
            .position(|&cut| {
                if self.inclusive {
                    score >= cut
                } else {
                    score > cut
                }
            })
            .map_or(0, |idx| 3 - idx)
    }

    /// Whether the cut-offs are finite and strictly descending
    pub fn is_monotone(&self) -> bool {
        let [top, upper, lower] = self.cut_offs;
        top.is_finite() && upper.is_finite() && lower.is_finite() && top > upper && upper > lower
    }
}

/// Label types produced by a [`Bands`] lookup
pub trait TieredLabel: Sized + Copy {
    /// Labels ordered from tier 0 (lowest) to tier 3 (highest)
    const TIERS: [Self; 4];

    /// Classify `score` against `bands`
    fn classify(score: f64, bands: &Bands) -> Self {
        Self::TIERS[bands.tier(score)]
    }
}

/// Severity label for predicted severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityLabel {
    Low,
    Moderate,
    High,
    Critical,
}

impl TieredLabel for SeverityLabel {
    const TIERS: [Self; 4] = [
        SeverityLabel::Low,
        SeverityLabel::Moderate,
        SeverityLabel::High,
        SeverityLabel::Critical,
    ];
}

impl SeverityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLabel::Low => "LOW",
            SeverityLabel::Moderate => "MODERATE",
            SeverityLabel::High => "HIGH",
            SeverityLabel::Critical => "CRITICAL",
        }
    }
}

/// Short-term trend label for risk momentum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MomentumLevel {
    Low,
    Stable,
    Rising,
    Surging,
}

impl TieredLabel for MomentumLevel {
    const TIERS: [Self; 4] = [
        MomentumLevel::Low,
        MomentumLevel::Stable,
        MomentumLevel::Rising,
        MomentumLevel::Surging,
    ];
}

impl MomentumLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MomentumLevel::Low => "LOW",
            MomentumLevel::Stable => "STABLE",
            MomentumLevel::Rising => "RISING",
            MomentumLevel::Surging => "SURGING",
        }
    }
}

/// Label for the 7-day projected severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProjectedAlert {
    #[serde(rename = "MODERATE")]
    Moderate,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "VERY HIGH")]
    VeryHigh,
    #[serde(rename = "EXTREME")]
    Extreme,
}

impl TieredLabel for ProjectedAlert {
    const TIERS: [Self; 4] = [
        ProjectedAlert::Moderate,
        ProjectedAlert::High,
        ProjectedAlert::VeryHigh,
        ProjectedAlert::Extreme,
    ];
}

impl ProjectedAlert {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectedAlert::Moderate => "MODERATE",
            ProjectedAlert::High => "HIGH",
            ProjectedAlert::VeryHigh => "VERY HIGH",
            ProjectedAlert::Extreme => "EXTREME",
        }
    }
}

/// Alert level shared by the combined risk score and the priority ranker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl TieredLabel for AlertLevel {
    const TIERS: [Self; 4] = [
        AlertLevel::Low,
        AlertLevel::Moderate,
        AlertLevel::High,
        AlertLevel::Critical,
    ];
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Low => "LOW",
            AlertLevel::Moderate => "MODERATE",
            AlertLevel::High => "HIGH",
            AlertLevel::Critical => "CRITICAL",
        }
    }
}

/// Settlement type derived from the city name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AreaType {
    Urban,
    Rural,
}

impl AreaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaType::Urban => "Urban",
            AreaType::Rural => "Rural",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(SeverityLabel, MomentumLevel, ProjectedAlert, AlertLevel, AreaType);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_boundaries_fall_to_lower_band() {
        let bands = Bands::exclusive(1.0, 0.7, 0.4);
        assert_eq!(MomentumLevel::classify(1.0, &bands), MomentumLevel::Rising);
        assert_eq!(MomentumLevel::classify(1.0001, &bands), MomentumLevel::Surging);
        assert_eq!(MomentumLevel::classify(0.7, &bands), MomentumLevel::Stable);
        assert_eq!(MomentumLevel::classify(0.4, &bands), MomentumLevel::Low);
        assert_eq!(MomentumLevel::classify(-3.0, &bands), MomentumLevel::Low);
    }

    #[test]
    fn test_inclusive_boundaries_rise_to_upper_band() {
        let bands = Bands::inclusive(0.75, 0.5, 0.3);
        assert_eq!(AlertLevel::classify(0.75, &bands), AlertLevel::Critical);
        assert_eq!(AlertLevel::classify(0.5, &bands), AlertLevel::High);
        assert_eq!(AlertLevel::classify(0.3, &bands), AlertLevel::Moderate);
        assert_eq!(AlertLevel::classify(0.2999, &bands), AlertLevel::Low);
    }

    #[test]
    fn test_classification_is_total_and_monotone() {
        let bands = Bands::exclusive(1.2, 0.9, 0.6);
        assert_eq!(ProjectedAlert::classify(f64::NAN, &bands), ProjectedAlert::Moderate);
        assert_eq!(
            ProjectedAlert::classify(f64::INFINITY, &bands),
            ProjectedAlert::Extreme
        );
        assert_eq!(
            ProjectedAlert::classify(f64::NEG_INFINITY, &bands),
            ProjectedAlert::Moderate
        );

        let mut previous = ProjectedAlert::Moderate;
        for step in 0..300 {
            let label = ProjectedAlert::classify(f64::from(step) * 0.01, &bands);
            assert!(label >= previous);
            previous = label;
        }
    }

    #[test]
    fn test_monotone_check() {
        assert!(Bands::exclusive(1.0, 0.7, 0.4).is_monotone());
        assert!(!Bands::exclusive(0.4, 0.7, 1.0).is_monotone());
        assert!(!Bands::exclusive(f64::NAN, 0.7, 0.4).is_monotone());
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(ProjectedAlert::VeryHigh.to_string(), "VERY HIGH");
        assert_eq!(AreaType::Urban.to_string(), "Urban");
        assert_eq!(SeverityLabel::Critical.to_string(), "CRITICAL");
    }
}
