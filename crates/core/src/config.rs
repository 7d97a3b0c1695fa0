//! Pipeline configuration
//!
//! Every tunable of the analytics pipeline lives here: severity weights and
//! normalization strategy, spread intensity and wind, trend growth, clustering
//! parameters and the band tables used by the classifiers. Defaults reproduce
//! the reference behaviour; presets mirror the alternative weightings that
//! exist in the field.
//!
//! Configurations can be round-tripped through JSON and any field left out of
//! a file keeps its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core_types::labels::Bands;
use crate::core_types::observation::Column;
use crate::core_types::units::Degrees;
use crate::error::{PipelineError, PipelineResult};

/// Default values for pipeline parameters
pub mod defaults {
    /// Daily compounding growth used by the 7-day projection
    pub const DAILY_GROWTH: f64 = 0.03;

    /// Projection horizon in days
    pub const HORIZON_DAYS: i32 = 7;

    /// Spread intensity factor (severity units × degrees)
    pub const INTENSITY_FACTOR: f64 = 0.2;

    /// Smallest distance (degrees) the spread kernel will divide by
    pub const MIN_DISTANCE: f64 = 1e-4;

    /// Number of spatial clusters used by the source estimator
    pub const CLUSTER_COUNT: usize = 3;

    /// Seed for k-means initialisation
    pub const CLUSTER_SEED: u64 = 42;

    /// Lloyd iteration cap
    pub const CLUSTER_MAX_ITERATIONS: usize = 300;

    /// Centroid movement (degrees) below which k-means stops
    pub const CLUSTER_TOLERANCE: f64 = 1e-4;

    /// Lower bound of the per-record volatility multiplier
    pub const VOLATILITY_MIN: f64 = 0.95;

    /// Upper bound (inclusive) of the per-record volatility multiplier
    pub const VOLATILITY_MAX: f64 = 1.05;

    /// Number of rows in the priority alert table
    pub const ALERT_TOP_N: usize = 10;

    /// Decimal places kept on the source estimate
    pub const SOURCE_DECIMALS: i32 = 5;

    /// Decimal places kept on the reliability score
    pub const RELIABILITY_DECIMALS: i32 = 4;

    /// Metro names that mark a city as urban
    pub const URBAN_KEYWORDS: [&str; 8] = [
        "Delhi",
        "Mumbai",
        "Kolkata",
        "Chennai",
        "Bengaluru",
        "Hyderabad",
        "Pune",
        "Ahmedabad",
    ];
}

/// Per-pollutant weights of the severity index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub pm25: f64,
    pub pm10: f64,
    pub no2: f64,
}

impl SeverityWeights {
    /// Particulate-heavy weighting: 0.6 PM2.5, 0.3 PM10, 0.1 NO2
    pub const fn standard() -> Self {
        SeverityWeights {
            pm25: 0.6,
            pm10: 0.3,
            no2: 0.1,
        }
    }

    /// Weighting that gives NO2 more say: 0.5 PM2.5, 0.3 PM10, 0.2 NO2
    pub const fn balanced() -> Self {
        SeverityWeights {
            pm25: 0.5,
            pm10: 0.3,
            no2: 0.2,
        }
    }

    /// Weight for one of [`Column::POLLUTANTS`]
    pub fn weight(&self, column: Column) -> f64 {
        match column {
            Column::Pm25 => self.pm25,
            Column::Pm10 => self.pm10,
            Column::No2 => self.no2,
            _ => 0.0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.pm25 + self.pm10 + self.no2
    }
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self::standard()
    }
}

/// Column normalization strategy for the severity index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Normalization {
    /// `(v - min) / (max - min)`; a flat column normalizes to 0
    #[default]
    MinMax,
    /// `v / max`; a column whose max is 0 normalizes to 0
    MaxOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    pub weights: SeverityWeights,
    pub normalization: Normalization,
}

/// Wind applied to the spread simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindConditions {
    /// Direction the wind carries pollution toward, in the bearing frame of
    /// [`crate::core_types::GeoPoint::bearing_from`] (0° = +longitude)
    pub direction: Degrees,
    /// Relative strength in [0, 1]
    pub strength: f64,
}

impl WindConditions {
    pub const fn new(direction: Degrees, strength: f64) -> Self {
        WindConditions {
            direction,
            strength,
        }
    }

    /// No wind: spread is purely radial
    pub const fn calm() -> Self {
        WindConditions::new(Degrees::new(0.0), 0.0)
    }
}

impl Default for WindConditions {
    fn default() -> Self {
        Self::calm()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadConfig {
    pub intensity_factor: f64,
    pub wind: WindConditions,
    pub min_distance: f64,
}

impl Default for SpreadConfig {
    fn default() -> Self {
        SpreadConfig {
            intensity_factor: defaults::INTENSITY_FACTOR,
            wind: WindConditions::calm(),
            min_distance: defaults::MIN_DISTANCE,
        }
    }
}

/// Parameters of the momentum and projection models
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub daily_growth: f64,
    pub horizon_days: i32,
    pub volatility_min: f64,
    pub volatility_max: f64,
}

impl TrendConfig {
    /// Compounded growth over the horizon, `(1 + g)^days`
    pub fn growth_multiplier(&self) -> f64 {
        (1.0 + self.daily_growth).powi(self.horizon_days)
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        TrendConfig {
            daily_growth: defaults::DAILY_GROWTH,
            horizon_days: defaults::HORIZON_DAYS,
            volatility_min: defaults::VOLATILITY_MIN,
            volatility_max: defaults::VOLATILITY_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub clusters: usize,
    pub seed: u64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            clusters: defaults::CLUSTER_COUNT,
            seed: defaults::CLUSTER_SEED,
            max_iterations: defaults::CLUSTER_MAX_ITERATIONS,
            tolerance: defaults::CLUSTER_TOLERANCE,
        }
    }
}

/// Band tables for every classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Predicted severity → LOW / MODERATE / HIGH / CRITICAL
    pub severity: Bands,
    /// Risk momentum → LOW / STABLE / RISING / SURGING
    pub momentum: Bands,
    /// Projected severity → MODERATE / HIGH / VERY HIGH / EXTREME
    pub projection: Bands,
    /// Combined risk score → LOW / MODERATE / HIGH / CRITICAL
    pub risk: Bands,
    /// Reliability-adjusted alert score (inclusive cut-offs)
    pub alert: Bands,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            severity: Bands::exclusive(0.8, 0.6, 0.4),
            momentum: Bands::exclusive(1.0, 0.7, 0.4),
            projection: Bands::exclusive(1.2, 0.9, 0.6),
            risk: Bands::exclusive(1.0, 0.7, 0.4),
            alert: Bands::inclusive(0.75, 0.5, 0.3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub top_n: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            top_n: defaults::ALERT_TOP_N,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub severity: SeverityConfig,
    pub spread: SpreadConfig,
    pub trend: TrendConfig,
    pub clustering: ClusterConfig,
    pub thresholds: Thresholds,
    pub alerts: AlertConfig,
    pub urban_keywords: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            severity: SeverityConfig::default(),
            spread: SpreadConfig::default(),
            trend: TrendConfig::default(),
            clustering: ClusterConfig::default(),
            thresholds: Thresholds::default(),
            alerts: AlertConfig::default(),
            urban_keywords: defaults::URBAN_KEYWORDS
                .iter()
                .map(|k| (*k).to_owned())
                .collect(),
        }
    }
}

impl PipelineConfig {
    /// Set wind direction and strength
    pub fn with_wind(mut self, wind: WindConditions) -> Self {
        self.spread.wind = wind;
        self
    }

    /// Set the spread intensity factor
    pub fn with_intensity(mut self, intensity_factor: f64) -> Self {
        self.spread.intensity_factor = intensity_factor;
        self
    }

    /// Set the severity weighting
    pub fn with_weights(mut self, weights: SeverityWeights) -> Self {
        self.severity.weights = weights;
        self
    }

    /// Check every parameter against its documented domain
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidParameter`] for the first offending value.
    pub fn validate(&self) -> PipelineResult<()> {
        let w = &self.severity.weights;
        for (name, value) in [("pm25", w.pm25), ("pm10", w.pm10), ("no2", w.no2)] {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::invalid_parameter(
                    &format!("severity.weights.{name}"),
                    &format!("must be finite and non-negative, got {value}"),
                ));
            }
        }
        if (w.sum() - 1.0).abs() > 1e-6 {
            return Err(PipelineError::invalid_parameter(
                "severity.weights",
                &format!("must sum to 1, got {}", w.sum()),
            ));
        }

        let spread = &self.spread;
        if !spread.intensity_factor.is_finite() || spread.intensity_factor < 0.0 {
            return Err(PipelineError::invalid_parameter(
                "spread.intensity_factor",
                &format!("must be finite and non-negative, got {}", spread.intensity_factor),
            ));
        }
        if !(0.0..=360.0).contains(&*spread.wind.direction) {
            return Err(PipelineError::invalid_parameter(
                "spread.wind.direction",
                &format!("must be within [0, 360], got {}", spread.wind.direction),
            ));
        }
        if !(0.0..=1.0).contains(&spread.wind.strength) {
            return Err(PipelineError::invalid_parameter(
                "spread.wind.strength",
                &format!("must be within [0, 1], got {}", spread.wind.strength),
            ));
        }
        if !spread.min_distance.is_finite() || spread.min_distance <= 0.0 {
            return Err(PipelineError::invalid_parameter(
                "spread.min_distance",
                &format!("must be finite and positive, got {}", spread.min_distance),
            ));
        }

        let trend = &self.trend;
        if !trend.daily_growth.is_finite() || trend.daily_growth < 0.0 {
            return Err(PipelineError::invalid_parameter(
                "trend.daily_growth",
                &format!("must be finite and non-negative, got {}", trend.daily_growth),
            ));
        }
        if trend.horizon_days < 0 {
            return Err(PipelineError::invalid_parameter(
                "trend.horizon_days",
                &format!("must be non-negative, got {}", trend.horizon_days),
            ));
        }
        if !(trend.volatility_min.is_finite()
            && trend.volatility_max.is_finite()
            && trend.volatility_min > 0.0
            && trend.volatility_min <= trend.volatility_max)
        {
            return Err(PipelineError::invalid_parameter(
                "trend.volatility",
                &format!(
                    "needs 0 < min <= max, got [{}, {}]",
                    trend.volatility_min, trend.volatility_max
                ),
            ));
        }

        if self.clustering.clusters == 0 {
            return Err(PipelineError::invalid_parameter(
                "clustering.clusters",
                "must be at least 1",
            ));
        }

        let t = &self.thresholds;
        for (name, bands) in [
            ("severity", t.severity),
            ("momentum", t.momentum),
            ("projection", t.projection),
            ("risk", t.risk),
            ("alert", t.alert),
        ] {
            if !bands.is_monotone() {
                return Err(PipelineError::invalid_parameter(
                    &format!("thresholds.{name}"),
                    "cut-offs must be finite and strictly descending",
                ));
            }
        }

        Ok(())
    }

    /// Parse a configuration from JSON
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidParameter`] if the JSON is malformed or
    /// a value fails [`Self::validate`].
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PipelineError::invalid_parameter("config", &e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Save configuration to a JSON file
    ///
    /// # Errors
    /// Returns error if the configuration cannot be serialized or written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::invalid_parameter("config", &e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }
}
