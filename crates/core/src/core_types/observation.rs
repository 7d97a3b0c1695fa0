//! Per-(state, city, date) observation records
//!
//! An [`Observation`] carries the raw pollutant readings for one location and
//! day plus every field the analytics stages derive from them. Derived fields
//! start as `None` and are filled in by the stage that owns them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core_types::labels::{AlertLevel, AreaType, MomentumLevel, ProjectedAlert, SeverityLabel};
use crate::core_types::spatial::GeoPoint;

/// Pollutant identifiers tracked by the pipeline, in column order
pub const TRACKED_POLLUTANTS: [&str; 3] = ["PM2.5", "PM10", "NO2"];

/// Named, typed columns of an observation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    State,
    City,
    Date,
    Pm25,
    Pm10,
    No2,
    Latitude,
    Longitude,
    SeverityIndex,
    SeverityLabel,
    SpreadImpact,
    DistanceFromSource,
    PredictedSeverity,
    VolatilityFactor,
    RiskMomentum,
    MomentumLevel,
    Projected7DaySeverity,
    ProjectedAlert,
    RiskScore,
    AlertLevel,
    AreaType,
}

impl Column {
    /// Identity and measurement columns every input table must carry
    pub const REQUIRED_INPUT: [Column; 5] = [
        Column::State,
        Column::City,
        Column::Pm25,
        Column::Pm10,
        Column::No2,
    ];

    /// The three pollutant columns, in weighting order
    pub const POLLUTANTS: [Column; 3] = [Column::Pm25, Column::Pm10, Column::No2];

    /// Coordinate columns
    pub const GEO: [Column; 2] = [Column::Latitude, Column::Longitude];

    /// Column header as it appears in tabular exports
    pub fn name(&self) -> &'static str {
        match self {
            Column::State => "state",
            Column::City => "city",
            Column::Date => "date",
            Column::Pm25 => "PM2.5",
            Column::Pm10 => "PM10",
            Column::No2 => "NO2",
            Column::Latitude => "latitude",
            Column::Longitude => "longitude",
            Column::SeverityIndex => "severity_index",
            Column::SeverityLabel => "severity_label",
            Column::SpreadImpact => "spread_impact",
            Column::DistanceFromSource => "distance_from_source",
            Column::PredictedSeverity => "predicted_severity",
            Column::VolatilityFactor => "volatility_factor",
            Column::RiskMomentum => "risk_momentum",
            Column::MomentumLevel => "momentum_level",
            Column::Projected7DaySeverity => "projected_7day_severity",
            Column::ProjectedAlert => "projected_alert",
            Column::RiskScore => "risk_score",
            Column::AlertLevel => "alert_level",
            Column::AreaType => "area_type",
        }
    }

    /// Look up a column by its header name
    pub fn from_name(name: &str) -> Option<Column> {
        ALL_COLUMNS.iter().copied().find(|c| c.name() == name.trim())
    }
}

const ALL_COLUMNS: [Column; 21] = [
    Column::State,
    Column::City,
    Column::Date,
    Column::Pm25,
    Column::Pm10,
    Column::No2,
    Column::Latitude,
    Column::Longitude,
    Column::SeverityIndex,
    Column::SeverityLabel,
    Column::SpreadImpact,
    Column::DistanceFromSource,
    Column::PredictedSeverity,
    Column::VolatilityFactor,
    Column::RiskMomentum,
    Column::MomentumLevel,
    Column::Projected7DaySeverity,
    Column::ProjectedAlert,
    Column::RiskScore,
    Column::AlertLevel,
    Column::AreaType,
];

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of an observation table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    pub state: String,
    pub city: String,
    pub date: Option<NaiveDate>,

    /// PM2.5 concentration (µg/m³)
    pub pm25: Option<f64>,
    /// PM10 concentration (µg/m³)
    pub pm10: Option<f64>,
    /// NO2 concentration (µg/m³)
    pub no2: Option<f64>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Composite weighted pollutant load in [0, 1]
    pub severity_index: Option<f64>,
    pub severity_label: Option<SeverityLabel>,
    /// Extra severity attributed to dispersion from the estimated source
    pub spread_impact: Option<f64>,
    /// Flat-plane distance to the estimated source in degrees
    pub distance_from_source: Option<f64>,
    /// `severity_index + spread_impact`, possibly scaled by a scenario
    pub predicted_severity: Option<f64>,
    pub volatility_factor: Option<f64>,
    pub risk_momentum: Option<f64>,
    pub momentum_level: Option<MomentumLevel>,
    pub projected_7day_severity: Option<f64>,
    pub projected_alert: Option<ProjectedAlert>,
    pub risk_score: Option<f64>,
    pub alert_level: Option<AlertLevel>,
    pub area_type: Option<AreaType>,
}

impl Observation {
    /// Create a record with identity and pollutant readings only
    pub fn new(
        state: impl Into<String>,
        city: impl Into<String>,
        pm25: Option<f64>,
        pm10: Option<f64>,
        no2: Option<f64>,
    ) -> Self {
        Observation {
            state: state.into(),
            city: city.into(),
            pm25,
            pm10,
            no2,
            ..Default::default()
        }
    }

    /// Attach a date
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Attach coordinates
    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Pollutant reading for one of [`Column::POLLUTANTS`]
    pub fn pollutant(&self, column: Column) -> Option<f64> {
        match column {
            Column::Pm25 => self.pm25,
            Column::Pm10 => self.pm10,
            Column::No2 => self.no2,
            _ => None,
        }
    }

    /// Mutable pollutant slot for one of [`Column::POLLUTANTS`]
    pub fn pollutant_mut(&mut self, column: Column) -> Option<&mut Option<f64>> {
        match column {
            Column::Pm25 => Some(&mut self.pm25),
            Column::Pm10 => Some(&mut self.pm10),
            Column::No2 => Some(&mut self.no2),
            _ => None,
        }
    }

    /// Location when both coordinates are present and finite
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(GeoPoint::new(lat, lon))
            }
            _ => None,
        }
    }

    /// Numeric value of a derived score column, if the record carries one
    pub fn score(&self, column: Column) -> Option<f64> {
        match column {
            Column::Pm25 | Column::Pm10 | Column::No2 => self.pollutant(column),
            Column::Latitude => self.latitude,
            Column::Longitude => self.longitude,
            Column::SeverityIndex => self.severity_index,
            Column::SpreadImpact => self.spread_impact,
            Column::DistanceFromSource => self.distance_from_source,
            Column::PredictedSeverity => self.predicted_severity,
            Column::VolatilityFactor => self.volatility_factor,
            Column::RiskMomentum => self.risk_momentum,
            Column::Projected7DaySeverity => self.projected_7day_severity,
            Column::RiskScore => self.risk_score,
            _ => None,
        }
    }
}
