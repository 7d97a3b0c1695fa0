//! What-if scenarios
//!
//! A scenario scales every predicted severity by a fixed multiplier before
//! the trend and alert stages run, so analysts can compare an emission surge
//! or a containment effort against the baseline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::core_types::observation::Column;
use crate::core_types::table::ObservationTable;
use crate::error::{PipelineError, PipelineResult};

const STAGE: &str = "scenario";

/// Named severity scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Scenario {
    /// Baseline, no scaling
    #[default]
    Normal,
    /// +30% emissions
    IndustrialSurge,
    /// +20% from stronger dispersion
    HighWindSpread,
    /// -30% under active containment
    EmergencyContainment,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Normal,
        Scenario::IndustrialSurge,
        Scenario::HighWindSpread,
        Scenario::EmergencyContainment,
    ];

    /// Factor applied to predicted severity
    pub fn multiplier(&self) -> f64 {
        match self {
            Scenario::Normal => 1.0,
            Scenario::IndustrialSurge => 1.3,
            Scenario::HighWindSpread => 1.2,
            Scenario::EmergencyContainment => 0.7,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Normal => "Normal",
            Scenario::IndustrialSurge => "Industrial Surge",
            Scenario::HighWindSpread => "High Wind Spread",
            Scenario::EmergencyContainment => "Emergency Containment",
        }
    }

    /// Scale `predicted_severity` of every record
    ///
    /// # Errors
    /// Returns [`PipelineError::MissingColumn`] if the table has no predicted
    /// severity.
    pub fn apply(&self, table: &ObservationTable) -> PipelineResult<ObservationTable> {
        table.require(STAGE, &[Column::PredictedSeverity])?;

        let factor = self.multiplier();
        info!(scenario = self.label(), factor, "Applying scenario");

        Ok(table.par_extend_with(&[], |record| {
            record.predicted_severity = record.predicted_severity.map(|s| s * factor);
        }))
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Scenario {
    type Err = PipelineError;

    /// Accepts the display label or a kebab/snake-case form, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Scenario::ALL
            .into_iter()
            .find(|scenario| {
                let name: String = scenario
                    .label()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                name == wanted
            })
            .ok_or_else(|| {
                PipelineError::invalid_parameter(
                    "scenario",
                    &format!("unknown scenario '{s}'"),
                )
            })
    }
}
