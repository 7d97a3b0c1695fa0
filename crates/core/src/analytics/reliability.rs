//! Reliability scorer
//!
//! Scores how much the input table can be trusted, from two signals:
//! - completeness: share of pollutant cells that are present
//! - stability: `1 / (1 + mean population variance)` of the pollutant columns
//!
//! `reliability = 0.7 × completeness + 0.3 × stability`, rounded to four
//! decimal places. An empty table has nothing to trust and scores 0.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::defaults;
use crate::core_types::observation::Column;
use crate::core_types::spatial::round_to;
use crate::core_types::table::ObservationTable;
use crate::error::PipelineResult;

const STAGE: &str = "reliability";

/// Weight of completeness in the final score
pub const COMPLETENESS_WEIGHT: f64 = 0.7;

/// Weight of stability in the final score
pub const STABILITY_WEIGHT: f64 = 0.3;

/// Reliability score with its two components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reliability {
    /// Fraction of pollutant cells present, in [0, 1]
    pub completeness: f64,
    /// Variance-based stability, in (0, 1]
    pub stability: f64,
    /// Weighted score in [0, 1], rounded to four decimals
    pub score: f64,
}

impl Reliability {
    /// Score for a table with no rows
    pub const fn empty() -> Self {
        Reliability {
            completeness: 0.0,
            stability: 0.0,
            score: 0.0,
        }
    }
}

/// Population variance (ddof = 0); `None` for an empty slice
pub fn population_variance(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    Some(values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n)
}

/// Compute the reliability of the pollutant readings in `table`
///
/// Variances are taken over present values only; a column with no values
/// contributes zero variance.
///
/// # Errors
/// Returns [`crate::PipelineError::MissingColumn`] if a pollutant column is absent.
pub fn calculate_reliability(table: &ObservationTable) -> PipelineResult<Reliability> {
    table.require(STAGE, &Column::POLLUTANTS)?;

    if table.is_empty() {
        debug!("Empty table, reliability is zero");
        return Ok(Reliability::empty());
    }

    let total_cells = (table.len() * Column::POLLUTANTS.len()) as f64;
    let mut missing_cells = 0usize;
    let mut variance_sum = 0.0;

    for column in Column::POLLUTANTS {
        let present: Vec<f64> = table
            .iter()
            .filter_map(|r| r.pollutant(column))
            .filter(|v| v.is_finite())
            .collect();
        missing_cells += table.len() - present.len();
        variance_sum += population_variance(&present).unwrap_or(0.0);
    }

    let completeness = 1.0 - missing_cells as f64 / total_cells;
    let mean_variance = variance_sum / Column::POLLUTANTS.len() as f64;
    let stability = 1.0 / (1.0 + mean_variance);

    let raw = COMPLETENESS_WEIGHT * completeness + STABILITY_WEIGHT * stability;
    let score = round_to(raw, defaults::RELIABILITY_DECIMALS).clamp(0.0, 1.0);

    debug!(
        completeness,
        stability, score, "Reliability computed"
    );

    Ok(Reliability {
        completeness,
        stability,
        score,
    })
}
