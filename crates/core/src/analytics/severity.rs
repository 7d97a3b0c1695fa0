//! Severity engine
//!
//! Normalizes each pollutant column and combines them into a weighted
//! severity index. This is a two-phase computation: a full-table pass finds
//! the per-column extremes, then every record is mapped independently.

use tracing::debug;

use crate::config::{Normalization, SeverityConfig};
use crate::core_types::labels::{Bands, SeverityLabel, TieredLabel};
use crate::core_types::observation::Column;
use crate::core_types::table::ObservationTable;
use crate::error::PipelineResult;

const STAGE: &str = "severity";

/// Extremes of one pollutant column over its present, finite values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    /// Range of `values`, or `None` if no finite value is present
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some(ColumnRange { min: v, max: v }),
                Some(r) => Some(ColumnRange {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    /// Normalize `value` against this range
    ///
    /// A degenerate range (`max == min` for min-max, `max == 0` for max-only)
    /// normalizes every value to 0.
    pub fn normalize(&self, value: f64, strategy: Normalization) -> f64 {
        match strategy {
            Normalization::MinMax => {
                let span = self.max - self.min;
                if span > 0.0 {
                    (value - self.min) / span
                } else {
                    0.0
                }
            }
            Normalization::MaxOnly => {
                if self.max != 0.0 {
                    value / self.max
                } else {
                    0.0
                }
            }
        }
    }
}

/// Normalize a single column of optional readings
///
/// Missing or non-finite entries stay `None`.
pub fn normalize_column(values: &[Option<f64>], strategy: Normalization) -> Vec<Option<f64>> {
    let range = ColumnRange::of(values.iter().flatten().copied());
    values
        .iter()
        .map(|v| match (v, range) {
            (Some(v), Some(r)) if v.is_finite() => Some(r.normalize(*v, strategy)),
            _ => None,
        })
        .collect()
}

/// Add `severity_index` to every record
///
/// Records missing any of the three pollutant readings get no index.
///
/// # Errors
/// Returns [`crate::PipelineError::MissingColumn`] if a pollutant column is absent.
pub fn calculate_severity_index(
    table: &ObservationTable,
    config: &SeverityConfig,
) -> PipelineResult<ObservationTable> {
    table.require(STAGE, &Column::POLLUTANTS)?;

    let ranges: Vec<Option<ColumnRange>> = Column::POLLUTANTS
        .iter()
        .map(|&column| ColumnRange::of(table.iter().filter_map(|r| r.pollutant(column))))
        .collect();

    let weights = config.weights;
    let strategy = config.normalization;

    let out = table.par_extend_with(&[Column::SeverityIndex], |record| {
        let mut index = 0.0;
        for (column, range) in Column::POLLUTANTS.iter().zip(&ranges) {
            match (record.pollutant(*column), range) {
                (Some(value), Some(range)) if value.is_finite() => {
                    index += weights.weight(*column) * range.normalize(value, strategy);
                }
                _ => {
                    record.severity_index = None;
                    return;
                }
            }
        }
        record.severity_index = Some(index);
    });

    debug!(
        rows = out.len(),
        scored = out.values(Column::SeverityIndex).len(),
        ?strategy,
        "Severity index computed"
    );

    Ok(out)
}

/// Add `severity_label` from `predicted_severity`
///
/// Pass-through when the table has no predicted severity.
pub fn label_severity(table: &ObservationTable, bands: &Bands) -> ObservationTable {
    if !table.has_column(Column::PredictedSeverity) {
        debug!("No predicted severity, skipping severity labels");
        return table.clone();
    }
    table.par_extend_with(&[Column::SeverityLabel], |record| {
        record.severity_label = record
            .predicted_severity
            .map(|s| SeverityLabel::classify(s, bands));
    })
}
