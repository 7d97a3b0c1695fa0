//! Urban/rural classification and comparison
//!
//! A city is urban when its name contains one of the configured metro
//! keywords (case-insensitive), rural otherwise. The comparator reports the
//! mean predicted severity of each group, highest first.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core_types::labels::AreaType;
use crate::core_types::observation::Column;
use crate::core_types::table::ObservationTable;
use crate::error::PipelineResult;

const STAGE: &str = "urban_rural";

/// Mean predicted severity for one area type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaSummary {
    pub area_type: AreaType,
    pub mean_predicted_severity: f64,
    pub records: usize,
}

/// Classify a single city name against lower-cased `keywords`
pub fn classify_city(city: &str, keywords: &[String]) -> AreaType {
    let city = city.to_lowercase();
    if keywords.iter().any(|k| city.contains(k.as_str())) {
        AreaType::Urban
    } else {
        AreaType::Rural
    }
}

/// Add `area_type` to every record
///
/// # Errors
/// Returns [`crate::PipelineError::MissingColumn`] if the table has no city column.
pub fn classify_urban_rural(
    table: &ObservationTable,
    keywords: &[String],
) -> PipelineResult<ObservationTable> {
    table.require(STAGE, &[Column::City])?;

    let lowered: Vec<String> = keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    Ok(table.par_extend_with(&[Column::AreaType], |record| {
        record.area_type = Some(classify_city(&record.city, &lowered));
    }))
}

/// Mean predicted severity per area type, sorted descending
///
/// Records without a predicted severity are left out of the means; a group
/// with no such records is not reported.
///
/// # Errors
/// Returns [`crate::PipelineError::MissingColumn`] if the table has no area
/// type or predicted severity.
pub fn compare_urban_rural(table: &ObservationTable) -> PipelineResult<Vec<AreaSummary>> {
    table.require(STAGE, &[Column::AreaType, Column::PredictedSeverity])?;

    let mut groups: FxHashMap<AreaType, (f64, usize)> = FxHashMap::default();
    for record in table {
        if let (Some(area), Some(severity)) = (record.area_type, record.predicted_severity) {
            let entry = groups.entry(area).or_insert((0.0, 0));
            entry.0 += severity;
            entry.1 += 1;
        }
    }

    let mut summary: Vec<AreaSummary> = groups
        .into_iter()
        .map(|(area_type, (sum, n))| AreaSummary {
            area_type,
            mean_predicted_severity: sum / n as f64,
            records: n,
        })
        .collect();
    summary.sort_by(|a, b| {
        b.mean_predicted_severity
            .total_cmp(&a.mean_predicted_severity)
            .then(a.area_type.cmp(&b.area_type))
    });

    debug!(groups = summary.len(), "Urban/rural comparison computed");
    Ok(summary)
}
