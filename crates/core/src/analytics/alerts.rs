//! Priority alert ranker
//!
//! Inflates predicted severity by the table's unreliability, so less
//! trustworthy data errs toward caution:
//!
//! ```text
//! risk_score = predicted_severity × (1 + (1 − reliability))
//! ```
//!
//! The top `n` records by score are returned with their alert level. Sorting
//! is stable, so equal scores keep table order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core_types::labels::{AlertLevel, Bands, TieredLabel};
use crate::core_types::observation::Column;
use crate::core_types::table::ObservationTable;
use crate::error::PipelineResult;

const STAGE: &str = "alerts";

/// One row of the priority alert table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRow {
    pub state: String,
    pub city: String,
    pub risk_score: f64,
    pub alert_level: AlertLevel,
}

/// Reliability-adjusted alert score
#[inline]
pub fn alert_score(predicted_severity: f64, reliability: f64) -> f64 {
    predicted_severity * (1.0 + (1.0 - reliability))
}

/// Rank records by reliability-adjusted risk and keep the top `top_n`
///
/// Records without a predicted severity are not ranked.
///
/// # Errors
/// Returns [`crate::PipelineError::MissingColumn`] if the table has no
/// predicted severity.
pub fn generate_alerts(
    table: &ObservationTable,
    reliability: f64,
    bands: &Bands,
    top_n: usize,
) -> PipelineResult<Vec<AlertRow>> {
    table.require(STAGE, &[Column::State, Column::City, Column::PredictedSeverity])?;

    let mut rows: Vec<AlertRow> = table
        .iter()
        .filter_map(|record| {
            let risk_score = alert_score(record.predicted_severity?, reliability);
            Some(AlertRow {
                state: record.state.clone(),
                city: record.city.clone(),
                risk_score,
                alert_level: AlertLevel::classify(risk_score, bands),
            })
        })
        .collect();

    rows.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
    rows.truncate(top_n);

    debug!(
        ranked = rows.len(),
        reliability,
        critical = rows
            .iter()
            .filter(|r| r.alert_level == AlertLevel::Critical)
            .count(),
        "Priority alerts generated"
    );

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::core_types::observation::Observation;
    use crate::error::PipelineError;

    fn predicted(values: &[(&str, f64)]) -> ObservationTable {
        let records = values
            .iter()
            .map(|&(city, v)| {
                let mut r = Observation::new("S", city, None, None, None);
                r.predicted_severity = Some(v);
                r
            })
            .collect();
        ObservationTable::new(
            [Column::State, Column::City, Column::PredictedSeverity],
            records,
        )
    }

    #[test]
    fn test_reliability_inflates_score() {
        assert_eq!(alert_score(0.5, 1.0), 0.5);
        assert_eq!(alert_score(0.5, 0.0), 1.0);
        assert!((alert_score(0.4, 0.75) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let cities: Vec<(String, f64)> = (0..15)
            .map(|i| (format!("City{i}"), f64::from(i) * 0.05))
            .collect();
        let refs: Vec<(&str, f64)> = cities.iter().map(|(c, v)| (c.as_str(), *v)).collect();
        let alerts = generate_alerts(
            &predicted(&refs),
            1.0,
            &Thresholds::default().alert,
            10,
        )
        .unwrap();

        assert_eq!(alerts.len(), 10);
        assert_eq!(alerts[0].city, "City14");
        assert!(alerts.windows(2).all(|w| w[0].risk_score >= w[1].risk_score));
    }

    #[test]
    fn test_alert_levels_follow_inclusive_bands() {
        let bands = Thresholds::default().alert;
        let alerts = generate_alerts(
            &predicted(&[("a", 0.75), ("b", 0.5), ("c", 0.3), ("d", 0.1)]),
            1.0,
            &bands,
            10,
        )
        .unwrap();
        let levels: Vec<_> = alerts.iter().map(|a| a.alert_level).collect();
        assert_eq!(
            levels,
            vec![
                AlertLevel::Critical,
                AlertLevel::High,
                AlertLevel::Moderate,
                AlertLevel::Low
            ]
        );
        for alert in &alerts {
            assert_eq!(alert.alert_level, AlertLevel::classify(alert.risk_score, &bands));
        }
    }

    #[test]
    fn test_ties_keep_input_order() {
        let alerts = generate_alerts(
            &predicted(&[("first", 0.4), ("second", 0.4), ("third", 0.4)]),
            0.9,
            &Thresholds::default().alert,
            10,
        )
        .unwrap();
        let order: Vec<_> = alerts.iter().map(|a| a.city.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_requires_predicted_severity() {
        let table = ObservationTable::new([Column::State, Column::City], Vec::new());
        let err = generate_alerts(&table, 1.0, &Thresholds::default().alert, 10).unwrap_err();
        assert_eq!(
            err,
            PipelineError::missing_column("alerts", Column::PredictedSeverity)
        );
    }
}
