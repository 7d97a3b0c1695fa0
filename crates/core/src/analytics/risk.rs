//! Risk and trend models
//!
//! Three independent per-record transforms, each followed by a band lookup:
//! - combined risk score: `severity_index + spread_impact`
//! - risk momentum: predicted severity scaled by a bounded random volatility
//! - 7-day projection: momentum compounded at a fixed daily growth rate
//!
//! None of them fail on a missing upstream column. When their input is
//! absent they return the table unchanged.
//!
//! Momentum is the only stochastic step in the pipeline. The random source is
//! passed in by the caller so seeded runs are reproducible.

use rand::Rng;
use tracing::debug;

use crate::config::TrendConfig;
use crate::core_types::labels::{AlertLevel, Bands, MomentumLevel, ProjectedAlert, TieredLabel};
use crate::core_types::observation::Column;
use crate::core_types::table::ObservationTable;

/// Add `risk_score` and `alert_level`
///
/// Uses `severity_index + spread_impact` when spread has been simulated and
/// the severity index alone otherwise.
pub fn calculate_risk_score(table: &ObservationTable, bands: &Bands) -> ObservationTable {
    if !table.has_column(Column::SeverityIndex) {
        debug!("No severity index, skipping risk score");
        return table.clone();
    }
    let with_spread = table.has_column(Column::SpreadImpact);

    table.par_extend_with(&[Column::RiskScore, Column::AlertLevel], |record| {
        let score = if with_spread {
            match (record.severity_index, record.spread_impact) {
                (Some(s), Some(i)) => Some(s + i),
                _ => None,
            }
        } else {
            record.severity_index
        };
        record.risk_score = score;
        record.alert_level = score.map(|s| AlertLevel::classify(s, bands));
    })
}

/// Add `volatility_factor`, `risk_momentum` and `momentum_level`
///
/// The momentum source is `predicted_severity`, falling back to
/// `severity_index` when spread has not been simulated. One volatility draw
/// is made per record in table order, whether or not the record has a value,
/// so the random stream lines up with row positions.
pub fn calculate_risk_momentum<R: Rng + ?Sized>(
    table: &ObservationTable,
    config: &TrendConfig,
    bands: &Bands,
    rng: &mut R,
) -> ObservationTable {
    let source = if table.has_column(Column::PredictedSeverity) {
        Column::PredictedSeverity
    } else if table.has_column(Column::SeverityIndex) {
        debug!("No predicted severity, momentum falls back to severity index");
        Column::SeverityIndex
    } else {
        debug!("No severity columns, skipping risk momentum");
        return table.clone();
    };

    let volatility_range = config.volatility_min..=config.volatility_max;

    let out = table.extend_with(
        &[
            Column::VolatilityFactor,
            Column::RiskMomentum,
            Column::MomentumLevel,
        ],
        |record| {
            let factor = rng.random_range(volatility_range.clone());
            let momentum = record.score(source).map(|s| s * factor);
            record.volatility_factor = Some(factor);
            record.risk_momentum = momentum;
            record.momentum_level = momentum.map(|m| MomentumLevel::classify(m, bands));
        },
    );

    debug!(rows = out.len(), ?source, "Risk momentum computed");
    out
}

/// Add `projected_7day_severity` and `projected_alert`
///
/// Pass-through when the table has no risk momentum.
pub fn project_7day_impact(
    table: &ObservationTable,
    config: &TrendConfig,
    bands: &Bands,
) -> ObservationTable {
    if !table.has_column(Column::RiskMomentum) {
        debug!("No risk momentum, skipping projection");
        return table.clone();
    }
    let growth = config.growth_multiplier();

    table.par_extend_with(
        &[Column::Projected7DaySeverity, Column::ProjectedAlert],
        |record| {
            let projected = record.risk_momentum.map(|m| m * growth);
            record.projected_7day_severity = projected;
            record.projected_alert = projected.map(|p| ProjectedAlert::classify(p, bands));
        },
    )
}
