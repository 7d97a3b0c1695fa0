//! Spread simulator
//!
//! Propagates severity outward from the estimated source with an
//! inverse-distance decay and a wind-alignment amplification term:
//!
//! ```text
//! d          = max(sqrt(Δlat² + Δlon²), d_min)
//! base       = intensity / d
//! θ          = atan2(Δlat, Δlon)
//! alignment  = max(cos(θ - wind_direction), 0)
//! impact     = base × (1 + wind_strength × alignment)
//! predicted  = severity_index + impact
//! ```
//!
//! Distances are taken on the flat degree plane. Only tailwind amplifies;
//! crosswind and headwind contribute nothing, so `impact >= 0` and the
//! predicted severity never drops below the severity index.
//!
//! The kernel is a pure function of its inputs and evaluates records
//! independently, so the parallel map gives the same bits as a serial loop.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analytics::source::SourceEstimate;
use crate::config::SpreadConfig;
use crate::core_types::observation::Column;
use crate::core_types::spatial::GeoPoint;
use crate::core_types::table::ObservationTable;
use crate::error::PipelineResult;

const STAGE: &str = "spread";

/// Spread kernel output for one location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadSample {
    /// Clamped flat-plane distance to the source (degrees)
    pub distance: f64,
    /// `max(cos(θ - wind), 0)`
    pub wind_alignment: f64,
    /// Severity added by dispersion
    pub impact: f64,
}

/// Evaluate the spread kernel for one `location`
pub fn spread_at(location: &GeoPoint, source: &GeoPoint, config: &SpreadConfig) -> SpreadSample {
    let distance = location.planar_distance(source).max(config.min_distance);
    let base_spread = config.intensity_factor * (1.0 / distance);

    let wind_rad = *config.wind.direction.to_radians();
    let bearing = *location.bearing_from(source);
    let wind_alignment = (bearing - wind_rad).cos().max(0.0);
    let wind_effect = config.wind.strength * wind_alignment;

    SpreadSample {
        distance,
        wind_alignment,
        impact: base_spread * (1.0 + wind_effect),
    }
}

/// Add `spread_impact`, `distance_from_source` and `predicted_severity`
///
/// With an empty source estimate every record gets zero impact and zero
/// distance, and `predicted_severity` is left as it was. Records without
/// coordinates get no spread values.
///
/// # Errors
/// Returns [`crate::PipelineError::MissingColumn`] if coordinates or the
/// severity index are absent.
pub fn simulate_spread(
    table: &ObservationTable,
    source: &SourceEstimate,
    config: &SpreadConfig,
) -> PipelineResult<ObservationTable> {
    let Some(origin) = source.location() else {
        warn!("No source estimate, spread set to zero");
        return Ok(table.par_extend_with(
            &[Column::SpreadImpact, Column::DistanceFromSource],
            |record| {
                record.spread_impact = Some(0.0);
                record.distance_from_source = Some(0.0);
            },
        ));
    };

    table.require(STAGE, &[Column::Latitude, Column::Longitude, Column::SeverityIndex])?;

    let out = table.par_extend_with(
        &[
            Column::SpreadImpact,
            Column::DistanceFromSource,
            Column::PredictedSeverity,
        ],
        |record| {
            let Some(location) = record.location() else {
                record.spread_impact = None;
                record.distance_from_source = None;
                record.predicted_severity = None;
                return;
            };
            let sample = spread_at(&location, &origin, config);
            record.distance_from_source = Some(sample.distance);
            record.spread_impact = Some(sample.impact);
            record.predicted_severity = record.severity_index.map(|s| s + sample.impact);
        },
    );

    debug!(
        rows = out.len(),
        source_latitude = origin.latitude,
        source_longitude = origin.longitude,
        intensity = config.intensity_factor,
        wind_direction = *config.wind.direction,
        wind_strength = config.wind.strength,
        "Spread simulated"
    );

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindConditions;
    use crate::core_types::observation::Observation;
    use crate::core_types::units::Degrees;
    use approx::assert_relative_eq;

    fn scored(rows: &[(f64, f64, f64)]) -> ObservationTable {
        let records = rows
            .iter()
            .map(|&(lat, lon, sev)| {
                let mut r = Observation::new("S", "C", Some(1.0), Some(1.0), Some(1.0))
                    .with_location(lat, lon);
                r.severity_index = Some(sev);
                r
            })
            .collect();
        ObservationTable::with_measurements(records).extend_with(&[Column::SeverityIndex], |_| {})
    }

    fn windy(direction: f64, strength: f64) -> SpreadConfig {
        SpreadConfig {
            wind: WindConditions::new(Degrees::new(direction), strength),
            ..SpreadConfig::default()
        }
    }

    #[test]
    fn test_distance_at_source_is_clamped() {
        let source = GeoPoint::new(28.6, 77.2);
        let sample = spread_at(&source, &source, &SpreadConfig::default());
        assert_eq!(sample.distance, 1e-4);
        assert!(sample.impact.is_finite());
        assert_relative_eq!(sample.impact, 0.2 / 1e-4, max_relative = 1e-12);
    }

    #[test]
    fn test_calm_spread_is_inverse_distance() {
        let source = GeoPoint::new(0.0, 0.0);
        let sample = spread_at(&GeoPoint::new(3.0, 4.0), &source, &SpreadConfig::default());
        assert_eq!(sample.distance, 5.0);
        assert_relative_eq!(sample.impact, 0.2 / 5.0, epsilon = 1e-15);
    }

    #[test]
    fn test_tailwind_amplifies_and_headwind_does_not_reduce() {
        let source = GeoPoint::new(0.0, 0.0);
        // Wind toward +longitude (0°): a city due east is downwind
        let config = windy(0.0, 0.5);
        let downwind = spread_at(&GeoPoint::new(0.0, 2.0), &source, &config);
        let upwind = spread_at(&GeoPoint::new(0.0, -2.0), &source, &config);
        let crosswind = spread_at(&GeoPoint::new(2.0, 0.0), &source, &config);

        assert_relative_eq!(downwind.wind_alignment, 1.0, epsilon = 1e-12);
        assert_relative_eq!(downwind.impact, 0.1 * 1.5, epsilon = 1e-12);
        assert_eq!(upwind.wind_alignment, 0.0);
        assert_relative_eq!(upwind.impact, 0.1, epsilon = 1e-12);
        assert!(crosswind.wind_alignment.abs() < 1e-12);
        assert!(crosswind.wind_alignment >= 0.0);
    }

    #[test]
    fn test_wind_direction_in_degrees() {
        let source = GeoPoint::new(0.0, 0.0);
        // 90° points along +latitude
        let config = windy(90.0, 1.0);
        let north = spread_at(&GeoPoint::new(1.0, 0.0), &source, &config);
        assert_relative_eq!(north.wind_alignment, 1.0, epsilon = 1e-12);
        assert_relative_eq!(north.impact, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_alignment_never_negative() {
        let source = GeoPoint::new(0.0, 0.0);
        for direction in (0..=360).step_by(15) {
            let config = windy(f64::from(direction), 1.0);
            for step in 0..24 {
                let angle = f64::from(step) * std::f64::consts::PI / 12.0;
                let p = GeoPoint::new(angle.sin(), angle.cos());
                let sample = spread_at(&p, &source, &config);
                assert!(sample.wind_alignment >= 0.0);
                assert!(sample.impact >= 0.0);
            }
        }
    }

    #[test]
    fn test_predicted_severity_at_least_severity_index() {
        let table = scored(&[(10.0, 10.0, 0.1), (11.0, 12.0, 0.6), (9.5, 8.0, 1.0)]);
        let source = SourceEstimate::at(GeoPoint::new(10.0, 10.0));
        let out = simulate_spread(&table, &source, &windy(45.0, 0.7)).unwrap();
        for record in &out {
            let severity = record.severity_index.unwrap();
            let predicted = record.predicted_severity.unwrap();
            assert!(predicted >= severity);
            assert!(record.distance_from_source.unwrap() > 0.0);
            assert_relative_eq!(
                predicted,
                severity + record.spread_impact.unwrap(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_insufficient_source_zeroes_spread() {
        let table = scored(&[(10.0, 10.0, 0.3)]);
        let out = simulate_spread(&table, &SourceEstimate::insufficient(), &SpreadConfig::default())
            .unwrap();
        let record = &out.records()[0];
        assert_eq!(record.spread_impact, Some(0.0));
        assert_eq!(record.distance_from_source, Some(0.0));
        assert!(record.predicted_severity.is_none());
        assert!(!out.has_column(Column::PredictedSeverity));
    }

    #[test]
    fn test_spread_is_reproducible() {
        let table = scored(&[(10.0, 10.0, 0.1), (11.0, 12.0, 0.6), (9.5, 8.0, 1.0)]);
        let source = SourceEstimate::at(GeoPoint::new(10.5, 10.5));
        let config = windy(200.0, 0.9);
        let a = simulate_spread(&table, &source, &config).unwrap();
        let b = simulate_spread(&table, &source, &config).unwrap();
        let bits = |t: &ObservationTable| -> Vec<u64> {
            t.values(Column::PredictedSeverity)
                .iter()
                .map(|v| v.to_bits())
                .collect()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_missing_coordinates_leave_record_unpredicted() {
        let table = scored(&[(10.0, 10.0, 0.1), (11.0, 12.0, 0.6)])
            .extend_with(&[], |r| {
                if r.severity_index == Some(0.6) {
                    r.longitude = None;
                }
            });
        let source = SourceEstimate::at(GeoPoint::new(10.0, 10.0));
        let out = simulate_spread(&table, &source, &SpreadConfig::default()).unwrap();
        assert!(out.records()[0].predicted_severity.is_some());
        assert!(out.records()[1].predicted_severity.is_none());
        assert!(out.records()[1].spread_impact.is_none());
    }
}
