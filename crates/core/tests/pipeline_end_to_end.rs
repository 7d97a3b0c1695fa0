//! End-to-end pipeline runs over a small three-city table
//!
//! Severity spans the full normalized range (0, 0.5, 1.0), so the highest
//! load city is also the estimated source whether it is picked directly
//! (fewer rows than clusters) or by clustering.

mod common;

use approx::assert_relative_eq;
use pollution_grid_core::analytics::{calculate_reliability, calculate_severity_index};
use pollution_grid_core::config::SeverityConfig;
use pollution_grid_core::{
    AreaType, Column, GeoPoint, Observation, ObservationTable, PipelineConfig, PipelineOutcome,
    PollutionPipeline, Scenario,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn three_cities() -> ObservationTable {
    ObservationTable::with_measurements(vec![
        Observation::new("Tamil Nadu", "Ooty", Some(10.0), Some(20.0), Some(5.0))
            .with_location(11.41, 76.70),
        Observation::new("Maharashtra", "Pune", Some(50.0), Some(60.0), Some(15.0))
            .with_location(18.52, 73.86),
        Observation::new("Delhi", "Delhi", Some(90.0), Some(100.0), Some(25.0))
            .with_location(28.61, 77.21),
    ])
}

fn run(table: &ObservationTable, scenario: Scenario, seed: u64) -> PipelineOutcome {
    PollutionPipeline::new(PipelineConfig::default())
        .unwrap()
        .run(table, scenario, &mut StdRng::seed_from_u64(seed))
        .unwrap()
}

#[test]
fn test_severity_spans_normalized_range() {
    let scored = calculate_severity_index(&three_cities(), &SeverityConfig::default()).unwrap();
    let severity = scored.values(Column::SeverityIndex);
    assert_relative_eq!(severity[0], 0.0);
    assert_relative_eq!(severity[1], 0.5);
    assert_relative_eq!(severity[2], 1.0);
}

#[test]
fn test_reliability_of_complete_table() {
    // Variances 1066.67 / 1066.67 / 66.67 → stability 1 / 734.33
    let reliability = calculate_reliability(&three_cities()).unwrap();
    assert_relative_eq!(reliability.completeness, 1.0);
    assert_relative_eq!(reliability.score, 0.7004);
}

#[test]
fn test_three_rows_cluster_onto_highest_load_city() {
    let outcome = run(&three_cities(), Scenario::Normal, 42);
    let report = outcome.report().unwrap();

    assert_eq!(report.source.location(), Some(GeoPoint::new(28.61, 77.21)));
    assert_eq!(report.alerts[0].city, "Delhi");
    assert_eq!(report.summary.highest_risk_city.as_deref(), Some("Delhi"));
    assert!(report
        .alerts
        .windows(2)
        .all(|w| w[0].risk_score >= w[1].risk_score));
}

#[test]
fn test_two_rows_fall_back_to_highest_severity_row() {
    let table = ObservationTable::with_measurements(three_cities().records()[1..].to_vec());
    let outcome = run(&table, Scenario::Normal, 42);
    let report = outcome.report().unwrap();

    assert_eq!(report.source.location(), Some(GeoPoint::new(28.61, 77.21)));
    assert_eq!(report.alerts.len(), 2);
    assert_eq!(report.alerts[0].city, "Delhi");
}

#[test]
fn test_spread_never_lowers_predicted_severity() {
    let outcome = run(&three_cities(), Scenario::Normal, 7);
    let report = outcome.report().unwrap();
    for record in &report.table {
        let severity = record.severity_index.unwrap();
        let predicted = record.predicted_severity.unwrap();
        assert!(predicted >= severity);
        assert!(record.spread_impact.unwrap() >= 0.0);
        assert!(record.distance_from_source.unwrap() >= 1e-4);
    }
}

#[test]
fn test_industrial_surge_scales_predictions_and_keeps_ranking() {
    let table = three_cities();
    let normal = run(&table, Scenario::Normal, 42);
    let surge = run(&table, Scenario::IndustrialSurge, 42);
    let normal = normal.report().unwrap();
    let surge = surge.report().unwrap();

    for (n, s) in normal.table.iter().zip(&surge.table) {
        assert_relative_eq!(
            s.predicted_severity.unwrap(),
            n.predicted_severity.unwrap() * 1.3,
            max_relative = 1e-12
        );
        // Same seed, same volatility draws
        assert_eq!(s.volatility_factor, n.volatility_factor);
    }

    let order = |alerts: &[pollution_grid_core::AlertRow]| {
        alerts.iter().map(|a| a.city.clone()).collect::<Vec<_>>()
    };
    assert_eq!(order(normal.alerts.as_slice()), order(surge.alerts.as_slice()));
}

#[test]
fn test_containment_lowers_projection() {
    let table = three_cities();
    let normal = run(&table, Scenario::Normal, 5);
    let contained = run(&table, Scenario::EmergencyContainment, 5);
    let normal_mean = normal.report().unwrap().summary.mean_predicted_severity.unwrap();
    let contained_mean = contained
        .report()
        .unwrap()
        .summary
        .mean_predicted_severity
        .unwrap();
    assert_relative_eq!(contained_mean, normal_mean * 0.7, max_relative = 1e-12);
}

#[test]
fn test_urban_rural_split() {
    let outcome = run(&three_cities(), Scenario::Normal, 42);
    let report = outcome.report().unwrap();

    let ooty = report.table.iter().find(|r| r.city == "Ooty").unwrap();
    assert_eq!(ooty.area_type, Some(AreaType::Rural));
    let pune = report.table.iter().find(|r| r.city == "Pune").unwrap();
    assert_eq!(pune.area_type, Some(AreaType::Urban));

    // Delhi sits on the source, so urban dominates
    assert_eq!(report.area_summary[0].area_type, AreaType::Urban);
    assert_eq!(report.area_summary.len(), 2);
}

#[test]
fn test_state_filter_narrows_analysis() {
    let table = three_cities().filter_state("Delhi");
    let outcome = run(&table, Scenario::Normal, 42);
    let report = outcome.report().unwrap();
    assert_eq!(report.summary.cities_analyzed, 1);
    assert_eq!(report.alerts.len(), 1);
}

#[test]
fn test_missing_coordinates_stop_after_reliability() {
    let records = three_cities()
        .records()
        .iter()
        .map(|r| Observation {
            latitude: None,
            longitude: None,
            ..r.clone()
        })
        .collect();
    let outcome = run(&ObservationTable::with_measurements(records), Scenario::Normal, 42);

    match outcome {
        PipelineOutcome::InsufficientData { reliability } => {
            assert_relative_eq!(reliability.score, 0.7004);
        }
        PipelineOutcome::Complete(_) => panic!("expected insufficient data"),
    }
}

#[test]
fn test_empty_table_is_insufficient_with_zero_reliability() {
    let outcome = run(&ObservationTable::with_measurements(Vec::new()), Scenario::Normal, 1);
    assert!(outcome.report().is_none());
    assert_eq!(outcome.reliability().score, 0.0);
}
