//! End-to-end analysis pipeline
//!
//! [`PollutionPipeline`] chains the analytics stages in the order the
//! dashboard presents them:
//!
//! severity → combined risk → reliability → source → spread → scenario →
//! severity label → momentum → projection → alerts → urban/rural
//!
//! When no source can be estimated the run stops after the reliability score
//! and reports [`PipelineOutcome::InsufficientData`].

pub mod scenario;

pub use scenario::Scenario;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::analytics::{
    calculate_reliability, calculate_risk_momentum, calculate_risk_score,
    calculate_severity_index, classify_urban_rural, compare_urban_rural, estimate_with,
    generate_alerts, label_severity, project_7day_impact, simulate_spread, AlertRow, AreaSummary,
    ClusterAssigner, KMeans, Reliability, SourceEstimate,
};
use crate::config::PipelineConfig;
use crate::core_types::observation::{Column, Observation};
use crate::core_types::table::ObservationTable;
use crate::error::PipelineResult;

/// Headline figures of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub reliability: f64,
    /// City at the top of the alert ranking
    pub highest_risk_city: Option<String>,
    pub highest_predicted_severity: Option<f64>,
    pub mean_predicted_severity: Option<f64>,
    /// Distinct (state, city) locations in the input
    pub cities_analyzed: usize,
}

/// Everything a completed run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub scenario: Scenario,
    /// Fully enriched table
    pub table: ObservationTable,
    pub source: SourceEstimate,
    pub reliability: Reliability,
    pub alerts: Vec<AlertRow>,
    pub area_summary: Vec<AreaSummary>,
    pub summary: ExecutiveSummary,
}

impl PipelineReport {
    /// Records with the highest risk momentum
    pub fn top_momentum(&self, n: usize) -> Vec<&Observation> {
        self.table.top_by(Column::RiskMomentum, n)
    }

    /// Records with the highest 7-day projected severity
    pub fn top_projected(&self, n: usize) -> Vec<&Observation> {
        self.table.top_by(Column::Projected7DaySeverity, n)
    }
}

/// Result of [`PollutionPipeline::run`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineOutcome {
    Complete(Box<PipelineReport>),
    /// No geolocated severity data; only the reliability could be scored
    InsufficientData { reliability: Reliability },
}

impl PipelineOutcome {
    pub fn report(&self) -> Option<&PipelineReport> {
        match self {
            PipelineOutcome::Complete(report) => Some(report.as_ref()),
            PipelineOutcome::InsufficientData { .. } => None,
        }
    }

    pub fn reliability(&self) -> Reliability {
        match self {
            PipelineOutcome::Complete(report) => report.reliability,
            PipelineOutcome::InsufficientData { reliability } => *reliability,
        }
    }
}

/// Configured analysis pipeline
pub struct PollutionPipeline {
    config: PipelineConfig,
    assigner: Box<dyn ClusterAssigner>,
}

impl PollutionPipeline {
    /// Create a pipeline using seeded k-means for source estimation
    ///
    /// # Errors
    /// Returns [`crate::PipelineError::InvalidParameter`] if the configuration
    /// fails validation.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        let assigner = Box::new(KMeans::from_config(&config.clustering));
        Ok(PollutionPipeline { config, assigner })
    }

    /// Replace the clustering algorithm used by the source estimator
    pub fn with_cluster_assigner(mut self, assigner: impl ClusterAssigner + 'static) -> Self {
        self.assigner = Box::new(assigner);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over `table`
    ///
    /// `rng` drives the momentum volatility draws; pass a seeded generator
    /// for reproducible output.
    ///
    /// # Errors
    /// Returns [`crate::PipelineError::MissingColumn`] if `table` lacks a
    /// column a stage requires.
    pub fn run<R: Rng + ?Sized>(
        &self,
        table: &ObservationTable,
        scenario: Scenario,
        rng: &mut R,
    ) -> PipelineResult<PipelineOutcome> {
        let config = &self.config;
        let thresholds = &config.thresholds;
        info!(rows = table.len(), %scenario, "Starting pollution analysis");

        let scored = calculate_severity_index(table, &config.severity)?;
        let scored = calculate_risk_score(&scored, &thresholds.risk);
        let reliability = calculate_reliability(&scored)?;

        let source = estimate_with(&scored, config.clustering.clusters, self.assigner.as_ref())?;
        if source.is_insufficient() {
            warn!(
                reliability = reliability.score,
                "Insufficient geolocated data, stopping after reliability"
            );
            return Ok(PipelineOutcome::InsufficientData { reliability });
        }

        let spread = simulate_spread(&scored, &source, &config.spread)?;
        let adjusted = scenario.apply(&spread)?;
        let labelled = label_severity(&adjusted, &thresholds.severity);
        let momentum =
            calculate_risk_momentum(&labelled, &config.trend, &thresholds.momentum, rng);
        let projected = project_7day_impact(&momentum, &config.trend, &thresholds.projection);

        let alerts = generate_alerts(
            &projected,
            reliability.score,
            &thresholds.alert,
            config.alerts.top_n,
        )?;
        let table = classify_urban_rural(&projected, &config.urban_keywords)?;
        let area_summary = compare_urban_rural(&table)?;

        let summary = summarize(&table, &reliability, &alerts);
        info!(
            reliability = summary.reliability,
            cities = summary.cities_analyzed,
            alerts = alerts.len(),
            highest_risk_city = summary.highest_risk_city.as_deref().unwrap_or("-"),
            "Analysis complete"
        );

        Ok(PipelineOutcome::Complete(Box::new(PipelineReport {
            scenario,
            table,
            source,
            reliability,
            alerts,
            area_summary,
            summary,
        })))
    }
}

fn summarize(
    table: &ObservationTable,
    reliability: &Reliability,
    alerts: &[AlertRow],
) -> ExecutiveSummary {
    let predicted = table.values(Column::PredictedSeverity);
    let highest = predicted.iter().copied().max_by(f64::total_cmp);
    let mean = (!predicted.is_empty())
        .then(|| predicted.iter().sum::<f64>() / predicted.len() as f64);
    let cities: BTreeSet<(&str, &str)> = table
        .iter()
        .map(|r| (r.state.as_str(), r.city.as_str()))
        .collect();

    ExecutiveSummary {
        reliability: reliability.score,
        highest_risk_city: alerts.first().map(|a| a.city.clone()),
        highest_predicted_severity: highest,
        mean_predicted_severity: mean,
        cities_analyzed: cities.len(),
    }
}
