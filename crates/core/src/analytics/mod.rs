//! Analytics stages
//!
//! Each stage takes an [`ObservationTable`](crate::ObservationTable) by
//! reference and returns an extended copy (or a table-level scalar). Stages
//! are independent modules; the pipeline fixes their order.

pub mod alerts;
pub mod area;
pub mod reliability;
pub mod risk;
pub mod severity;
pub mod source;
pub mod spread;

pub use alerts::{alert_score, generate_alerts, AlertRow};
pub use area::{classify_city, classify_urban_rural, compare_urban_rural, AreaSummary};
pub use reliability::{calculate_reliability, population_variance, Reliability};
pub use risk::{calculate_risk_momentum, calculate_risk_score, project_7day_impact};
pub use severity::{calculate_severity_index, label_severity, normalize_column, ColumnRange};
pub use source::{
    estimate_pollution_source, estimate_with, ClusterAssigner, Clustering, KMeans, SourceEstimate,
};
pub use spread::{simulate_spread, spread_at, SpreadSample};
