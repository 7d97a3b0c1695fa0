//! Pollution Grid Core Library
//!
//! Air-quality analytics over per-city pollutant readings. Raw monitoring
//! station data is cleaned into one record per (state, city, date), scored
//! for severity, and run through a chain of spatial and trend models:
//!
//! - weighted severity index over normalized PM2.5, PM10 and NO2
//! - pollution source estimation by spatial clustering
//! - inverse-distance spread with wind amplification
//! - data reliability scoring
//! - risk momentum, 7-day projection and priority alerts
//! - urban/rural comparison
//!
//! Stages are plain functions over an [`ObservationTable`] and can be called
//! individually; [`PollutionPipeline`] runs them in order.

// Core types and utilities
pub mod config;
pub mod core_types;
pub mod error;

// Data preparation
pub mod ingest;

// Analytics stages and orchestration
pub mod analytics;
pub mod pipeline;

// Re-export core types
pub use config::{Normalization, PipelineConfig, SeverityWeights, WindConditions};
pub use core_types::{AlertLevel, AreaType, MomentumLevel, ProjectedAlert, SeverityLabel};
pub use core_types::{Column, GeoPoint, Observation, ObservationTable};
pub use error::{PipelineError, PipelineResult};

// Re-export ingest entry points
pub use ingest::{load_observations, load_raw_readings, prepare_observations, RawReading};

// Re-export pipeline types
pub use analytics::{AlertRow, AreaSummary, Reliability, SourceEstimate};
pub use pipeline::{ExecutiveSummary, PipelineOutcome, PipelineReport, PollutionPipeline, Scenario};
