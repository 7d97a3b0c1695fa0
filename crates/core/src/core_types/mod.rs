//! Core types and utilities

pub mod labels;
pub mod observation;
pub mod spatial;
pub mod table;
pub mod units;

pub use labels::{
    AlertLevel, AreaType, Bands, MomentumLevel, ProjectedAlert, SeverityLabel, TieredLabel,
};
pub use observation::{Column, Observation, TRACKED_POLLUTANTS};
pub use spatial::{round_to, GeoPoint};
pub use table::ObservationTable;
pub use units::{Degrees, Radians};
