//! Input preparation: CSV loading, long → wide cleaning, coordinate join

pub mod cleaning;
pub mod loader;

pub use cleaning::{
    attach_coordinates, clean_readings, impute_median, median, parse_reading_date,
    prepare_observations, CoordinateLookup,
};
pub use loader::{
    load_observations, load_raw_readings, read_observations, read_raw_readings, write_table,
    RawReading,
};
