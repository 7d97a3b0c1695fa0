//! Long → wide reshaping of raw readings and coordinate join

use chrono::{NaiveDate, NaiveDateTime};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::core_types::observation::{Column, Observation};
use crate::core_types::spatial::GeoPoint;
use crate::core_types::table::ObservationTable;
use crate::ingest::loader::RawReading;

const DATETIME_FORMATS: [&str; 3] = [
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d-%m-%Y"];

/// Parse a reading timestamp down to its calendar date
pub fn parse_reading_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        })
}

/// Median of `values`; averages the middle pair for an even count
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Running mean of one pollutant for one pivot key
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

type PivotKey = (String, String, NaiveDate);

/// Reshape raw readings into one record per (state, city, date)
///
/// Only the tracked pollutants are kept. Readings with an unparseable
/// timestamp or no value are dropped; repeated readings for a key are
/// averaged. A pollutant with no readings at all is left out of the schema.
/// Remaining gaps are filled with the column median.
pub fn clean_readings(readings: &[RawReading]) -> ObservationTable {
    let mut pivot: BTreeMap<PivotKey, [Accumulator; 3]> = BTreeMap::new();
    let mut observed = [false; 3];
    let mut bad_dates = 0usize;

    for reading in readings {
        let Some(slot) = Column::from_name(&reading.pollutant_id)
            .and_then(|c| Column::POLLUTANTS.iter().position(|p| *p == c))
        else {
            continue;
        };
        let Some(date) = parse_reading_date(&reading.last_update) else {
            bad_dates += 1;
            continue;
        };
        let Some(value) = reading.pollutant_avg.filter(|v| v.is_finite()) else {
            continue;
        };

        let key = (reading.state.clone(), reading.city.clone(), date);
        pivot.entry(key).or_default()[slot].push(value);
        observed[slot] = true;
    }

    if bad_dates > 0 {
        warn!(dropped = bad_dates, "Readings with unparseable timestamps dropped");
    }

    let records: Vec<Observation> = pivot
        .into_iter()
        .map(|((state, city, date), acc)| {
            Observation::new(state, city, acc[0].mean(), acc[1].mean(), acc[2].mean())
                .with_date(date)
        })
        .collect();

    let columns = [Column::State, Column::City, Column::Date].into_iter().chain(
        Column::POLLUTANTS
            .into_iter()
            .zip(observed)
            .filter_map(|(c, seen)| seen.then_some(c)),
    );
    let table = impute_median(&ObservationTable::new(columns, records));

    info!(
        readings = readings.len(),
        records = table.len(),
        "Readings pivoted to daily city records"
    );
    table
}

/// Fill missing pollutant values with the median of each column
pub fn impute_median(table: &ObservationTable) -> ObservationTable {
    let mut medians = [None; 3];
    for (slot, column) in Column::POLLUTANTS.into_iter().enumerate() {
        if table.has_column(column) {
            medians[slot] = median(&mut table.values(column));
        }
    }
    debug!(?medians, "Pollutant medians");

    table.extend_with(&[], |record| {
        for (slot, column) in Column::POLLUTANTS.into_iter().enumerate() {
            if let Some(value) = record.pollutant_mut(column) {
                if value.is_none() {
                    *value = medians[slot];
                }
            }
        }
    })
}

/// (state, city) → coordinate lookup built from raw readings
#[derive(Debug, Clone, Default)]
pub struct CoordinateLookup {
    coordinates: FxHashMap<(String, String), Option<GeoPoint>>,
}

impl CoordinateLookup {
    /// First reading per (state, city) wins, even if it has no coordinates
    pub fn from_readings(readings: &[RawReading]) -> Self {
        let mut coordinates = FxHashMap::default();
        for reading in readings {
            coordinates
                .entry((reading.state.clone(), reading.city.clone()))
                .or_insert_with(|| match (reading.latitude, reading.longitude) {
                    (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
                    _ => None,
                });
        }
        CoordinateLookup { coordinates }
    }

    pub fn get(&self, state: &str, city: &str) -> Option<GeoPoint> {
        self.coordinates
            .get(&(state.to_owned(), city.to_owned()))
            .copied()
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

/// Left-join coordinates onto `table` by (state, city)
///
/// Records without a match keep absent coordinates.
pub fn attach_coordinates(table: &ObservationTable, lookup: &CoordinateLookup) -> ObservationTable {
    let out = table.extend_with(&Column::GEO, |record| {
        let point = lookup.get(&record.state, &record.city);
        record.latitude = point.map(|p| p.latitude);
        record.longitude = point.map(|p| p.longitude);
    });

    let unmatched = out.iter().filter(|r| r.location().is_none()).count();
    if unmatched > 0 {
        debug!(unmatched, "Records without coordinates");
    }
    out
}

/// Clean raw readings and join their coordinates in one step
pub fn prepare_observations(readings: &[RawReading]) -> ObservationTable {
    let lookup = CoordinateLookup::from_readings(readings);
    attach_coordinates(&clean_readings(readings), &lookup)
}
