//! CSV loading and export
//!
//! Two input shapes are supported:
//! - raw long-format readings, one row per (station, pollutant, timestamp),
//!   as published by the monitoring network ([`RawReading`])
//! - already-cleaned wide tables with one row per (state, city, date) and
//!   the columns `state, city, date, PM2.5, PM10, NO2, latitude, longitude`
//!
//! Unparseable numeric cells (`NA`, blanks) are read as missing values rather
//! than failing the whole file.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::info;

use crate::core_types::observation::{Column, Observation};
use crate::core_types::table::ObservationTable;
use crate::error::PipelineResult;
use crate::ingest::cleaning::parse_reading_date;

/// One long-format pollutant reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub state: String,
    pub city: String,
    #[serde(default)]
    pub station: Option<String>,
    /// Timestamp as published, e.g. `21-02-2024 11:00:00`
    pub last_update: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub longitude: Option<f64>,
    pub pollutant_id: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pollutant_avg: Option<f64>,
}

/// Wide-format row as it appears in a cleaned CSV
#[derive(Debug, Deserialize)]
struct ObservationRow {
    state: String,
    city: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(rename = "PM2.5", default, deserialize_with = "csv::invalid_option")]
    pm25: Option<f64>,
    #[serde(rename = "PM10", default, deserialize_with = "csv::invalid_option")]
    pm10: Option<f64>,
    #[serde(rename = "NO2", default, deserialize_with = "csv::invalid_option")]
    no2: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
}

impl From<ObservationRow> for Observation {
    fn from(row: ObservationRow) -> Observation {
        Observation {
            state: row.state,
            city: row.city,
            date: row.date.as_deref().and_then(parse_reading_date),
            pm25: row.pm25,
            pm10: row.pm10,
            no2: row.no2,
            latitude: row.latitude,
            longitude: row.longitude,
            ..Default::default()
        }
    }
}

fn csv_reader<R: io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Read raw long-format readings
///
/// # Errors
/// Returns [`crate::PipelineError::Ingest`] for a malformed row.
pub fn read_raw_readings<R: io::Read>(reader: R) -> PipelineResult<Vec<RawReading>> {
    let mut rdr = csv_reader(reader);
    let mut readings = Vec::new();
    for row in rdr.deserialize::<RawReading>() {
        readings.push(row?);
    }
    Ok(readings)
}

/// Load raw long-format readings from a file
///
/// # Errors
/// Returns error if the file cannot be opened or a row cannot be parsed.
pub fn load_raw_readings<P: AsRef<Path>>(path: P) -> PipelineResult<Vec<RawReading>> {
    let path = path.as_ref();
    let readings = read_raw_readings(File::open(path)?)?;
    info!(path = %path.display(), rows = readings.len(), "Loaded raw readings");
    Ok(readings)
}

/// Read a cleaned wide-format table
///
/// The schema is taken from the header: a table without a `NO2` header has
/// no NO2 column, which later stages report as missing.
///
/// # Errors
/// Returns [`crate::PipelineError::Ingest`] for a malformed row.
pub fn read_observations<R: io::Read>(reader: R) -> PipelineResult<ObservationTable> {
    let mut rdr = csv_reader(reader);
    let columns: Vec<Column> = rdr.headers()?.iter().filter_map(Column::from_name).collect();

    let mut records = Vec::new();
    for row in rdr.deserialize::<ObservationRow>() {
        records.push(Observation::from(row?));
    }
    Ok(ObservationTable::new(columns, records))
}

/// Load a cleaned wide-format table from a file
///
/// # Errors
/// Returns error if the file cannot be opened or a row cannot be parsed.
pub fn load_observations<P: AsRef<Path>>(path: P) -> PipelineResult<ObservationTable> {
    let path = path.as_ref();
    let table = read_observations(File::open(path)?)?;
    info!(path = %path.display(), rows = table.len(), "Loaded observations");
    Ok(table)
}

/// Text of one cell; missing values are empty
fn cell(record: &Observation, column: Column) -> String {
    fn opt<T: ToString>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    match column {
        Column::State => record.state.clone(),
        Column::City => record.city.clone(),
        Column::Date => opt(record.date.map(|d| d.format("%Y-%m-%d"))),
        Column::SeverityLabel => opt(record.severity_label),
        Column::MomentumLevel => opt(record.momentum_level),
        Column::ProjectedAlert => opt(record.projected_alert),
        Column::AlertLevel => opt(record.alert_level),
        Column::AreaType => opt(record.area_type),
        numeric => opt(record.score(numeric)),
    }
}

/// Write every column of `table` as CSV, in schema order
///
/// # Errors
/// Returns error if the writer fails.
pub fn write_table<W: io::Write>(table: &ObservationTable, writer: W) -> PipelineResult<()> {
    let columns: Vec<Column> = table.columns().collect();
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(columns.iter().map(Column::name))?;
    for record in table {
        wtr.write_record(columns.iter().map(|c| cell(record, *c)))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const RAW: &str = "\
country,state,city,station,last_update,latitude,longitude,pollutant_id,pollutant_min,pollutant_max,pollutant_avg
India,Delhi,Delhi,Anand Vihar,21-02-2024 11:00:00,28.6469,77.3160,PM2.5,60,300,180
India,Delhi,Delhi,Anand Vihar,21-02-2024 11:00:00,28.6469,77.3160,NO2,10,90,NA
India,Goa,Panaji,Panaji,21-02-2024 11:00:00,,,PM10,10,40,25
";

    #[test]
    fn test_read_raw_readings() {
        let readings = read_raw_readings(RAW.as_bytes()).unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].state, "Delhi");
        assert_eq!(readings[0].pollutant_avg, Some(180.0));
        assert_eq!(readings[0].latitude, Some(28.6469));
        assert_eq!(readings[1].pollutant_avg, None);
        assert_eq!(readings[2].latitude, None);
        assert_eq!(readings[2].station.as_deref(), Some("Panaji"));
    }

    #[test]
    fn test_read_observations_schema_from_header() {
        let csv = "state,city,date,PM2.5,PM10\nDelhi,Delhi,2024-02-21,180,250\n";
        let table = read_observations(csv.as_bytes()).unwrap();
        assert!(table.has_column(Column::Pm25));
        assert!(!table.has_column(Column::No2));
        assert!(!table.has_column(Column::Latitude));
        let record = &table.records()[0];
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 2, 21));
        assert_eq!(record.pm10, Some(250.0));
        assert_eq!(record.no2, None);
    }

    #[test]
    fn test_malformed_row_is_reported() {
        let csv = "state,city,PM2.5\nDelhi\n";
        assert!(read_observations(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_write_table_round_trip() {
        let csv = "state,city,date,PM2.5,PM10,NO2,latitude,longitude\n\
                   Delhi,Delhi,2024-02-21,180,250,40,28.6,77.2\n\
                   Goa,Panaji,,20,,8,15.49,73.82\n";
        let table = read_observations(csv.as_bytes()).unwrap();

        let mut out = Vec::new();
        write_table(&table, &mut out).unwrap();
        let reread = read_observations(out.as_slice()).unwrap();
        assert_eq!(reread, table);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_observations("/nonexistent/pollution.csv").unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Io(_)));
    }
}
