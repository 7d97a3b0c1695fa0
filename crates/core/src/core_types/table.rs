//! Observation table with an explicit column schema
//!
//! Stages never mutate a table they are handed. Each one clones its input,
//! fills in the fields it owns and registers the corresponding columns, so a
//! later stage can check its preconditions against [`ObservationTable::require`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core_types::observation::{Column, Observation};
use crate::error::{PipelineError, PipelineResult};

/// Ordered collection of observations plus the set of columns they carry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObservationTable {
    columns: BTreeSet<Column>,
    records: Vec<Observation>,
}

impl ObservationTable {
    /// Create a table from its schema and rows
    pub fn new(columns: impl IntoIterator<Item = Column>, records: Vec<Observation>) -> Self {
        ObservationTable {
            columns: columns.into_iter().collect(),
            records,
        }
    }

    /// Table with identity, date, pollutant and coordinate columns
    ///
    /// This is the shape produced by the ingest stage after coordinates have
    /// been joined in.
    pub fn with_measurements(records: Vec<Observation>) -> Self {
        let columns = Column::REQUIRED_INPUT
            .into_iter()
            .chain(Column::GEO)
            .chain([Column::Date]);
        Self::new(columns, records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Observation] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.records.iter()
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().copied()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Check that every column in `required` is part of the schema
    ///
    /// # Errors
    /// Returns [`PipelineError::MissingColumn`] naming the first absent column.
    pub fn require(&self, stage: &'static str, required: &[Column]) -> PipelineResult<()> {
        match required.iter().find(|c| !self.has_column(**c)) {
            Some(column) => Err(PipelineError::missing_column(stage, *column)),
            None => Ok(()),
        }
    }

    /// Copy of this table with `columns` registered and each record passed
    /// through `update`
    ///
    /// Existing columns and values are kept; `update` only writes the fields
    /// the calling stage owns.
    pub fn extend_with<F>(&self, columns: &[Column], update: F) -> ObservationTable
    where
        F: FnMut(&mut Observation),
    {
        let mut out = self.clone();
        out.records.iter_mut().for_each(update);
        out.columns.extend(columns.iter().copied());
        out
    }

    /// Parallel variant of [`Self::extend_with`] for record-independent updates
    pub fn par_extend_with<F>(&self, columns: &[Column], update: F) -> ObservationTable
    where
        F: Fn(&mut Observation) + Sync + Send,
    {
        use rayon::prelude::*;

        let mut out = self.clone();
        out.records.par_iter_mut().for_each(update);
        out.columns.extend(columns.iter().copied());
        out
    }

    /// Rows belonging to `state` (exact match), schema unchanged
    pub fn filter_state(&self, state: &str) -> ObservationTable {
        ObservationTable {
            columns: self.columns.clone(),
            records: self
                .records
                .iter()
                .filter(|r| r.state == state)
                .cloned()
                .collect(),
        }
    }

    /// Distinct state names in sorted order
    pub fn states(&self) -> Vec<String> {
        let unique: BTreeSet<&str> = self.records.iter().map(|r| r.state.as_str()).collect();
        unique.into_iter().map(str::to_owned).collect()
    }

    /// Up to `n` records with the highest value in a numeric `column`
    ///
    /// Records without a value are skipped. Ties keep table order.
    pub fn top_by(&self, column: Column, n: usize) -> Vec<&Observation> {
        let mut ranked: Vec<(&Observation, f64)> = self
            .records
            .iter()
            .filter_map(|r| r.score(column).map(|v| (r, v)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.into_iter().take(n).map(|(r, _)| r).collect()
    }

    /// Present values of a numeric column in table order
    pub fn values(&self, column: Column) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.score(column))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ObservationTable {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
