// ============================================================
// COLUMN PROFILER USE CASE
// ============================================================
// Summarize each column of a dataset: inferred type, missing and
// distinct counts, a few sample values

use std::collections::HashSet;

use crate::domain::dataset::{Cell, ColumnStats, ColumnType, Dataset};

/// Distinct values kept per column in `ColumnStats::sample`
pub const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct ColumnProfiler {
    sample_size: usize,
}

impl Default for ColumnProfiler {
    fn default() -> Self {
        Self {
            sample_size: SAMPLE_SIZE,
        }
    }
}

impl ColumnProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Stats for every header column; empty when the dataset has no rows
    pub fn profile(&self, data: &Dataset) -> Vec<ColumnStats> {
        if data.is_empty() {
            return Vec::new();
        }

        data.columns()
            .iter()
            .map(|name| {
                let values = data
                    .column_values(name)
                    .map(|values| values.collect::<Vec<_>>())
                    .unwrap_or_default();
                self.profile_column(name, &values)
            })
            .collect()
    }

    fn profile_column(&self, name: &str, values: &[&Cell]) -> ColumnStats {
        let mut missing_count = 0;
        let mut seen = HashSet::new();
        let mut sample = Vec::new();
        let mut presence = TypePresence::default();

        for cell in values {
            let Some(key) = cell.distinct_key() else {
                missing_count += 1;
                continue;
            };

            presence.record(cell);

            if seen.insert(key) && sample.len() < self.sample_size {
                sample.push((*cell).clone());
            }
        }

        ColumnStats {
            name: name.to_string(),
            column_type: presence.infer(),
            missing_count,
            unique_count: seen.len(),
            sample,
        }
    }
}

/// Shorthand for `ColumnProfiler::new().profile(data)`
pub fn profile(data: &Dataset) -> Vec<ColumnStats> {
    ColumnProfiler::new().profile(data)
}

#[derive(Debug, Default)]
struct TypePresence {
    number: bool,
    boolean: bool,
    text: bool,
}

impl TypePresence {
    fn record(&mut self, cell: &Cell) {
        match cell {
            Cell::Number(_) => self.number = true,
            Cell::Bool(_) => self.boolean = true,
            Cell::Text(_) => self.text = true,
            Cell::Null => {}
        }
    }

    fn infer(&self) -> ColumnType {
        match (self.number, self.boolean, self.text) {
            (true, false, false) => ColumnType::Number,
            (false, true, false) => ColumnType::Boolean,
            (true, _, _) => ColumnType::Mixed,
            // all strings, strings with booleans, or nothing present
            _ => ColumnType::String,
        }
    }
}
