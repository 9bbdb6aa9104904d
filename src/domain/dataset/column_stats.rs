// ============================================================
// COLUMN STATISTICS
// ============================================================
// Read-only per-column snapshot fed to the interpretation step

use serde::{Deserialize, Serialize};

use super::Cell;

/// Inferred type of a column's present values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Mixed,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    pub name: String,

    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Occurrences of null or empty-string cells
    pub missing_count: usize,

    /// Distinct non-missing values
    pub unique_count: usize,

    /// Up to five distinct non-missing values, first occurrence first
    pub sample: Vec<Cell>,
}

impl ColumnStats {
    /// One-line summary in the format sent to the interpretation gateway
    pub fn summary_line(&self) -> String {
        let samples = self
            .sample
            .iter()
            .map(Cell::to_text)
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{}: {}, missing: {}, unique: {}, samples: [{}]",
            self.name, self.column_type, self.missing_count, self.unique_count, samples
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let stats = ColumnStats {
            name: "age".to_string(),
            column_type: ColumnType::Number,
            missing_count: 1,
            unique_count: 2,
            sample: vec![Cell::Number(30.0), Cell::Number(41.5)],
        };

        assert_eq!(
            stats.summary_line(),
            "age: number, missing: 1, unique: 2, samples: [30, 41.5]"
        );
    }

    #[test]
    fn test_serializes_camel_case() {
        let stats = ColumnStats {
            name: "ok".to_string(),
            column_type: ColumnType::Boolean,
            missing_count: 0,
            unique_count: 1,
            sample: vec![Cell::Bool(true)],
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["type"], "boolean");
        assert_eq!(json["missingCount"], 0);
        assert_eq!(json["uniqueCount"], 1);
    }
}
