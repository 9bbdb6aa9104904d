// ============================================================
// CLEANING OPERATIONS
// ============================================================
// Closed vocabulary of declarative transformations. Built by the
// interpretation step, consumed once by the executor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    FillMissing,
    DropMissing,
    ConvertType,
    RenameColumn,
    DropColumn,
    FilterRows,
    MapValues,
    #[serde(other)]
    Unknown,
}

impl OperationType {
    pub const ALL: [OperationType; 8] = [
        OperationType::FillMissing,
        OperationType::DropMissing,
        OperationType::ConvertType,
        OperationType::RenameColumn,
        OperationType::DropColumn,
        OperationType::FilterRows,
        OperationType::MapValues,
        OperationType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::FillMissing => "FILL_MISSING",
            OperationType::DropMissing => "DROP_MISSING",
            OperationType::ConvertType => "CONVERT_TYPE",
            OperationType::RenameColumn => "RENAME_COLUMN",
            OperationType::DropColumn => "DROP_COLUMN",
            OperationType::FilterRows => "FILTER_ROWS",
            OperationType::MapValues => "MAP_VALUES",
            OperationType::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a CONVERT_TYPE operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Contains,
    IsMissing,
    NotMissing,
}

impl FilterOperator {
    /// Whether the operator compares against `FilterCondition::value`
    pub fn needs_value(&self) -> bool {
        !matches!(self, FilterOperator::IsMissing | FilterOperator::NotMissing)
    }
}

/// Row predicate for FILTER_ROWS; rows satisfying it are kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub operator: FilterOperator,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Cell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningOperation {
    #[serde(rename = "type")]
    pub kind: OperationType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Fill value, or the new name for a rename when `new_name` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Cell>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<TargetType>,

    /// Textual cell form -> replacement value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<BTreeMap<String, Cell>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<FilterCondition>,

    /// Human-readable description shown in the transcript
    pub description: String,
}

impl CleaningOperation {
    pub fn new(kind: OperationType, description: impl Into<String>) -> Self {
        Self {
            kind,
            column: None,
            value: None,
            target_type: None,
            mapping: None,
            new_name: None,
            condition: None,
            description: description.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Cell>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = Some(target_type);
        self
    }

    pub fn with_mapping<I, K>(mut self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, Cell)>,
        K: Into<String>,
    {
        self.mapping = Some(mapping.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    pub fn with_new_name(mut self, new_name: impl Into<String>) -> Self {
        self.new_name = Some(new_name.into());
        self
    }

    pub fn with_condition(mut self, operator: FilterOperator, value: Option<Cell>) -> Self {
        self.condition = Some(FilterCondition { operator, value });
        self
    }

    /// New column name for RENAME_COLUMN: `new_name`, else a textual `value`
    pub fn rename_target(&self) -> Option<String> {
        self.new_name.clone().or_else(|| match &self.value {
            Some(Cell::Text(name)) => Some(name.clone()),
            _ => None,
        })
    }
}
