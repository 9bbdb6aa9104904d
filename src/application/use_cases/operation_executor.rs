// ============================================================
// OPERATION EXECUTOR USE CASE
// ============================================================
// Apply cleaning operations to a dataset. Every operation either
// produces a new dataset or is skipped with a reason, leaving the
// input untouched.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::domain::dataset::{
    Cell, CleaningOperation, Dataset, FilterCondition, FilterOperator, OperationType, Row,
    TargetType,
};

/// Why an operation left the dataset unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    MissingColumn,
    UnknownColumn,
    MissingValue,
    MissingTargetType,
    MissingMapping,
    MissingNewName,
    NameTaken,
    MissingCondition,
    Unsupported,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::MissingColumn => "no column given",
            SkipReason::UnknownColumn => "column not in dataset",
            SkipReason::MissingValue => "no value given",
            SkipReason::MissingTargetType => "no target type given",
            SkipReason::MissingMapping => "no mapping given",
            SkipReason::MissingNewName => "no new column name given",
            SkipReason::NameTaken => "new column name already in use",
            SkipReason::MissingCondition => "no usable filter condition given",
            SkipReason::Unsupported => "operation not supported",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied(Dataset),
    Skipped { dataset: Dataset, reason: SkipReason },
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied(_))
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            ApplyOutcome::Applied(_) => None,
            ApplyOutcome::Skipped { reason, .. } => Some(*reason),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        match self {
            ApplyOutcome::Applied(dataset) | ApplyOutcome::Skipped { dataset, .. } => dataset,
        }
    }

    pub fn into_dataset(self) -> Dataset {
        match self {
            ApplyOutcome::Applied(dataset) | ApplyOutcome::Skipped { dataset, .. } => dataset,
        }
    }
}

/// Outcome of one operation within `apply_all`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReport {
    #[serde(rename = "type")]
    pub kind: OperationType,
    pub description: String,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    pub rows_after: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub operations: Vec<OperationReport>,
}

impl ApplyReport {
    pub fn applied_count(&self) -> usize {
        self.operations.iter().filter(|op| op.applied).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.operations.len() - self.applied_count()
    }
}

/// Apply `operations` left to right. A skipped operation does not stop the
/// ones after it.
pub fn apply_all(data: Dataset, operations: &[CleaningOperation]) -> (Dataset, ApplyReport) {
    let mut report = ApplyReport::default();

    let data = operations.iter().fold(data, |data, op| {
        let outcome = apply_operation(data, op);
        report.operations.push(OperationReport {
            kind: op.kind,
            description: op.description.clone(),
            applied: outcome.is_applied(),
            reason: outcome.skip_reason(),
            rows_after: outcome.dataset().row_count(),
        });
        outcome.into_dataset()
    });

    tracing::info!(
        applied = report.applied_count(),
        skipped = report.skipped_count(),
        rows = data.row_count(),
        "Applied cleaning operations"
    );

    (data, report)
}

/// Apply a single operation
pub fn apply_operation(data: Dataset, op: &CleaningOperation) -> ApplyOutcome {
    match plan(&data, op) {
        Ok(step) => {
            tracing::debug!(operation = %op.kind, "Applying operation");
            ApplyOutcome::Applied(step.run(data))
        }
        Err(reason) => {
            tracing::warn!(operation = %op.kind, reason = %reason, "Skipping operation");
            ApplyOutcome::Skipped {
                dataset: data,
                reason,
            }
        }
    }
}

/// A validated operation, resolved against the dataset header
enum Step<'a> {
    FillMissing { index: usize, value: &'a Cell },
    DropMissing { index: usize },
    ConvertType { index: usize, target: TargetType },
    RenameColumn { index: usize, name: String },
    DropColumn { index: usize },
    FilterRows { index: usize, condition: &'a FilterCondition },
    MapValues { index: usize, mapping: &'a BTreeMap<String, Cell> },
}

fn plan<'a>(data: &Dataset, op: &'a CleaningOperation) -> Result<Step<'a>, SkipReason> {
    if op.kind == OperationType::Unknown {
        return Err(SkipReason::Unsupported);
    }

    let column = op.column.as_deref().ok_or(SkipReason::MissingColumn)?;
    let index = data
        .column_index(column)
        .ok_or(SkipReason::UnknownColumn)?;

    let step = match op.kind {
        OperationType::FillMissing => Step::FillMissing {
            index,
            value: op.value.as_ref().ok_or(SkipReason::MissingValue)?,
        },
        OperationType::DropMissing => Step::DropMissing { index },
        OperationType::ConvertType => Step::ConvertType {
            index,
            target: op.target_type.ok_or(SkipReason::MissingTargetType)?,
        },
        OperationType::RenameColumn => {
            let name = op
                .rename_target()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .ok_or(SkipReason::MissingNewName)?;
            if name != column && data.has_column(&name) {
                return Err(SkipReason::NameTaken);
            }
            Step::RenameColumn { index, name }
        }
        OperationType::DropColumn => Step::DropColumn { index },
        OperationType::FilterRows => {
            let condition = op
                .condition
                .as_ref()
                .filter(|c| !c.operator.needs_value() || c.value.is_some())
                .ok_or(SkipReason::MissingCondition)?;
            Step::FilterRows { index, condition }
        }
        OperationType::MapValues => Step::MapValues {
            index,
            mapping: op.mapping.as_ref().ok_or(SkipReason::MissingMapping)?,
        },
        OperationType::Unknown => return Err(SkipReason::Unsupported),
    };

    Ok(step)
}

impl Step<'_> {
    fn run(self, data: Dataset) -> Dataset {
        let (mut columns, rows) = data.into_parts();

        let rows: Vec<Row> = match self {
            Step::FillMissing { index, value } => map_column(rows, index, |cell| {
                if cell.is_null() {
                    value.clone()
                } else {
                    cell
                }
            }),
            Step::DropMissing { index } => rows
                .into_iter()
                .filter(|row| !row[index].is_null())
                .collect(),
            Step::ConvertType { index, target } => {
                map_column(rows, index, |cell| convert(cell, target))
            }
            Step::RenameColumn { index, name } => {
                columns[index] = name;
                rows
            }
            Step::DropColumn { index } => {
                columns.remove(index);
                rows.into_iter()
                    .map(|mut row| {
                        row.remove(index);
                        row
                    })
                    .collect()
            }
            Step::FilterRows { index, condition } => rows
                .into_iter()
                .filter(|row| matches_condition(&row[index], condition))
                .collect(),
            Step::MapValues { index, mapping } => map_column(rows, index, |cell| {
                if cell.is_null() {
                    return cell;
                }
                match mapping.get(&cell.to_text()) {
                    Some(mapped) => mapped.clone(),
                    None => cell,
                }
            }),
        };

        Dataset::new(columns, rows)
    }
}

fn map_column<F>(rows: Vec<Row>, index: usize, mut f: F) -> Vec<Row>
where
    F: FnMut(Cell) -> Cell,
{
    rows.into_iter()
        .map(|mut row| {
            let cell = std::mem::take(&mut row[index]);
            row[index] = f(cell);
            row
        })
        .collect()
}

/// Null cells are left as they are
fn convert(cell: Cell, target: TargetType) -> Cell {
    if cell.is_null() {
        return cell;
    }

    match target {
        TargetType::Number => cell.to_number().map(Cell::Number).unwrap_or(Cell::Null),
        TargetType::String => Cell::Text(cell.to_text()),
        TargetType::Boolean => Cell::Bool(cell.to_bool()),
    }
}

fn matches_condition(cell: &Cell, condition: &FilterCondition) -> bool {
    match condition.operator {
        FilterOperator::IsMissing => return cell.is_missing(),
        FilterOperator::NotMissing => return !cell.is_missing(),
        _ => {}
    }

    let Some(expected) = condition.value.as_ref() else {
        return false;
    };
    if cell.is_null() {
        return false;
    }

    match condition.operator {
        FilterOperator::Contains => cell
            .to_text()
            .to_lowercase()
            .contains(&expected.to_text().to_lowercase()),
        operator => match compare(cell, expected) {
            Some(ordering) => match operator {
                FilterOperator::Equals => ordering == Ordering::Equal,
                FilterOperator::NotEquals => ordering != Ordering::Equal,
                FilterOperator::GreaterThan => ordering == Ordering::Greater,
                FilterOperator::GreaterOrEqual => ordering != Ordering::Less,
                FilterOperator::LessThan => ordering == Ordering::Less,
                FilterOperator::LessOrEqual => ordering != Ordering::Greater,
                _ => false,
            },
            None => false,
        },
    }
}

/// Numeric when both sides read as numbers, else by textual form
fn compare(cell: &Cell, expected: &Cell) -> Option<Ordering> {
    match (numeric_reading(cell), numeric_reading(expected)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(cell.to_text().cmp(&expected.to_text())),
    }
}

/// Booleans compare as text so that `true` never equals `1`
fn numeric_reading(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Bool(_) => None,
        other => other.to_number(),
    }
}
