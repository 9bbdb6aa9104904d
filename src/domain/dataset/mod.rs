// ============================================================
// DATASET DOMAIN LAYER
// ============================================================
// Core types for tabular data cleaning
// No I/O, no async

mod cell;
mod column_stats;
mod dataset;
mod operation;

pub use cell::{format_number, parse_number, strip_quotes, Cell, CellKey};
pub use column_stats::{ColumnStats, ColumnType};
pub use dataset::{Dataset, Row};
pub use operation::{
    CleaningOperation, FilterCondition, FilterOperator, OperationType, TargetType,
};
