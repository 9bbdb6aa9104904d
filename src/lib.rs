mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

pub use app::{run, store_api_key};
pub use application::use_cases::cleaning_session::CleaningSession;
pub use application::use_cases::column_profiler::{profile, ColumnProfiler};
pub use application::use_cases::interpret::{InterpretationGateway, LlmInterpreter};
pub use application::use_cases::operation_executor::{
    apply_all, apply_operation, ApplyOutcome, ApplyReport, SkipReason,
};
pub use domain::dataset::{Cell, CleaningOperation, ColumnStats, Dataset};
pub use domain::error::{AppError, Result};
pub use infrastructure::csv::{CsvParser, CsvWriter};
