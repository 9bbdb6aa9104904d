pub mod cleaning_session;
pub mod column_profiler;
pub mod interpret;
pub mod operation_executor;
