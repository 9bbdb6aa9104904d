pub mod use_cases;

pub use use_cases::cleaning_session::CleaningSession;
pub use use_cases::interpret::LlmInterpreter;
