pub mod chat;
pub mod error;
pub mod llm_config;

// Tabular data cleaning module
pub mod dataset;
