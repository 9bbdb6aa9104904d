// ============================================================
// INTERPRETATION USE CASE
// ============================================================
// Turn a natural-language cleaning request plus column statistics
// into candidate cleaning operations. Never applies anything.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::dataset::{
    parse_number, Cell, CleaningOperation, ColumnStats, ColumnType, OperationType,
};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::{clean_llm_response, extract_json_array};

#[async_trait]
pub trait InterpretationGateway: Send + Sync {
    async fn interpret(
        &self,
        request: &str,
        stats: &[ColumnStats],
    ) -> Result<Vec<CleaningOperation>>;
}

const SYSTEM_PROMPT: &str = r#"You are DataToyAI, a data engineer who turns plain-language requests into dataset cleaning steps.
You receive the column statistics of the current dataset and a request from the user.
Answer with a JSON array of cleaning operations and nothing else.

Operation types:
- FILL_MISSING: replace null cells of `column` with `value`.
- DROP_MISSING: remove rows where `column` is null.
- CONVERT_TYPE: convert `column` to `targetType` ("string", "number" or "boolean").
- RENAME_COLUMN: rename `column` to `newName`.
- DROP_COLUMN: remove `column`.
- FILTER_ROWS: keep rows where `column` satisfies `condition` {"operator", "value"}. Operators: equals, notEquals, greaterThan, greaterOrEqual, lessThan, lessOrEqual, contains, isMissing, notMissing.
- MAP_VALUES: replace values of `column` using `mapping`. When a mapping object cannot be given, put it in `value` as a JSON object string, e.g. "{\"Male\": 0, \"Female\": 1}".

Rules:
- Every operation needs `type` and a short `description` of what it does.
- For a request to clean everything, impute columns with missing values (mean for numbers, most frequent value otherwise) or drop a column when more than half of it is missing.
- When the request is vague, make a reasonable assumption and say so in the description.
- Only use column names that appear in the statistics."#;

/// Interpretation backed by a language model
pub struct LlmInterpreter {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: LLMConfig,
}

impl LlmInterpreter {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>, config: LLMConfig) -> Self {
        Self { llm_client, config }
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    fn check_credentials(&self) -> Result<()> {
        if self.config.provider != LLMProvider::Local && !self.config.has_api_key() {
            return Err(AppError::LLMError("API key not found".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl InterpretationGateway for LlmInterpreter {
    async fn interpret(
        &self,
        request: &str,
        stats: &[ColumnStats],
    ) -> Result<Vec<CleaningOperation>> {
        self.check_credentials()?;

        let user_prompt = build_user_prompt(request, stats);
        tracing::info!(
            provider = ?self.config.provider,
            model = %self.config.model,
            columns = stats.len(),
            "Interpreting cleaning request"
        );

        let raw = self
            .llm_client
            .generate_structured(&self.config, SYSTEM_PROMPT, &user_prompt, &response_schema())
            .await?;

        let operations = parse_operations(&raw)?
            .into_iter()
            .map(|op| normalize_operation(op, stats))
            .collect::<Vec<_>>();

        tracing::info!(operations = operations.len(), "Interpretation finished");
        Ok(operations)
    }
}

/// User turn: one stats line per column, then the quoted request
pub fn build_user_prompt(request: &str, stats: &[ColumnStats]) -> String {
    let summary = stats
        .iter()
        .map(ColumnStats::summary_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Current Dataset Stats:\n{}\n\nUser Request: \"{}\"\n\nGenerate the cleaning operations.",
        summary, request
    )
}

/// Structured output schema for providers that accept one
pub fn response_schema() -> Value {
    let kinds: Vec<&str> = OperationType::ALL.iter().map(|k| k.as_str()).collect();

    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "type": { "type": "STRING", "enum": kinds },
                "column": { "type": "STRING", "description": "Target column name" },
                "value": {
                    "type": "STRING",
                    "description": "Fill value, or a JSON object string holding a MAP_VALUES mapping"
                },
                "targetType": { "type": "STRING", "enum": ["string", "number", "boolean"] },
                "newName": { "type": "STRING", "description": "New name for RENAME_COLUMN" },
                "condition": {
                    "type": "OBJECT",
                    "properties": {
                        "operator": {
                            "type": "STRING",
                            "enum": [
                                "equals", "notEquals", "greaterThan", "greaterOrEqual",
                                "lessThan", "lessOrEqual", "contains", "isMissing", "notMissing"
                            ]
                        },
                        "value": { "type": "STRING" }
                    },
                    "required": ["operator"]
                },
                "description": { "type": "STRING" }
            },
            "required": ["type", "description"]
        }
    })
}

/// Decode a model answer into operations. Empty answers give no
/// operations; answers without a JSON array are an error; records that
/// do not decode are dropped.
pub fn parse_operations(raw: &str) -> Result<Vec<CleaningOperation>> {
    let cleaned = clean_llm_response(raw);
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }

    let array = extract_json_array(&cleaned).ok_or_else(|| {
        AppError::LLMError("Model response does not contain a JSON array".to_string())
    })?;

    let records: Vec<Value> = serde_json::from_str(array)
        .map_err(|e| AppError::LLMError(format!("Failed to parse operations: {}", e)))?;

    let operations = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, mut record)| {
            lift_object_value(&mut record);
            match serde_json::from_value::<CleaningOperation>(record) {
                Ok(op) => Some(op),
                Err(e) => {
                    tracing::warn!(record = index, error = %e, "Dropping malformed operation");
                    None
                }
            }
        })
        .collect();

    Ok(operations)
}

/// An object given as `value` is a mapping; cells cannot hold objects
fn lift_object_value(record: &mut Value) {
    let Some(fields) = record.as_object_mut() else {
        return;
    };

    if let Some(Value::Object(_)) = fields.get("value") {
        let value = fields.remove("value");
        if !fields.contains_key("mapping") {
            if let Some(mapping) = value {
                fields.insert("mapping".to_string(), mapping);
            }
        }
    }
}

/// Adjust values the provider could only send as strings
pub fn normalize_operation(mut op: CleaningOperation, stats: &[ColumnStats]) -> CleaningOperation {
    if op.kind == OperationType::MapValues && op.mapping.is_none() {
        if let Some(Cell::Text(text)) = &op.value {
            if let Ok(mapping) = serde_json::from_str::<BTreeMap<String, Cell>>(text) {
                op.mapping = Some(mapping);
                op.value = None;
            }
        }
    }

    let column_type = op
        .column
        .as_deref()
        .and_then(|name| stats.iter().find(|s| s.name == name))
        .map(|s| s.column_type);

    if let Some(column_type) = column_type {
        if op.kind != OperationType::RenameColumn {
            op.value = op.value.map(|value| coerce_for_column(value, column_type));
        }
        if let Some(condition) = op.condition.as_mut() {
            condition.value = condition
                .value
                .take()
                .map(|value| coerce_for_column(value, column_type));
        }
    }

    op
}

fn coerce_for_column(value: Cell, column_type: ColumnType) -> Cell {
    match (&value, column_type) {
        (Cell::Text(text), ColumnType::Number) => parse_number(text.trim())
            .map(Cell::Number)
            .unwrap_or(value),
        (Cell::Text(text), ColumnType::Boolean) => match text.trim().to_lowercase().as_str() {
            "true" => Cell::Bool(true),
            "false" => Cell::Bool(false),
            _ => value,
        },
        _ => value,
    }
}
