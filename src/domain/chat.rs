use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dataset::CleaningOperation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// One transcript entry. Assistant replies to a cleaning request carry the
/// proposed operations and the dataset version they were computed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<CleaningOperation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_version: Option<u64>,

    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            operations: None,
            dataset_version: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn with_operations(mut self, operations: Vec<CleaningOperation>, version: u64) -> Self {
        self.operations = Some(operations);
        self.dataset_version = Some(version);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::OperationType;

    #[test]
    fn test_assistant_message_with_operations() {
        let op = CleaningOperation::new(OperationType::DropColumn, "Drop id").with_column("id");
        let message = ChatMessage::assistant("I've identified 1 operation to apply.")
            .with_operations(vec![op], 3);

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["datasetVersion"], 3);
        assert_eq!(json["operations"][0]["type"], "DROP_COLUMN");
        assert!(json["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_ids_are_unique_and_plain_messages_omit_operations() {
        let first = ChatMessage::user("hello");
        let second = ChatMessage::user("hello");
        assert_ne!(first.id, second.id);

        let json = serde_json::to_value(&first).unwrap();
        assert!(json.get("operations").is_none());
        assert!(json.get("datasetVersion").is_none());
    }
}
