// ============================================================
// CLEANING SESSION USE CASE
// ============================================================
// Owns the current dataset, its version and the chat transcript.
// Loads CSV, asks the interpretation gateway for operations,
// applies confirmed operations and exports the result.

use crate::application::use_cases::column_profiler::ColumnProfiler;
use crate::application::use_cases::interpret::InterpretationGateway;
use crate::application::use_cases::operation_executor::{apply_all, ApplyReport};
use crate::domain::chat::ChatMessage;
use crate::domain::dataset::{CleaningOperation, ColumnStats, Dataset};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::csv::{CsvParser, CsvWriter};

pub const NO_DATASET_REPLY: &str = "Please upload a dataset first.";
pub const NO_OPERATIONS_REPLY: &str =
    "I couldn't identify any specific cleaning operations from your request. Could you rephrase?";
pub const FAILURE_REPLY: &str =
    "Sorry, I encountered an error processing your request. Please check your API key and try again.";
pub const APPLIED_REPLY: &str = "Operations applied successfully! The dataset has been updated.";

/// Statistics snapshot a chat request is interpreted against
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub stats: Vec<ColumnStats>,
    pub version: u64,
}

#[derive(Debug)]
pub enum ChatTurn {
    Answered(ChatMessage),
    Interpret(PendingRequest),
}

#[derive(Default)]
pub struct CleaningSession {
    file_name: Option<String>,
    dataset: Option<Dataset>,
    version: u64,
    messages: Vec<ChatMessage>,
    parser: CsvParser,
    writer: CsvWriter,
    profiler: ColumnProfiler,
}

impl CleaningSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Bumped on every load and every apply
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True when a dataset with at least one row is loaded
    pub fn has_data(&self) -> bool {
        self.dataset.as_ref().map(|d| !d.is_empty()).unwrap_or(false)
    }

    /// Parse `content`, replace the dataset and restart the transcript
    pub fn load_csv(&mut self, file_name: &str, content: &str) -> &Dataset {
        let dataset = self.parser.parse_content(content);
        self.replace_dataset(file_name, dataset)
    }

    /// Same as `load_csv` for raw uploaded bytes
    pub fn load_bytes(&mut self, file_name: &str, bytes: &[u8]) -> &Dataset {
        let dataset = self.parser.parse_bytes(bytes);
        self.replace_dataset(file_name, dataset)
    }

    fn replace_dataset(&mut self, file_name: &str, dataset: Dataset) -> &Dataset {
        // Column count follows the first row, as the grid shows it
        let columns = if dataset.is_empty() {
            0
        } else {
            dataset.column_count()
        };

        tracing::info!(
            file = file_name,
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "Loaded dataset"
        );

        self.messages = vec![ChatMessage::assistant(format!(
            "I've loaded {} with {} rows and {} columns. How would you like to clean it?",
            file_name,
            dataset.row_count(),
            columns
        ))];
        self.file_name = Some(file_name.to_string());
        self.version += 1;

        self.dataset.insert(dataset)
    }

    /// Fresh statistics for the current dataset
    pub fn column_stats(&self) -> Vec<ColumnStats> {
        self.dataset
            .as_ref()
            .map(|d| self.profiler.profile(d))
            .unwrap_or_default()
    }

    /// Record the user's request and reply with proposed operations.
    /// Gateway failures become a chat reply; they are never returned.
    pub async fn send_message(
        &mut self,
        text: &str,
        gateway: &dyn InterpretationGateway,
    ) -> ChatMessage {
        match self.begin_message(text) {
            ChatTurn::Answered(reply) => reply,
            ChatTurn::Interpret(pending) => {
                let outcome = gateway.interpret(text, &pending.stats).await;
                self.finish_message(pending, outcome)
            }
        }
    }

    /// First half of `send_message`: records the request and either answers
    /// it at once or hands back what the gateway needs. Callers sharing the
    /// session may release it while the gateway runs.
    pub fn begin_message(&mut self, text: &str) -> ChatTurn {
        self.messages.push(ChatMessage::user(text));

        if !self.has_data() {
            let reply = ChatMessage::assistant(NO_DATASET_REPLY);
            self.messages.push(reply.clone());
            return ChatTurn::Answered(reply);
        }

        ChatTurn::Interpret(PendingRequest {
            stats: self.column_stats(),
            version: self.version,
        })
    }

    /// Second half of `send_message`: turns the gateway outcome into the reply
    pub fn finish_message(
        &mut self,
        pending: PendingRequest,
        outcome: Result<Vec<CleaningOperation>>,
    ) -> ChatMessage {
        let reply = match outcome {
            Ok(operations) => {
                let content = proposal_reply(operations.len());
                ChatMessage::assistant(content).with_operations(operations, pending.version)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to interpret cleaning request");
                ChatMessage::assistant(FAILURE_REPLY)
            }
        };

        if pending.version != self.version {
            tracing::warn!(
                proposed = pending.version,
                current = self.version,
                "Dataset changed while the request was being interpreted"
            );
        }

        self.messages.push(reply.clone());
        reply
    }

    /// Apply operations in order to the current dataset. `proposed_at` is the
    /// version the operations were proposed against, when known.
    pub fn apply_operations(
        &mut self,
        operations: &[CleaningOperation],
        proposed_at: Option<u64>,
    ) -> Result<ApplyReport> {
        let dataset = self
            .dataset
            .take()
            .ok_or_else(|| AppError::NotFound("No dataset loaded".to_string()))?;

        if let Some(proposed) = proposed_at.filter(|v| *v != self.version) {
            tracing::warn!(
                proposed,
                current = self.version,
                "Applying operations proposed against an older dataset version"
            );
        }

        let (dataset, report) = apply_all(dataset, operations);
        self.dataset = Some(dataset);
        self.version += 1;
        self.messages.push(ChatMessage::assistant(APPLIED_REPLY));

        Ok(report)
    }

    pub fn export_csv(&self) -> Result<String> {
        match self.dataset.as_ref() {
            Some(dataset) if !dataset.is_empty() => self.writer.write_dataset(dataset),
            _ => Err(AppError::NotFound("No data to export".to_string())),
        }
    }

    pub fn export_file_name(&self) -> String {
        format!(
            "cleaned_{}",
            self.file_name
                .as_deref()
                .filter(|name| !name.is_empty())
                .unwrap_or("data")
        )
    }
}

fn proposal_reply(count: usize) -> String {
    match count {
        0 => NO_OPERATIONS_REPLY.to_string(),
        1 => "I've identified 1 operation to apply.".to_string(),
        n => format!("I've identified {} operations to apply.", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::ChatRole;
    use crate::domain::dataset::{Cell, OperationType};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedGateway {
        result: Result<Vec<CleaningOperation>>,
        calls: AtomicUsize,
    }

    impl FixedGateway {
        fn new(result: Result<Vec<CleaningOperation>>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InterpretationGateway for FixedGateway {
        async fn interpret(
            &self,
            _request: &str,
            _stats: &[ColumnStats],
        ) -> Result<Vec<CleaningOperation>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn fill_age() -> CleaningOperation {
        CleaningOperation::new(OperationType::FillMissing, "Fill age with 0")
            .with_column("age")
            .with_value(0.0)
    }

    fn loaded() -> CleaningSession {
        let mut session = CleaningSession::new();
        session.load_csv("people.csv", "name,age\nAlice,30\nBob,\n");
        session
    }

    #[test]
    fn test_load_resets_transcript() {
        let session = loaded();

        assert_eq!(session.version(), 1);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(
            session.messages()[0].content,
            "I've loaded people.csv with 2 rows and 2 columns. How would you like to clean it?"
        );
        assert_eq!(session.column_stats()[1].missing_count, 1);
    }

    #[tokio::test]
    async fn test_message_without_dataset() {
        let mut session = CleaningSession::new();
        let gateway = FixedGateway::new(Ok(vec![fill_age()]));

        let reply = session.send_message("clean it", &gateway).await;

        assert_eq!(reply.content, NO_DATASET_REPLY);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_message_with_proposals() {
        let mut session = loaded();
        let gateway = FixedGateway::new(Ok(vec![fill_age()]));

        let reply = session.send_message("fill the ages", &gateway).await;

        assert_eq!(reply.content, "I've identified 1 operation to apply.");
        assert_eq!(reply.operations.as_ref().map(Vec::len), Some(1));
        assert_eq!(reply.dataset_version, Some(1));
        // Proposals never touch the dataset
        assert_eq!(session.dataset().unwrap().get(1, "age"), Some(&Cell::Null));
    }

    #[tokio::test]
    async fn test_message_with_no_proposals_and_failure() {
        let mut session = loaded();

        let empty = FixedGateway::new(Ok(vec![]));
        let reply = session.send_message("do magic", &empty).await;
        assert_eq!(reply.content, NO_OPERATIONS_REPLY);

        let failing = FixedGateway::new(Err(AppError::LLMError("API key not found".to_string())));
        let before = session.dataset().cloned();
        let reply = session.send_message("do magic", &failing).await;
        assert_eq!(reply.content, FAILURE_REPLY);
        assert!(reply.operations.is_none());
        assert_eq!(session.dataset().cloned(), before);
        assert_eq!(session.messages().len(), 5);
    }

    #[test]
    fn test_split_turn_keeps_request_version() {
        let mut session = loaded();

        let ChatTurn::Interpret(pending) = session.begin_message("fill the ages") else {
            panic!("expected a request for the gateway");
        };
        assert_eq!(pending.stats.len(), 2);
        assert_eq!(session.messages().len(), 2);

        session.apply_operations(&[], None).unwrap();
        let reply = session.finish_message(pending, Ok(vec![fill_age()]));

        assert_eq!(reply.dataset_version, Some(1));
        assert_eq!(session.messages().last(), Some(&reply));
    }

    #[test]
    fn test_split_turn_without_dataset_answers_at_once() {
        let mut session = CleaningSession::new();
        match session.begin_message("clean it") {
            ChatTurn::Answered(reply) => assert_eq!(reply.content, NO_DATASET_REPLY),
            ChatTurn::Interpret(_) => panic!("nothing to interpret without data"),
        }
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_apply_operations_updates_dataset() {
        let mut session = loaded();

        let report = session.apply_operations(&[fill_age()], Some(1)).unwrap();

        assert_eq!(report.applied_count(), 1);
        assert_eq!(session.version(), 2);
        assert_eq!(
            session.dataset().unwrap().get(1, "age"),
            Some(&Cell::Number(0.0))
        );
        assert_eq!(session.messages().last().unwrap().content, APPLIED_REPLY);
    }

    #[test]
    fn test_stale_proposal_still_applies() {
        let mut session = loaded();
        session.apply_operations(&[], None).unwrap();

        let report = session.apply_operations(&[fill_age()], Some(1)).unwrap();
        assert_eq!(report.applied_count(), 1);
        assert_eq!(session.version(), 3);
    }

    #[test]
    fn test_apply_without_dataset_is_not_found() {
        let mut session = CleaningSession::new();
        let err = session.apply_operations(&[fill_age()], None).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_export() {
        let mut session = loaded();
        session.apply_operations(&[fill_age()], None).unwrap();

        assert_eq!(session.export_csv().unwrap(), "name,age\nAlice,30\nBob,0");
        assert_eq!(session.export_file_name(), "cleaned_people.csv");
    }

    #[test]
    fn test_export_without_data() {
        let session = CleaningSession::new();
        assert!(matches!(session.export_csv(), Err(AppError::NotFound(_))));
        assert_eq!(session.export_file_name(), "cleaned_data");
    }

    #[test]
    fn test_proposal_reply_pluralizes() {
        assert_eq!(proposal_reply(3), "I've identified 3 operations to apply.");
    }
}
