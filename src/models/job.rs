use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of background job tracked by a task id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Ocr,
    Tts,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Ocr => "ocr",
            JobKind::Tts => "tts",
        }
    }
}

/// State of a job in the async pipeline. Transitions are forward-only;
/// COMPLETED and FAILED are terminal and absorb all further writes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Error payload attached to a FAILED record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskFailure {
    pub code: String,
    pub message: String,
}

/// The single mutable entity of the pipeline, keyed by task id.
///
/// Written only by the worker that owns the job; read by any number of
/// concurrent status polls. Invariants enforced by the transition methods:
/// progress never decreases within an attempt, exactly one of result/error
/// is present once the state is terminal, and a terminal record is never
/// mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub task_id: Uuid,
    pub kind: JobKind,
    pub state: TaskState,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransitionError {
    #[error("record is terminal ({0:?}), no further writes allowed")]
    Terminal(TaskState),
}

impl StatusRecord {
    /// Fresh PENDING record, created atomically with enqueue.
    pub fn pending(task_id: Uuid, kind: JobKind) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            kind,
            state: TaskState::Pending,
            progress: 0,
            message: "Queued for processing".to_string(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to PROCESSING at a fixed checkpoint percentage.
    /// Progress is clamped to be non-decreasing within the attempt.
    pub fn advance(&mut self, progress: u8, message: &str) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::Terminal(self.state));
        }
        self.state = TaskState::Processing;
        self.progress = self.progress.max(progress.min(100));
        self.message = message.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Terminal success: progress forced to 100, result attached.
    pub fn complete(
        &mut self,
        message: &str,
        result: serde_json::Value,
    ) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::Terminal(self.state));
        }
        self.state = TaskState::Completed;
        self.progress = 100;
        self.message = message.to_string();
        self.result = Some(result);
        self.error = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Terminal failure: progress frozen at its last value, error attached.
    pub fn fail(&mut self, code: &str, message: &str) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::Terminal(self.state));
        }
        self.state = TaskState::Failed;
        self.message = message.to_string();
        self.error = Some(TaskFailure {
            code: code.to_string(),
            message: message.to_string(),
        });
        self.result = None;
        self.updated_at = Utc::now();
        Ok(())
    }
}
