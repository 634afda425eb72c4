//! Runs one job to completion, emitting ordered status checkpoints.
//!
//! Checkpoint percentages are fixed phase markers, not measured progress.
//! Every checkpoint is written to the status store before the next phase
//! begins, collaborator calls run under a bounded timeout with retries, and
//! any unrecovered error becomes exactly one terminal FAILED write.

use std::future::Future;
use std::time::{Duration, Instant};

use base64::Engine;
use tokio::time::{sleep, timeout};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::job::{StatusRecord, TaskState};
use crate::models::ocr::{ExtractFormat, FileInfo, OcrOptions, OcrResult};
use crate::models::tts::{
    estimate_duration_secs, AudioFormat, TtsAudioInfo, TtsRequest, TtsResult, TtsTextInfo,
    VoiceGender,
};
use crate::services::queue::{JobPayload, QueuedTask};
use crate::services::status::{StatusStore, StatusStoreError};
use crate::services::storage::{audio_key, page_key};
use crate::services::synthesis::VoiceParams;

/// Bounded exponential backoff: 3 attempts, 500ms base, doubling.
pub const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;
/// A collaborator call exceeding this is a transient failure.
const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Recognition failed: {0}")]
    Recognition(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error("Cancelled by client request")]
    Cancelled,

    #[error("Internal task error: {0}")]
    Internal(String),
}

impl TaskError {
    /// Taxonomy code reported in the FAILED record.
    pub fn code(&self) -> &'static str {
        match self {
            TaskError::Recognition(_) => "UPSTREAM_RECOGNITION",
            TaskError::Synthesis(_) => "UPSTREAM_SYNTHESIS",
            TaskError::Storage(_) => "STORAGE_FAILURE",
            TaskError::Cancelled => "CANCELLED",
            TaskError::Internal(_) => "INTERNAL",
        }
    }
}

/// Holds the single-writer status record through one job execution.
struct Checkpointer<'a> {
    status: &'a StatusStore,
    record: StatusRecord,
}

impl Checkpointer<'_> {
    /// Write one PROCESSING checkpoint. The advisory cancellation flag is
    /// observed here, between checkpoints, never mid-collaborator-call.
    async fn advance(&mut self, progress: u8, message: &str) -> Result<(), TaskError> {
        let cancelled = self
            .status
            .is_cancel_requested(self.record.task_id)
            .await
            .map_err(|e| TaskError::Internal(e.to_string()))?;
        if cancelled {
            return Err(TaskError::Cancelled);
        }
        self.record
            .advance(progress, message)
            .map_err(|e| TaskError::Internal(e.to_string()))?;
        self.status
            .write(&self.record)
            .await
            .map_err(|e| TaskError::Internal(e.to_string()))?;
        tracing::debug!(
            task_id = %self.record.task_id,
            progress,
            message,
            "Checkpoint written"
        );
        Ok(())
    }

    async fn complete(
        mut self,
        message: &str,
        result: serde_json::Value,
    ) -> Result<(), StatusStoreError> {
        if self.record.complete(message, result).is_ok() {
            self.status.write(&self.record).await?;
        }
        Ok(())
    }

    async fn fail(mut self, code: &str, message: &str) -> Result<(), StatusStoreError> {
        if self.record.fail(code, message).is_ok() {
            self.status.write(&self.record).await?;
        }
        Ok(())
    }
}

/// Run one dequeued job to its terminal state. Collaborator errors never
/// escape: they are converted into the terminal FAILED record. Only status
/// store failures propagate, since without the store there is nothing left
/// to report through.
pub async fn run_task(
    state: &AppState,
    task: &QueuedTask,
) -> Result<TaskState, StatusStoreError> {
    let record = match state.status.get(task.task_id).await? {
        // Redelivery of an already-finished job: terminal records are
        // immutable, nothing to do.
        Some(r) if r.state.is_terminal() => return Ok(r.state),
        Some(r) => r,
        // Record expired between enqueue and execution; start fresh.
        None => StatusRecord::pending(task.task_id, task.payload.kind()),
    };

    let mut cp = Checkpointer {
        status: &state.status,
        record,
    };

    let outcome = match &task.payload {
        JobPayload::Ocr {
            filename,
            content_type,
            file_b64,
            options,
        } => run_ocr(state, task.task_id, filename, content_type, file_b64, options, &mut cp).await,
        JobPayload::Tts { request } => run_tts(state, task.task_id, request, &mut cp).await,
    };

    match outcome {
        Ok(result) => {
            cp.complete("Processing completed successfully", result)
                .await?;
            Ok(TaskState::Completed)
        }
        Err(e) => {
            tracing::error!(task_id = %task.task_id, code = e.code(), error = %e, "Job failed");
            let message = e.to_string();
            cp.fail(e.code(), &message).await?;
            Ok(TaskState::Failed)
        }
    }
}

async fn run_ocr(
    state: &AppState,
    task_id: Uuid,
    filename: &str,
    content_type: &str,
    file_b64: &str,
    options: &OcrOptions,
    cp: &mut Checkpointer<'_>,
) -> Result<serde_json::Value, TaskError> {
    let file_bytes = base64::engine::general_purpose::STANDARD
        .decode(file_b64)
        .map_err(|e| TaskError::Internal(format!("corrupt queued file payload: {}", e)))?;

    cp.advance(20, &format!("Uploading source file: {}", filename))
        .await?;
    let source_key = page_key(task_id, filename);
    let mut storage_info = with_retries(task_id, "source upload", || {
        state.storage.store(&source_key, &file_bytes, content_type)
    })
    .await
    .map_err(TaskError::Storage)?;

    cp.advance(40, &format!("Recognizing text ({})", options.extract_format))
        .await?;
    let started = Instant::now();
    let recognized = with_retries(task_id, "recognition", || {
        state
            .recognition
            .recognize(&file_bytes, &options.language, options.confidence_threshold)
    })
    .await
    .map_err(TaskError::Recognition)?;
    let recognition_secs = started.elapsed().as_secs_f64();

    tracing::info!(
        task_id = %task_id,
        chars = recognized.full_text.len(),
        blocks = recognized.blocks.len(),
        recognition_secs,
        "Recognition complete"
    );

    cp.advance(70, "Persisting recognition results").await?;
    let results_key = format!("{}.ocr.json", source_key);
    let results_json = serde_json::to_vec(&recognized)
        .map_err(|e| TaskError::Internal(e.to_string()))?;
    with_retries(task_id, "results upload", || {
        state
            .storage
            .store(&results_key, &results_json, "application/json")
    })
    .await
    .map_err(TaskError::Storage)?;

    cp.advance(90, "Preparing download links").await?;
    let (url, expires_at) = with_retries(task_id, "signing", || {
        state.storage.signed_url(&source_key)
    })
    .await
    .map_err(TaskError::Storage)?;
    storage_info.signed_url = Some(url);
    storage_info.signed_url_expires_at = Some(expires_at);

    let result = OcrResult {
        file_info: FileInfo {
            name: filename.to_string(),
            size_bytes: file_bytes.len(),
            content_type: content_type.to_string(),
        },
        full_text: recognized.full_text,
        language: options.language.clone(),
        extract_format: options.extract_format,
        confidence_threshold: options.confidence_threshold,
        blocks: match options.extract_format {
            ExtractFormat::Text => None,
            ExtractFormat::Json | ExtractFormat::Structured => Some(recognized.blocks),
        },
        pages_count: match options.extract_format {
            ExtractFormat::Structured => Some(recognized.pages),
            _ => None,
        },
        storage_info,
        recognition_secs: (recognition_secs * 100.0).round() / 100.0,
    };

    serde_json::to_value(&result).map_err(|e| TaskError::Internal(e.to_string()))
}

async fn run_tts(
    state: &AppState,
    task_id: Uuid,
    request: &TtsRequest,
    cp: &mut Checkpointer<'_>,
) -> Result<serde_json::Value, TaskError> {
    // Enumerations were validated at submission; a parse failure here means
    // the queue payload was tampered with or the schema drifted.
    let gender: VoiceGender = request
        .voice_gender
        .parse()
        .map_err(|_| TaskError::Internal(format!("bad voice_gender '{}'", request.voice_gender)))?;
    let format: AudioFormat = request
        .audio_format
        .parse()
        .map_err(|_| TaskError::Internal(format!("bad audio_format '{}'", request.audio_format)))?;
    let params = VoiceParams {
        language: request.language.clone(),
        gender,
        index: request.voice_index,
        format,
        speaking_rate: request.speaking_rate,
        pitch: request.pitch,
        volume_gain_db: request.volume_gain_db,
    };
    let voice = params
        .voice_name()
        .map_err(|e| TaskError::Synthesis(e.to_string()))?;
    let text = request.normalized_text();

    cp.advance(
        30,
        &format!("Synthesizing audio with {} {} voice", request.language, gender),
    )
    .await?;
    let started = Instant::now();
    let audio = with_retries(task_id, "synthesis", || {
        state.synthesis.synthesize(&text, &params)
    })
    .await
    .map_err(TaskError::Synthesis)?;

    tracing::info!(
        task_id = %task_id,
        voice,
        bytes = audio.len(),
        synthesis_secs = started.elapsed().as_secs_f64(),
        "Synthesis complete"
    );

    cp.advance(70, "Uploading audio").await?;
    let key = audio_key(task_id, &request.file_prefix, &format.to_string());
    let mut storage_info = with_retries(task_id, "audio upload", || {
        state.storage.store(&key, &audio, format.content_type())
    })
    .await
    .map_err(TaskError::Storage)?;

    cp.advance(90, "Generating access url").await?;
    let (url, expires_at) = with_retries(task_id, "signing", || state.storage.signed_url(&key))
        .await
        .map_err(TaskError::Storage)?;
    storage_info.signed_url = Some(url);
    storage_info.signed_url_expires_at = Some(expires_at);

    let result = TtsResult {
        text_info: TtsTextInfo {
            text_length: text.chars().count(),
            language: request.language.clone(),
            voice_gender: gender.to_string(),
            voice_index: request.voice_index,
            voice_name: voice.to_string(),
        },
        audio_info: TtsAudioInfo {
            audio_format: format.to_string(),
            size_bytes: audio.len(),
            duration_estimate_secs: estimate_duration_secs(text.chars().count()),
            speaking_rate: request.speaking_rate,
            pitch: request.pitch,
            volume_gain_db: request.volume_gain_db,
        },
        storage_info,
    };

    serde_json::to_value(&result).map_err(|e| TaskError::Internal(e.to_string()))
}

/// Retry a collaborator call with a bounded timeout and exponential backoff.
/// Progress stays at the last successful checkpoint across attempts.
async fn with_retries<T, E, F, Fut>(task_id: Uuid, phase: &str, mut op: F) -> Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut last_error = String::new();
    for attempt in 1..=MAX_ATTEMPTS {
        match timeout(COLLABORATOR_TIMEOUT, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => last_error = e.to_string(),
            Err(_) => {
                last_error = format!("timed out after {}s", COLLABORATOR_TIMEOUT.as_secs())
            }
        }
        if attempt < MAX_ATTEMPTS {
            let backoff = Duration::from_millis(BACKOFF_BASE_MS << (attempt - 1));
            tracing::warn!(
                task_id = %task_id,
                phase,
                attempt,
                error = %last_error,
                backoff_ms = backoff.as_millis() as u64,
                "Collaborator call failed, retrying"
            );
            sleep(backoff).await;
        }
    }
    Err(format!(
        "{} failed after {} attempts: {}",
        phase, MAX_ATTEMPTS, last_error
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn error_codes_match_taxonomy() {
        assert_eq!(
            TaskError::Recognition(String::new()).code(),
            "UPSTREAM_RECOGNITION"
        );
        assert_eq!(
            TaskError::Synthesis(String::new()).code(),
            "UPSTREAM_SYNTHESIS"
        );
        assert_eq!(TaskError::Storage(String::new()).code(), "STORAGE_FAILURE");
        assert_eq!(TaskError::Cancelled.code(), "CANCELLED");
    }

    #[tokio::test(start_paused = true)]
    async fn with_retries_recovers_from_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retries(Uuid::new_v4(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient")
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn with_retries_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retries(Uuid::new_v4(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<u32, _>("still down") }
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.contains("after 3 attempts"));
        assert!(err.contains("still down"));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }
}
