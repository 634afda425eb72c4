use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::Engine;
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::job::TaskState;
use crate::models::response::{ApiError, StatusResponse, SubmitResponse, Violation};
use crate::models::tts::TtsRequest;
use crate::services::queue::{JobPayload, QueuedTask};
use crate::services::validation;

fn status_url(task_id: Uuid) -> String {
    format!("/api/v1/jobs/{}", task_id)
}

/// Validate, create the PENDING record, and enqueue. The submitting request
/// never blocks on job execution.
async fn accept(
    state: &AppState,
    payload: JobPayload,
    text_preview: Option<String>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let kind = payload.kind();
    let task_id = Uuid::new_v4();

    state
        .status
        .create_pending(task_id, kind)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let task = QueuedTask {
        task_id,
        submitted_at: chrono::Utc::now(),
        payload,
    };
    if let Err(e) = state.queue.enqueue(&task).await {
        // The id was never issued to the client; reclaim the PENDING
        // record instead of leaving it to age out on its TTL.
        if let Err(cleanup) = state.status.delete(task_id).await {
            tracing::warn!(task_id = %task_id, error = %cleanup, "Orphan record cleanup failed");
        }
        return Err(ApiError::Internal(e.to_string()));
    }

    metrics::counter!("jobs_submitted_total", "kind" => kind.as_str()).increment(1);
    tracing::info!(task_id = %task_id, kind = kind.as_str(), "Job accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            success: true,
            message: "Job submitted successfully. Processing in background.".to_string(),
            task_id,
            status: TaskState::Pending,
            status_url: status_url(task_id),
            text_preview,
        }),
    ))
}

/// POST /api/v1/jobs/ocr — multipart document image submission.
pub async fn submit_ocr(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut language = "en".to_string();
    let mut extract_format = "text".to_string();
    let mut confidence_threshold = 0.8_f64;
    let mut violations: Vec<Violation> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::Validation(vec![Violation {
            field: "body".to_string(),
            message: format!("Malformed multipart body: {}", e),
        }])
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(|e| {
                    ApiError::Validation(vec![Violation {
                        field: "file".to_string(),
                        message: format!("Failed to read file field: {}", e),
                    }])
                })?;
                file = Some((filename, content_type, data.to_vec()));
            }
            "language" => {
                language = field.text().await.unwrap_or_default();
            }
            "extract_format" => {
                extract_format = field.text().await.unwrap_or_default();
            }
            "confidence_threshold" => {
                let raw = field.text().await.unwrap_or_default();
                match raw.parse::<f64>() {
                    Ok(v) => confidence_threshold = v,
                    Err(_) => violations.push(Violation {
                        field: "confidence_threshold".to_string(),
                        message: format!("Not a number: '{}'", raw),
                    }),
                }
            }
            _ => {}
        }
    }

    let (filename, content_type, data) = match file {
        Some(f) => f,
        None => {
            violations.push(Violation {
                field: "file".to_string(),
                message: "No file provided".to_string(),
            });
            return Err(ApiError::Validation(violations));
        }
    };

    let options = match validation::validate_upload(
        &filename,
        &content_type,
        &data,
        &language,
        &extract_format,
        confidence_threshold,
    ) {
        Ok(options) if violations.is_empty() => options,
        Ok(_) => return Err(ApiError::Validation(violations)),
        Err(mut more) => {
            violations.append(&mut more);
            return Err(ApiError::Validation(violations));
        }
    };

    let payload = JobPayload::Ocr {
        filename,
        content_type,
        file_b64: base64::engine::general_purpose::STANDARD.encode(&data),
        options,
    };
    accept(&state, payload, None).await
}

/// POST /api/v1/jobs/tts — JSON text submission.
pub async fn submit_tts(
    State(state): State<AppState>,
    body: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(request) = body.map_err(|e| {
        ApiError::Validation(vec![Violation {
            field: "body".to_string(),
            message: format!("Malformed JSON body: {}", e),
        }])
    })?;

    validation::validate_tts(&request).map_err(ApiError::Validation)?;

    let preview = request.text_preview();
    accept(&state, JobPayload::Tts { request }, Some(preview)).await
}

/// GET /api/v1/jobs/{task_id} — poll the status record. A purely idempotent
/// read; unknown and expired ids are indistinguishable 404s.
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let record = state
        .status
        .get(task_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or(ApiError::NotFound(task_id))?;

    Ok(Json(StatusResponse::from_record(record)))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
    pub task_id: Uuid,
}

/// POST /api/v1/jobs/{task_id}/cancel — set the advisory cancellation flag.
/// The worker observes it between checkpoints only.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<(StatusCode, Json<CancelResponse>), ApiError> {
    let record = state
        .status
        .get(task_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or(ApiError::NotFound(task_id))?;

    if record.state.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "Task {} already finished ({:?})",
            task_id, record.state
        )));
    }

    state
        .status
        .request_cancel(task_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(task_id = %task_id, "Cancellation requested");

    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            success: true,
            message: "Cancellation requested; the job stops at its next checkpoint".to_string(),
            task_id,
        }),
    ))
}
