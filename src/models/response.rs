use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::{StatusRecord, TaskState};

/// One violated constraint from submission validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

/// 202 body returned by both submission endpoints. TTS submissions carry
/// a preview of the queued text; OCR submissions omit it.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub task_id: Uuid,
    pub status: TaskState,
    pub status_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_preview: Option<String>,
}

/// Best-effort timing view attached to non-terminal status polls.
#[derive(Debug, Serialize, Deserialize)]
pub struct TimingView {
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_remaining_secs: Option<f64>,
    pub recommended_poll_interval_secs: u64,
}

/// 200 body for GET /api/v1/jobs/{task_id}.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub record: StatusRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingView>,
}

impl StatusResponse {
    pub fn from_record(record: StatusRecord) -> Self {
        let timing = if record.state.is_terminal() {
            None
        } else {
            let elapsed = (chrono::Utc::now() - record.created_at)
                .num_milliseconds()
                .max(0) as f64
                / 1000.0;
            // Linear extrapolation from the checkpoint fraction; a coarse
            // hint, not a contract.
            let remaining = if record.progress > 0 {
                Some(
                    (elapsed * (100 - record.progress) as f64 / record.progress as f64 * 10.0)
                        .round()
                        / 10.0,
                )
            } else {
                None
            };
            Some(TimingView {
                elapsed_secs: (elapsed * 10.0).round() / 10.0,
                estimated_remaining_secs: remaining,
                recommended_poll_interval_secs: 3,
            })
        };
        Self {
            success: true,
            record,
            timing,
        }
    }
}

/// Error envelope for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Violation>>,
}

/// API-boundary error; converts service failures to response envelopes.
#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<Violation>),
    NotFound(Uuid),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    success: false,
                    message: "Request validation failed".to_string(),
                    errors: Some(errors),
                },
            ),
            ApiError::NotFound(task_id) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    success: false,
                    message: format!("Task {} not found", task_id),
                    errors: None,
                },
            ),
            ApiError::Conflict(message) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    success: false,
                    message,
                    errors: None,
                },
            ),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal error at API boundary");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        success: false,
                        message: "Internal server error".to_string(),
                        errors: None,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
