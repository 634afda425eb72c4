//! Test helper utilities for E2E testing

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

/// Response from POST /api/v1/jobs/{ocr,tts}
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub task_id: Uuid,
    pub status: String,
    pub status_url: String,
    pub text_preview: Option<String>,
}

/// Response from GET /api/v1/jobs/{task_id}
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub task_id: Uuid,
    pub state: String,
    pub progress: u8,
    pub message: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<ErrorPayload>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

/// Error envelope for non-2xx responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    pub errors: Option<Vec<serde_json::Value>>,
}

/// Submit a TTS job with the given body, expecting 202
pub async fn submit_tts(
    client: &reqwest::Client,
    base_url: &str,
    body: serde_json::Value,
) -> Result<SubmitResponse, Box<dyn std::error::Error + Send + Sync>> {
    let response = client
        .post(format!("{}/api/v1/jobs/tts", base_url))
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if status.as_u16() != 202 {
        let error_text = response.text().await?;
        return Err(format!("Submit failed with status {}: {}", status, error_text).into());
    }

    Ok(response.json::<SubmitResponse>().await?)
}

/// Fetch the current status record once
pub async fn get_status(
    client: &reqwest::Client,
    base_url: &str,
    task_id: &str,
) -> Result<StatusResponse, Box<dyn std::error::Error + Send + Sync>> {
    let response = client
        .get(format!("{}/api/v1/jobs/{}", base_url, task_id))
        .send()
        .await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        return Err(format!("Status check failed: {}", error_text).into());
    }

    Ok(response.json::<StatusResponse>().await?)
}

/// Poll until terminal, asserting progress never decreases between polls.
pub async fn poll_until_terminal(
    client: &reqwest::Client,
    base_url: &str,
    task_id: &str,
    timeout_secs: u64,
) -> Result<StatusResponse, Box<dyn std::error::Error + Send + Sync>> {
    let max_attempts = timeout_secs * 2; // Poll every 500ms
    let mut last_progress = 0u8;

    for attempt in 0..max_attempts {
        let status = get_status(client, base_url, task_id).await?;

        assert!(
            status.progress >= last_progress,
            "progress went backwards: {} -> {}",
            last_progress,
            status.progress
        );
        last_progress = status.progress;

        match status.state.as_str() {
            "COMPLETED" | "FAILED" => return Ok(status),
            "PENDING" | "PROCESSING" => {
                if attempt % 10 == 0 && attempt > 0 {
                    println!(
                        "  ... still waiting, state={} progress={} (attempt {}/{})",
                        status.state, status.progress, attempt, max_attempts
                    );
                }
                sleep(Duration::from_millis(500)).await;
            }
            other => {
                return Err(format!("Unknown task state: {}", other).into());
            }
        }
    }

    Err(format!("Job did not complete within {} seconds", timeout_secs).into())
}
