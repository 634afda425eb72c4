use readout::{
    app_state::AppState,
    config::AppConfig,
    models::job::TaskState,
    services::{
        orchestrator, queue::TaskQueue, recognition::RecognitionClient, status::StatusStore,
        storage::StorageClient, synthesis::SynthesisClient,
    },
};
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting readout worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize services
    tracing::info!("Initializing services");
    let queue = TaskQueue::new(&config.redis_url).expect("Failed to initialize job queue");
    let status = StatusStore::new(&config.redis_url).expect("Failed to initialize status store");

    let storage = StorageClient::new(
        &config.storage_bucket,
        &config.storage_endpoint,
        &config.storage_access_key,
        &config.storage_secret_key,
    )
    .expect("Failed to initialize storage client");

    let recognition = RecognitionClient::new(&config.vision_api_url, &config.vision_api_key);
    let synthesis = SynthesisClient::new(&config.tts_api_url, &config.tts_api_key);

    let state = AppState::new(queue, status, storage, recognition, synthesis);

    tracing::info!("Worker ready, starting job processing loop");

    // Main processing loop
    loop {
        // Keep the depth gauge live even when nobody polls /health
        if let Ok(depth) = state.queue.queue_depth().await {
            metrics::gauge!("queue_depth").set(depth as f64);
        }

        match process_next_job(&state).await {
            Ok(true) => {
                tracing::debug!("Job processed, checking for next job");
            }
            Ok(false) => {
                tracing::trace!("No jobs available, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing job, will retry");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}

/// Process the next job from the queue.
/// Returns Ok(true) if a job was processed, Ok(false) if no job available.
async fn process_next_job(state: &AppState) -> Result<bool, Box<dyn std::error::Error>> {
    let task = match state.queue.dequeue().await? {
        Some(t) => t,
        None => return Ok(false),
    };

    let kind = task.payload.kind();
    tracing::info!(
        task_id = %task.task_id,
        kind = kind.as_str(),
        "Processing job"
    );

    let start = std::time::Instant::now();
    // The orchestrator always writes a terminal record; errors here mean
    // the status store itself is unreachable.
    let terminal = orchestrator::run_task(state, &task).await?;
    let elapsed = start.elapsed();

    metrics::histogram!("job_processing_seconds", "kind" => kind.as_str())
        .record(elapsed.as_secs_f64());
    match terminal {
        TaskState::Completed => {
            metrics::counter!("jobs_completed_total", "kind" => kind.as_str()).increment(1);
            tracing::info!(
                task_id = %task.task_id,
                elapsed_ms = elapsed.as_millis() as u64,
                "Job completed"
            );
        }
        TaskState::Failed => {
            metrics::counter!("jobs_failed_total", "kind" => kind.as_str()).increment(1);
            tracing::warn!(
                task_id = %task.task_id,
                elapsed_ms = elapsed.as_millis() as u64,
                "Job failed"
            );
        }
        other => {
            tracing::error!(task_id = %task.task_id, state = ?other, "Job left non-terminal");
        }
    }

    // Remove from the processing list only after the terminal write, so a
    // crash before this point leaves the job recoverable.
    state.queue.complete(&task).await?;

    Ok(true)
}
