mod app_state;
mod config;
mod models;
mod routes;
mod services;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{
    queue::TaskQueue, recognition::RecognitionClient, status::StatusStore, storage::StorageClient,
    synthesis::SynthesisClient,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing readout API server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("jobs_submitted_total", "Total jobs submitted, by kind");
    metrics::describe_counter!("jobs_completed_total", "Total jobs completed, by kind");
    metrics::describe_counter!("jobs_failed_total", "Total jobs failed, by kind");
    metrics::describe_histogram!(
        "job_processing_seconds",
        "Time from dequeue to terminal state"
    );
    metrics::describe_gauge!("queue_depth", "Current number of pending jobs in the queue");

    // Initialize Redis-backed queue and status store
    tracing::info!("Connecting to Redis");
    let queue = TaskQueue::new(&config.redis_url).expect("Failed to initialize job queue");
    let status = StatusStore::new(&config.redis_url).expect("Failed to initialize status store");

    // Initialize object storage client
    tracing::info!("Initializing object storage client");
    let storage = StorageClient::new(
        &config.storage_bucket,
        &config.storage_endpoint,
        &config.storage_access_key,
        &config.storage_secret_key,
    )
    .expect("Failed to initialize storage client");

    // Initialize collaborator clients
    let recognition = RecognitionClient::new(&config.vision_api_url, &config.vision_api_key);
    let synthesis = SynthesisClient::new(&config.tts_api_url, &config.tts_api_key);

    // Create shared application state
    let state = AppState::new(queue, status, storage, recognition, synthesis);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/jobs/ocr", post(routes::jobs::submit_ocr))
        .route("/api/v1/jobs/tts", post(routes::jobs::submit_tts))
        .route("/api/v1/jobs/{task_id}", get(routes::jobs::get_status))
        .route(
            "/api/v1/jobs/{task_id}/cancel",
            post(routes::jobs::cancel_job),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(12 * 1024 * 1024)); // 10 MB file + multipart overhead

    tracing::info!("Starting readout on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
