use readout::{
    config::AppConfig,
    models::job::{JobKind, TaskState},
    services::{
        queue::{JobPayload, QueuedTask, TaskQueue},
        status::StatusStore,
        storage::StorageClient,
    },
};
use uuid::Uuid;

/// Integration test: queue and status store round trips
///
/// Verifies against live infrastructure:
/// 1. Status record creation, checkpoint writes, terminal immutability
/// 2. Queue enqueue/dequeue/complete
/// 3. Cancellation flag round trip
/// 4. Object storage store/fetch/signed-url/delete
///
/// Note: requires a running Redis instance and reachable object storage,
/// configured via environment variables.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_status_store_lifecycle() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let status = StatusStore::new(&config.redis_url).expect("Failed to initialize status store");

    let task_id = Uuid::new_v4();

    // Record exists with state PENDING immediately after creation
    let record = status
        .create_pending(task_id, JobKind::Tts)
        .await
        .expect("Failed to create pending record");
    assert_eq!(record.state, TaskState::Pending);
    assert_eq!(record.progress, 0);

    // Duplicate creation is rejected
    assert!(status.create_pending(task_id, JobKind::Tts).await.is_err());

    // Checkpoint writes are visible to readers
    let mut record = status.get(task_id).await.unwrap().expect("record missing");
    record.advance(30, "synthesizing audio").unwrap();
    status.write(&record).await.expect("checkpoint write failed");

    let seen = status.get(task_id).await.unwrap().unwrap();
    assert_eq!(seen.state, TaskState::Processing);
    assert_eq!(seen.progress, 30);
    assert_eq!(seen.message, "synthesizing audio");

    // Terminal write, then re-reads return identical payloads
    let mut record = seen;
    record
        .complete("done", serde_json::json!({"voice_name": "en-US-Chirp-A"}))
        .unwrap();
    status.write(&record).await.unwrap();

    let first = status.get(task_id).await.unwrap().unwrap();
    let second = status.get(task_id).await.unwrap().unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap(),
        "terminal reads must be idempotent"
    );
    assert_eq!(first.state, TaskState::Completed);
    assert!(first.result.is_some());
    assert!(first.error.is_none());

    // Unknown ids read as None
    assert!(status.get(Uuid::new_v4()).await.unwrap().is_none());

    // Deleted records read as None (enqueue-failure cleanup path)
    let orphan = Uuid::new_v4();
    status
        .create_pending(orphan, JobKind::Tts)
        .await
        .expect("Failed to create record");
    status.delete(orphan).await.expect("delete failed");
    assert!(status.get(orphan).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_queue_round_trip() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let queue = TaskQueue::new(&config.redis_url).expect("Failed to initialize queue");

    let task = QueuedTask {
        task_id: Uuid::new_v4(),
        submitted_at: chrono::Utc::now(),
        payload: JobPayload::Tts {
            request: serde_json::from_value(serde_json::json!({"text": "Hello world"})).unwrap(),
        },
    };

    queue.enqueue(&task).await.expect("Failed to enqueue");
    assert!(queue.queue_depth().await.unwrap() >= 1);

    // Drain until our task appears (other tests may share the queue)
    let dequeued = loop {
        match queue.dequeue().await.expect("Failed to dequeue") {
            Some(t) if t.task_id == task.task_id => break t,
            Some(other) => queue.complete(&other).await.expect("Failed to complete"),
            None => panic!("queued task not found"),
        }
    };
    assert_eq!(dequeued.task_id, task.task_id);

    queue.complete(&dequeued).await.expect("Failed to complete");
}

#[tokio::test]
#[ignore]
async fn test_cancellation_flag() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let status = StatusStore::new(&config.redis_url).expect("Failed to initialize status store");

    let task_id = Uuid::new_v4();
    assert!(!status.is_cancel_requested(task_id).await.unwrap());

    status.request_cancel(task_id).await.unwrap();
    assert!(status.is_cancel_requested(task_id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_storage_round_trip() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let storage = StorageClient::new(
        &config.storage_bucket,
        &config.storage_endpoint,
        &config.storage_access_key,
        &config.storage_secret_key,
    )
    .expect("Failed to initialize storage client");

    let key = format!("test/{}.bin", Uuid::new_v4());
    let data = b"synthetic audio bytes for testing";

    let info = storage
        .store(&key, data, "application/octet-stream")
        .await
        .expect("Upload failed");
    assert_eq!(info.key, key);

    let fetched = storage.fetch(&key).await.expect("Fetch failed");
    assert_eq!(fetched, data);

    let (url, expires_at) = storage.signed_url(&key).await.expect("Signing failed");
    assert!(url.contains(&key));
    assert!(expires_at > chrono::Utc::now());

    storage.delete(&key).await.expect("Delete failed");
}
