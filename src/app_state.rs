use std::sync::Arc;

use crate::services::{
    queue::TaskQueue, recognition::RecognitionClient, status::StatusStore, storage::StorageClient,
    synthesis::SynthesisClient,
};

/// Shared application state passed to route handlers and the worker.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<TaskQueue>,
    pub status: Arc<StatusStore>,
    pub storage: Arc<StorageClient>,
    pub recognition: Arc<RecognitionClient>,
    pub synthesis: Arc<SynthesisClient>,
}

impl AppState {
    pub fn new(
        queue: TaskQueue,
        status: StatusStore,
        storage: StorageClient,
        recognition: RecognitionClient,
        synthesis: SynthesisClient,
    ) -> Self {
        Self {
            queue: Arc::new(queue),
            status: Arc::new(status),
            storage: Arc::new(storage),
            recognition: Arc::new(recognition),
            synthesis: Arc::new(synthesis),
        }
    }
}
