use redis::AsyncCommands;
use uuid::Uuid;

use crate::models::job::{JobKind, StatusRecord};

/// Records expire an hour after their last write; an expired id is
/// indistinguishable from one that never existed.
const STATUS_TTL_SECS: u64 = 3600;

fn status_key(task_id: Uuid) -> String {
    format!("readout:task:{}", task_id)
}

fn cancel_key(task_id: Uuid) -> String {
    format!("readout:task:{}:cancel", task_id)
}

/// Redis-backed status store, keyed by task id.
///
/// Access discipline: single writer per key (the worker owning the job),
/// any number of concurrent readers. Every checkpoint is written before the
/// next phase begins, so pollers can observe intermediate states. Terminal
/// records are never overwritten.
pub struct StatusStore {
    client: redis::Client,
}

impl StatusStore {
    pub fn new(redis_url: &str) -> Result<Self, StatusStoreError> {
        let client = redis::Client::open(redis_url).map_err(StatusStoreError::Redis)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, StatusStoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(StatusStoreError::Redis)
    }

    /// Create the PENDING record at enqueue time. SET NX so a duplicate
    /// submission with the same id cannot clobber an in-flight record.
    pub async fn create_pending(
        &self,
        task_id: Uuid,
        kind: JobKind,
    ) -> Result<StatusRecord, StatusStoreError> {
        let record = StatusRecord::pending(task_id, kind);
        let payload = serde_json::to_string(&record).map_err(StatusStoreError::Serialize)?;
        let mut conn = self.conn().await?;
        let created: bool = redis::cmd("SET")
            .arg(status_key(task_id))
            .arg(&payload)
            .arg("NX")
            .arg("EX")
            .arg(STATUS_TTL_SECS)
            .query_async(&mut conn)
            .await
            .map_err(StatusStoreError::Redis)?;
        if !created {
            return Err(StatusStoreError::AlreadyExists(task_id));
        }
        Ok(record)
    }

    /// Fetch the current record, or None for unknown/expired ids.
    pub async fn get(&self, task_id: Uuid) -> Result<Option<StatusRecord>, StatusStoreError> {
        let mut conn = self.conn().await?;
        let payload: Option<String> = conn
            .get(status_key(task_id))
            .await
            .map_err(StatusStoreError::Redis)?;
        match payload {
            Some(p) => {
                let record = serde_json::from_str(&p).map_err(StatusStoreError::Serialize)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Overwrite the record with a new checkpoint. The caller holds the
    /// single-writer role, so read-modify-write needs no locking.
    pub async fn write(&self, record: &StatusRecord) -> Result<(), StatusStoreError> {
        let payload = serde_json::to_string(record).map_err(StatusStoreError::Serialize)?;
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(status_key(record.task_id), payload, STATUS_TTL_SECS)
            .await
            .map_err(StatusStoreError::Redis)?;
        Ok(())
    }

    /// Remove a record outright. Used to reclaim a PENDING record when
    /// enqueue fails before the id is issued to the client.
    pub async fn delete(&self, task_id: Uuid) -> Result<(), StatusStoreError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(status_key(task_id))
            .await
            .map_err(StatusStoreError::Redis)?;
        Ok(())
    }

    /// Set the advisory cancellation flag. The orchestrator checks it
    /// between checkpoints, never mid-collaborator-call.
    pub async fn request_cancel(&self, task_id: Uuid) -> Result<(), StatusStoreError> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(cancel_key(task_id), 1u8, STATUS_TTL_SECS)
            .await
            .map_err(StatusStoreError::Redis)?;
        Ok(())
    }

    pub async fn is_cancel_requested(&self, task_id: Uuid) -> Result<bool, StatusStoreError> {
        let mut conn = self.conn().await?;
        let exists: bool = conn
            .exists(cancel_key(task_id))
            .await
            .map_err(StatusStoreError::Redis)?;
        Ok(exists)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatusStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("status record already exists for task {0}")]
    AlreadyExists(Uuid),
}
