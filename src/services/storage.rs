use chrono::{DateTime, Datelike, Utc};
use s3::creds::Credentials;
use s3::{Bucket, Region};
use uuid::Uuid;

use crate::models::tts::StorageInfo;

/// Presigned download URLs stay valid for one hour.
const SIGNED_URL_TTL_SECS: u32 = 3600;

/// Client for S3-compatible object storage.
pub struct StorageClient {
    bucket: Box<Bucket>,
}

impl StorageClient {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self { bucket })
    }

    /// Upload bytes and return the storage reference (without a signed URL).
    pub async fn store(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<StorageInfo, StorageError> {
        self.bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(StorageError::S3)?;
        Ok(StorageInfo {
            key: key.to_string(),
            signed_url: None,
            signed_url_expires_at: None,
        })
    }

    /// Generate a time-limited signed download URL for a stored object.
    pub async fn signed_url(
        &self,
        key: &str,
    ) -> Result<(String, DateTime<Utc>), StorageError> {
        let url = self
            .bucket
            .presign_get(key, SIGNED_URL_TTL_SECS, None)
            .await
            .map_err(StorageError::S3)?;
        let expires_at = Utc::now() + chrono::Duration::seconds(SIGNED_URL_TTL_SECS as i64);
        Ok((url, expires_at))
    }

    /// Fetch object bytes (used by integration tests and reprocessing).
    pub async fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self.bucket.get_object(key).await.map_err(StorageError::S3)?;
        Ok(response.to_vec())
    }

    /// Delete an object.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.bucket
            .delete_object(key)
            .await
            .map_err(StorageError::S3)?;
        Ok(())
    }

    /// Check bucket reachability (for health checks). A list call on an
    /// empty prefix is cheap and exercises auth and connectivity.
    pub async fn health_check(&self) -> Result<(), StorageError> {
        self.bucket
            .list("health/".to_string(), Some("/".to_string()))
            .await
            .map_err(StorageError::S3)?;
        Ok(())
    }
}

/// Storage key for an OCR source image: pages/YYYY/MM/DD/{task_id}_{name}.
/// Filenames are truncated and sanitized so the key stays deterministic.
pub fn page_key(task_id: Uuid, filename: &str) -> String {
    let now = Utc::now();
    let (stem, ext) = split_filename(filename);
    format!(
        "pages/{:04}/{:02}/{:02}/{}_{}{}",
        now.year(),
        now.month(),
        now.day(),
        task_id,
        sanitize(&stem),
        ext
    )
}

/// Storage key for synthesized audio: audio/YYYY/MM/DD/{prefix}_{task_id}.{fmt}.
pub fn audio_key(task_id: Uuid, file_prefix: &str, format: &str) -> String {
    let now = Utc::now();
    format!(
        "audio/{:04}/{:02}/{:02}/{}_{}.{}",
        now.year(),
        now.month(),
        now.day(),
        sanitize(file_prefix),
        task_id,
        format
    )
}

fn split_filename(filename: &str) -> (String, String) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => (
            filename[..idx].to_string(),
            filename[idx..].to_ascii_lowercase(),
        ),
        _ => (filename.to_string(), String::new()),
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    cleaned.chars().take(50).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Storage configuration error: {0}")]
    Config(String),
}
