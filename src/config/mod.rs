use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Redis connection string (job queue and status store)
    pub redis_url: String,

    /// Recognition API base URL
    #[serde(default = "default_vision_url")]
    pub vision_api_url: String,

    /// Recognition API key
    pub vision_api_key: String,

    /// Synthesis API base URL
    #[serde(default = "default_tts_url")]
    pub tts_api_url: String,

    /// Synthesis API key
    pub tts_api_key: String,

    /// Object storage bucket name
    pub storage_bucket: String,

    /// Object storage endpoint URL (S3-compatible)
    pub storage_endpoint: String,

    /// Object storage access key ID
    pub storage_access_key: String,

    /// Object storage secret access key
    pub storage_secret_key: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_vision_url() -> String {
    "https://vision.googleapis.com".to_string()
}

fn default_tts_url() -> String {
    "https://texttospeech.googleapis.com".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
