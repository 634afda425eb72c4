use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Language hints accepted for recognition.
pub const OCR_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "ru", "ja", "ko", "zh", "ar", "hi", "th", "vi", "nl", "sv",
    "da", "no", "fi", "pl", "id",
];

/// MIME types the recognition collaborator accepts.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
    "image/tiff",
];

/// Upload cap, matching the request body limit on the server.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Shape of the extracted-text payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExtractFormat {
    /// Full text only.
    Text,
    /// Full text plus per-block coordinates and confidence.
    Json,
    /// Full text plus page/block hierarchy counts.
    Structured,
}

/// Submission options parsed out of the multipart form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOptions {
    pub language: String,
    pub extract_format: ExtractFormat,
    pub confidence_threshold: f64,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            extract_format: ExtractFormat::Text,
            confidence_threshold: 0.8,
        }
    }
}

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One recognized block of text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: f64,
}

/// Output of the recognition collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedText {
    pub full_text: String,
    pub blocks: Vec<TextBlock>,
    pub pages: usize,
}

/// Metadata about the submitted file, echoed in results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size_bytes: usize,
    pub content_type: String,
}

/// Result payload attached to a completed OCR job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    pub file_info: FileInfo,
    pub full_text: String,
    pub language: String,
    pub extract_format: ExtractFormat,
    pub confidence_threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<TextBlock>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_count: Option<usize>,
    pub storage_info: super::tts::StorageInfo,
    pub recognition_secs: f64,
}
