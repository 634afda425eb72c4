use garde::Validate;

use crate::models::ocr::{
    ExtractFormat, OcrOptions, MAX_FILE_SIZE, OCR_LANGUAGES, SUPPORTED_MIME_TYPES,
};
use crate::models::response::Violation;
use crate::models::tts::{TtsRequest, MAX_TEXT_LENGTH};

/// Validate a TTS submission, reporting every violated constraint.
/// A rejected request never reaches the queue or the status store.
pub fn validate_tts(request: &TtsRequest) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    let normalized = request.normalized_text();
    if normalized.is_empty() {
        violations.push(Violation {
            field: "text".to_string(),
            message: "Text is required and cannot be empty".to_string(),
        });
    } else if normalized.chars().count() > MAX_TEXT_LENGTH {
        violations.push(Violation {
            field: "text".to_string(),
            message: format!(
                "Text too long: {} characters (max {})",
                normalized.chars().count(),
                MAX_TEXT_LENGTH
            ),
        });
    }

    if let Err(report) = request.validate() {
        for (path, error) in report.iter() {
            violations.push(Violation {
                field: path.to_string(),
                message: error.to_string(),
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Validate an OCR upload, reporting every violated constraint and
/// returning the typed processing options on success.
pub fn validate_upload(
    filename: &str,
    content_type: &str,
    data: &[u8],
    language: &str,
    extract_format: &str,
    confidence_threshold: f64,
) -> Result<OcrOptions, Vec<Violation>> {
    let mut violations = Vec::new();

    if filename.is_empty() {
        violations.push(Violation {
            field: "file".to_string(),
            message: "A filename is required".to_string(),
        });
    }

    if data.is_empty() {
        violations.push(Violation {
            field: "file".to_string(),
            message: "File appears to be empty".to_string(),
        });
    } else if data.len() > MAX_FILE_SIZE {
        violations.push(Violation {
            field: "file".to_string(),
            message: format!(
                "File size too large: {} bytes (max {:.1}MB)",
                data.len(),
                MAX_FILE_SIZE as f64 / (1024.0 * 1024.0)
            ),
        });
    }

    if !SUPPORTED_MIME_TYPES.contains(&content_type) {
        violations.push(Violation {
            field: "file".to_string(),
            message: format!(
                "Unsupported content type '{}'. Supported: {}",
                content_type,
                SUPPORTED_MIME_TYPES.join(", ")
            ),
        });
    } else if !data.is_empty() && image::guess_format(data).is_err() {
        violations.push(Violation {
            field: "file".to_string(),
            message: "File content is not a recognizable image".to_string(),
        });
    }

    if !OCR_LANGUAGES.contains(&language) {
        violations.push(Violation {
            field: "language".to_string(),
            message: format!(
                "Unsupported language code '{}'. Supported: {}",
                language,
                OCR_LANGUAGES.join(", ")
            ),
        });
    }

    let format = match extract_format.parse::<ExtractFormat>() {
        Ok(f) => Some(f),
        Err(_) => {
            violations.push(Violation {
                field: "extract_format".to_string(),
                message: "extract_format must be one of: text, json, structured".to_string(),
            });
            None
        }
    };

    if !(0.0..=1.0).contains(&confidence_threshold) {
        violations.push(Violation {
            field: "confidence_threshold".to_string(),
            message: format!(
                "confidence_threshold must be between 0.0 and 1.0, got {}",
                confidence_threshold
            ),
        });
    }

    match (violations.is_empty(), format) {
        (true, Some(extract_format)) => Ok(OcrOptions {
            language: language.to_string(),
            extract_format,
            confidence_threshold,
        }),
        _ => Err(violations),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tts_request() -> TtsRequest {
        serde_json::from_value(serde_json::json!({"text": "Hello world"})).unwrap()
    }

    // Smallest valid PNG header; enough for format sniffing.
    const PNG_MAGIC: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    #[test]
    fn valid_tts_request_passes() {
        assert!(validate_tts(&tts_request()).is_ok());
    }

    #[test]
    fn empty_text_is_rejected_before_enqueue() {
        let mut req = tts_request();
        req.text = "   ".to_string();
        let violations = validate_tts(&req).unwrap_err();
        assert!(violations.iter().any(|v| v.field == "text"));
    }

    #[test]
    fn text_over_limit_is_rejected() {
        let mut req = tts_request();
        req.text = "a".repeat(MAX_TEXT_LENGTH + 1);
        let violations = validate_tts(&req).unwrap_err();
        assert!(violations.iter().any(|v| v.field == "text"));
    }

    #[test]
    fn speaking_rate_out_of_range_is_rejected() {
        let mut req = tts_request();
        req.speaking_rate = 5.0;
        let violations = validate_tts(&req).unwrap_err();
        assert!(violations.iter().any(|v| v.field == "speaking_rate"));
    }

    #[test]
    fn all_violations_are_reported_not_just_the_first() {
        let mut req = tts_request();
        req.text = String::new();
        req.speaking_rate = 5.0;
        req.pitch = 30.0;
        req.audio_format = "flac".to_string();
        req.voice_gender = "robot".to_string();
        let violations = validate_tts(&req).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert!(fields.contains(&"text"));
        assert!(fields.contains(&"speaking_rate"));
        assert!(fields.contains(&"pitch"));
        assert!(fields.contains(&"audio_format"));
        assert!(fields.contains(&"voice_gender"));
    }

    #[test]
    fn unknown_tts_language_is_rejected() {
        let mut req = tts_request();
        req.language = "xx".to_string();
        let violations = validate_tts(&req).unwrap_err();
        assert!(violations.iter().any(|v| v.field == "language"));
    }

    #[test]
    fn valid_upload_yields_typed_options() {
        let options =
            validate_upload("page.png", "image/png", PNG_MAGIC, "en", "json", 0.8).unwrap();
        assert_eq!(options.extract_format, ExtractFormat::Json);
        assert_eq!(options.language, "en");
    }

    #[test]
    fn text_plain_upload_is_rejected() {
        let violations =
            validate_upload("notes.txt", "text/plain", b"hello", "en", "text", 0.8).unwrap_err();
        assert!(violations
            .iter()
            .any(|v| v.field == "file" && v.message.contains("text/plain")));
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let data = vec![0u8; MAX_FILE_SIZE + 1];
        let violations =
            validate_upload("big.png", "image/png", &data, "en", "text", 0.8).unwrap_err();
        assert!(violations.iter().any(|v| v.message.contains("too large")));
    }

    #[test]
    fn empty_upload_is_rejected() {
        let violations = validate_upload("page.png", "image/png", &[], "en", "text", 0.8)
            .unwrap_err();
        assert!(violations.iter().any(|v| v.message.contains("empty")));
    }

    #[test]
    fn non_image_bytes_with_image_mime_are_rejected() {
        let violations =
            validate_upload("fake.png", "image/png", b"not an image", "en", "text", 0.8)
                .unwrap_err();
        assert!(violations
            .iter()
            .any(|v| v.message.contains("not a recognizable image")));
    }

    #[test]
    fn confidence_threshold_out_of_range_is_rejected() {
        let violations =
            validate_upload("page.png", "image/png", PNG_MAGIC, "en", "text", 1.5).unwrap_err();
        assert!(violations
            .iter()
            .any(|v| v.field == "confidence_threshold"));
    }
}
