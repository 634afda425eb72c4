use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Languages with configured synthesis voices.
pub const TTS_LANGUAGES: &[&str] = &["id", "en", "en-GB"];

/// Google TTS rejects inputs above 5000 characters.
pub const MAX_TEXT_LENGTH: usize = 5000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
}

impl AudioFormat {
    /// Encoding name expected by the synthesis API.
    pub fn api_encoding(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Wav => "LINEAR16",
            AudioFormat::Ogg => "OGG_OPUS",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Ogg => "audio/ogg",
        }
    }
}

/// Body of POST /api/v1/jobs/tts. Enumerated fields stay as strings so the
/// validator can report every violation instead of failing at deserialize.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TtsRequest {
    #[garde(skip)]
    pub text: String,

    #[garde(custom(valid_language))]
    #[serde(default = "default_language")]
    pub language: String,

    #[garde(custom(valid_gender))]
    #[serde(default = "default_gender")]
    pub voice_gender: String,

    #[garde(range(min = 0, max = 1))]
    #[serde(default)]
    pub voice_index: u8,

    #[garde(custom(valid_format))]
    #[serde(default = "default_format")]
    pub audio_format: String,

    #[garde(range(min = 0.25, max = 4.0))]
    #[serde(default = "default_rate")]
    pub speaking_rate: f64,

    #[garde(range(min = -20.0, max = 20.0))]
    #[serde(default)]
    pub pitch: f64,

    #[garde(range(min = -96.0, max = 16.0))]
    #[serde(default)]
    pub volume_gain_db: f64,

    #[garde(length(max = 50))]
    #[serde(default = "default_prefix")]
    pub file_prefix: String,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_gender() -> String {
    "female".to_string()
}

fn default_format() -> String {
    "mp3".to_string()
}

fn default_rate() -> f64 {
    1.0
}

fn default_prefix() -> String {
    "tts_audio".to_string()
}

fn valid_language(value: &str, _ctx: &()) -> garde::Result {
    if TTS_LANGUAGES.contains(&value) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "unsupported language '{}', supported: {}",
            value,
            TTS_LANGUAGES.join(", ")
        )))
    }
}

fn valid_gender(value: &str, _ctx: &()) -> garde::Result {
    value
        .parse::<VoiceGender>()
        .map(|_| ())
        .map_err(|_| garde::Error::new("voice_gender must be 'male' or 'female'"))
}

fn valid_format(value: &str, _ctx: &()) -> garde::Result {
    value
        .parse::<AudioFormat>()
        .map(|_| ())
        .map_err(|_| garde::Error::new("audio_format must be one of: mp3, wav, ogg"))
}

impl TtsRequest {
    /// Collapse runs of whitespace, mirroring what is sent to synthesis.
    pub fn normalized_text(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// First 100 characters of the normalized text, echoed in the
    /// submission acknowledgement so clients can confirm what was queued.
    pub fn text_preview(&self) -> String {
        let normalized = self.normalized_text();
        let mut preview: String = normalized.chars().take(100).collect();
        if normalized.chars().count() > 100 {
            preview.push_str("...");
        }
        preview
    }
}

/// Resolve a concrete voice from the fixed language/gender/index table.
/// `voice_index` selects between the two voices configured per gender.
pub fn voice_name(language: &str, gender: VoiceGender, index: u8) -> Option<&'static str> {
    let voices: [&str; 2] = match (language, gender) {
        ("en", VoiceGender::Female) => ["en-US-Chirp-A", "en-US-Chirp-C"],
        ("en", VoiceGender::Male) => ["en-US-Chirp-B", "en-US-Chirp-D"],
        ("en-GB", VoiceGender::Female) => ["en-GB-Chirp-A", "en-GB-Chirp-C"],
        ("en-GB", VoiceGender::Male) => ["en-GB-Chirp-B", "en-GB-Chirp-D"],
        ("id", VoiceGender::Female) => ["id-ID-Chirp-A", "id-ID-Chirp-C"],
        ("id", VoiceGender::Male) => ["id-ID-Chirp-B", "id-ID-Chirp-D"],
        _ => return None,
    };
    voices.get(index as usize).copied()
}

/// BCP-47 language code for the synthesis API.
pub fn language_code(language: &str) -> &'static str {
    match language {
        "id" => "id-ID",
        "en-GB" => "en-GB",
        _ => "en-US",
    }
}

/// Rough duration estimate in seconds, assuming ~150 characters per minute.
pub fn estimate_duration_secs(text_length: usize) -> f64 {
    (text_length as f64 / 150.0 * 60.0 * 10.0).round() / 10.0
}

/// Result payload attached to a completed TTS job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsResult {
    pub text_info: TtsTextInfo,
    pub audio_info: TtsAudioInfo,
    pub storage_info: StorageInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsTextInfo {
    pub text_length: usize,
    pub language: String,
    pub voice_gender: String,
    pub voice_index: u8,
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsAudioInfo {
    pub audio_format: String,
    pub size_bytes: usize,
    pub duration_estimate_secs: f64,
    pub speaking_rate: f64,
    pub pitch: f64,
    pub volume_gain_db: f64,
}

/// Storage reference shared by OCR and TTS results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageInfo {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url_expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> TtsRequest {
        TtsRequest {
            text: text.to_string(),
            language: default_language(),
            voice_gender: default_gender(),
            voice_index: 0,
            audio_format: default_format(),
            speaking_rate: 1.0,
            pitch: 0.0,
            volume_gain_db: 0.0,
            file_prefix: default_prefix(),
        }
    }

    #[test]
    fn default_voice_is_us_female_chirp_a() {
        assert_eq!(voice_name("en", VoiceGender::Female, 0), Some("en-US-Chirp-A"));
    }

    #[test]
    fn voice_table_covers_all_configured_languages() {
        for lang in TTS_LANGUAGES {
            for gender in [VoiceGender::Male, VoiceGender::Female] {
                for index in 0..2 {
                    assert!(
                        voice_name(lang, gender, index).is_some(),
                        "missing voice for {lang}/{gender}/{index}"
                    );
                }
            }
        }
    }

    #[test]
    fn voice_index_out_of_table_is_none() {
        assert_eq!(voice_name("en", VoiceGender::Female, 2), None);
        assert_eq!(voice_name("fr", VoiceGender::Female, 0), None);
    }

    #[test]
    fn language_codes_resolve_regions() {
        assert_eq!(language_code("id"), "id-ID");
        assert_eq!(language_code("en"), "en-US");
        assert_eq!(language_code("en-GB"), "en-GB");
    }

    #[test]
    fn duration_estimate_scales_with_length() {
        assert_eq!(estimate_duration_secs(150), 60.0);
        assert_eq!(estimate_duration_secs(0), 0.0);
        assert!(estimate_duration_secs(375) > estimate_duration_secs(300));
    }

    #[test]
    fn normalized_text_collapses_whitespace() {
        let req = request("  Hello \n\t world  ");
        assert_eq!(req.normalized_text(), "Hello world");
    }

    #[test]
    fn short_text_preview_is_verbatim() {
        let req = request("Hello world");
        assert_eq!(req.text_preview(), "Hello world");
    }

    #[test]
    fn long_text_preview_truncates_with_ellipsis() {
        let req = request(&"a".repeat(250));
        let preview = req.text_preview();
        assert_eq!(preview.chars().count(), 103);
        assert!(preview.ends_with("..."));
        assert!(preview.starts_with("aaa"));
    }

    #[test]
    fn rate_out_of_range_fails_garde() {
        let mut req = request("Hello world");
        req.speaking_rate = 5.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn defaults_pass_garde() {
        assert!(request("Hello world").validate().is_ok());
    }

    #[test]
    fn audio_format_parses_and_maps_encoding() {
        let fmt: AudioFormat = "ogg".parse().unwrap();
        assert_eq!(fmt.api_encoding(), "OGG_OPUS");
        assert_eq!(fmt.content_type(), "audio/ogg");
        assert!("flac".parse::<AudioFormat>().is_err());
    }
}
