use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

use crate::models::tts::{language_code, voice_name, AudioFormat, VoiceGender};

/// Voice parameters resolved from a validated TTS request.
#[derive(Debug, Clone)]
pub struct VoiceParams {
    pub language: String,
    pub gender: VoiceGender,
    pub index: u8,
    pub format: AudioFormat,
    pub speaking_rate: f64,
    pub pitch: f64,
    pub volume_gain_db: f64,
}

impl VoiceParams {
    pub fn voice_name(&self) -> Result<&'static str, SynthesisError> {
        voice_name(&self.language, self.gender, self.index).ok_or_else(|| {
            SynthesisError::Api(format!(
                "no voice configured for {}/{}/{}",
                self.language, self.gender, self.index
            ))
        })
    }
}

/// Client for a text:synthesize REST API returning base64 audio.
pub struct SynthesisClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

impl SynthesisClient {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Synthesize text into encoded audio bytes.
    pub async fn synthesize(
        &self,
        text: &str,
        params: &VoiceParams,
    ) -> Result<Vec<u8>, SynthesisError> {
        let url = format!("{}/v1/text:synthesize?key={}", self.endpoint, self.api_key);
        let voice = params.voice_name()?;

        let request_body = serde_json::json!({
            "input": {"text": text},
            "voice": {
                "languageCode": language_code(&params.language),
                "name": voice
            },
            "audioConfig": {
                "audioEncoding": params.format.api_encoding(),
                "speakingRate": params.speaking_rate,
                "pitch": params.pitch,
                "volumeGainDb": params.volume_gain_db
            }
        });

        let response = self
            .http
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(SynthesisError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Api(format!(
                "synthesize returned {}: {}",
                status, body
            )));
        }

        let parsed: SynthesizeResponse = response.json().await.map_err(SynthesisError::Http)?;
        base64::engine::general_purpose::STANDARD
            .decode(&parsed.audio_content)
            .map_err(|e| SynthesisError::Api(format!("invalid base64 audio content: {}", e)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Synthesis API error: {0}")]
    Api(String),
}
