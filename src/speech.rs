//! Speech-synthesis client for the hosted service.
//!
//! Sends cleaned text (prefixed with a fixed delivery instruction) and a
//! prebuilt voice name, and decodes the returned base64 PCM. Failures are
//! typed internally; boundary callers receive `None`, treat it as "no audio
//! available", and take no further action. No retries.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{debug, warn};
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::VoiceName;

/// Prefixed to every synthesis request body.
pub const SPEECH_INSTRUCTION: &str =
    "Read this naturally as a teacher. Smooth flow between English and Bangla. No robotic pauses. ";

const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Why a synthesis request failed. Internal taxonomy only.
#[derive(Error, Debug)]
pub enum SpeechFailure {
    #[error("no API credential configured")]
    MissingCredentials,

    #[error("network error: {0}")]
    Network(String),

    #[error("API returned status {status}")]
    Api { status: u16 },

    #[error("malformed response body")]
    Malformed,

    #[error("response contained no audio")]
    NoAudio,
}

/// Client for the remote speech collaborator.
pub struct SpeechClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl SpeechClient {
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_API_BASE.to_string(),
            model: TTS_MODEL.to_string(),
        }
    }

    /// Reads the API credential from `GEMINI_API_KEY` (or `API_KEY`).
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok();
        Self::new(api_key)
    }

    /// Points the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Boundary entry point: raw PCM bytes, or `None` when no audio is
    /// available for any reason. Callers must not retry.
    pub async fn fetch_pcm(&self, text: &str, voice: VoiceName) -> Option<Vec<u8>> {
        match self.synthesize(text, voice).await {
            Ok(pcm) => Some(pcm),
            Err(e) => {
                warn!("Speech synthesis failed: {}", e);
                None
            }
        }
    }

    /// Issues the synthesis request, surfacing a typed failure.
    pub async fn synthesize(&self, text: &str, voice: VoiceName) -> Result<Vec<u8>, SpeechFailure> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SpeechFailure::MissingCredentials)?;

        let full_text = format!("{}{}", SPEECH_INSTRUCTION, text);
        debug!(
            "Requesting speech synthesis ({} chars, voice {})",
            text.len(),
            voice.as_str()
        );

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": full_text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": voice.as_str() }
                    }
                }
            }
        });

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SpeechFailure::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SpeechFailure::Api {
                status: status.as_u16(),
            });
        }

        let data: Value = resp.json().await.map_err(|_| SpeechFailure::Malformed)?;
        let encoded = extract_audio(&data).ok_or(SpeechFailure::NoAudio)?;

        BASE64
            .decode(encoded)
            .map_err(|_| SpeechFailure::Malformed)
    }
}

/// Pulls the base64 audio payload out of a synthesis response.
fn extract_audio(data: &Value) -> Option<&str> {
    data["candidates"][0]["content"]["parts"][0]["inlineData"]["data"].as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_payload_is_extracted_from_response() {
        let data = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{ "inlineData": { "mimeType": "audio/L16", "data": "AAEC" } }]
                }
            }]
        });
        assert_eq!(extract_audio(&data), Some("AAEC"));
    }

    #[test]
    fn text_only_response_yields_no_audio() {
        let data = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "not audio" }] } }]
        });
        assert_eq!(extract_audio(&data), None);
    }

    #[tokio::test]
    async fn missing_credentials_map_to_none_at_the_boundary() {
        let client = SpeechClient::new(None);
        assert!(client.fetch_pcm("hello", VoiceName::Kore).await.is_none());

        let failure = client.synthesize("hello", VoiceName::Kore).await;
        assert!(matches!(failure, Err(SpeechFailure::MissingCredentials)));
    }
}
