//! Chat client for the hosted generative-language service.
//!
//! Each question is a single-turn request: note context, selected text, and
//! the question are concatenated into one labeled prompt body under a fixed
//! teaching-persona system instruction. Failures are typed internally so
//! tests can tell "API down" from "empty response", but callers at the UI
//! boundary only ever see a benign fallback string.

use log::{debug, warn};
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::ChatMessage;

/// Fixed system instruction describing the assistant persona.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert Teacher. You are fluent in English and Bangla. \
Answer questions clearly, use examples, and provide step-by-step explanations. \
If the user provides a note context, base your answers on that note. \
Be concise but thorough. Use Markdown for formatting.";

/// Returned at the boundary for any transport or API failure.
pub const FALLBACK_REPLY: &str =
    "Sorry, I encountered an error connecting to the AI teacher. Please check your connection.";

/// Returned at the boundary when the service answers with no text.
pub const EMPTY_REPLY: &str = "I couldn't generate a response. Please try again.";

const CHAT_MODEL: &str = "gemini-3-flash-preview";
const TEMPERATURE: f64 = 0.7;
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Why a chat request failed. Internal taxonomy; never shown to the user.
#[derive(Error, Debug)]
pub enum ChatFailure {
    #[error("no API credential configured")]
    MissingCredentials,

    #[error("network error: {0}")]
    Network(String),

    #[error("API returned status {status}")]
    Api { status: u16 },

    #[error("malformed response body")]
    Malformed,

    #[error("response contained no text")]
    Empty,
}

/// Client for the remote chat collaborator.
pub struct Assistant {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl Assistant {
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_API_BASE.to_string(),
            model: CHAT_MODEL.to_string(),
        }
    }

    /// Reads the API credential from `GEMINI_API_KEY` (or `API_KEY`).
    /// Absence degrades requests to failure, never a startup crash.
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok();
        if api_key.is_none() {
            warn!("No API credential in environment; assistant calls will fail soft");
        }
        Self::new(api_key)
    }

    /// Points the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Boundary entry point: always yields text. Typed failures map to the
    /// fixed fallback strings so failure never propagates as an error.
    pub async fn reply(
        &self,
        question: &str,
        history: &[ChatMessage],
        image_base64: Option<&str>,
        note_context: &str,
        selected_text: &str,
    ) -> String {
        match self
            .ask(question, history, image_base64, note_context, selected_text)
            .await
        {
            Ok(text) => text,
            Err(ChatFailure::Empty) => EMPTY_REPLY.to_string(),
            Err(e) => {
                warn!("Assistant request failed: {}", e);
                FALLBACK_REPLY.to_string()
            }
        }
    }

    /// Issues the chat request, surfacing a typed failure.
    pub async fn ask(
        &self,
        question: &str,
        history: &[ChatMessage],
        image_base64: Option<&str>,
        note_context: &str,
        selected_text: &str,
    ) -> Result<String, ChatFailure> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ChatFailure::MissingCredentials)?;

        // Prior turns supply context only; each request stands alone with
        // the full note context rather than replaying the conversation.
        debug!(
            "Asking assistant ({} prior turns, image: {})",
            history.len(),
            image_base64.is_some()
        );

        let prompt = build_prompt(note_context, selected_text, question);

        let mut parts = Vec::new();
        if let Some(image) = image_base64 {
            parts.push(json!({
                "inline_data": {
                    "mime_type": "image/jpeg",
                    "data": strip_data_url(image),
                }
            }));
        }
        parts.push(json!({ "text": prompt }));

        let body = json!({
            "system_instruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "temperature": TEMPERATURE },
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
            .map_err(|e| ChatFailure::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ChatFailure::Api {
                status: status.as_u16(),
            });
        }

        let data: Value = resp.json().await.map_err(|_| ChatFailure::Malformed)?;
        extract_reply(&data).ok_or(ChatFailure::Empty)
    }
}

/// Concatenates the labeled context sections and the question into one
/// prompt body. Sections with no content are omitted entirely.
pub fn build_prompt(note_context: &str, selected_text: &str, question: &str) -> String {
    let mut prompt = String::new();

    if !note_context.is_empty() {
        prompt.push_str("[CONTEXT - CURRENT NOTE CONTENT]:\n");
        prompt.push_str(note_context);
        prompt.push_str("\n\n");
    }

    if !selected_text.is_empty() {
        prompt.push_str("[CONTEXT - USER SELECTED TEXT]:\n");
        prompt.push_str(selected_text);
        prompt.push_str("\n\n");
    }

    prompt.push_str("[USER QUESTION]:\n");
    prompt.push_str(question);
    prompt
}

/// Drops a `data:image/...;base64,` prefix if the payload carries one.
fn strip_data_url(image: &str) -> &str {
    match image.split_once(',') {
        Some((_, data)) => data,
        None => image,
    }
}

/// Pulls the concatenated text parts out of a generateContent response.
fn extract_reply(data: &Value) -> Option<String> {
    let parts = data["candidates"][0]["content"]["parts"].as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_only_populated_sections() {
        let prompt = build_prompt("note body", "picked text", "why?");
        assert!(prompt.starts_with("[CONTEXT - CURRENT NOTE CONTENT]:\nnote body\n\n"));
        assert!(prompt.contains("[CONTEXT - USER SELECTED TEXT]:\npicked text\n\n"));
        assert!(prompt.ends_with("[USER QUESTION]:\nwhy?"));

        let bare = build_prompt("", "", "just a question");
        assert_eq!(bare, "[USER QUESTION]:\njust a question");
        assert!(!bare.contains("[CONTEXT"));
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        assert_eq!(
            strip_data_url("data:image/jpeg;base64,AAAA"),
            "AAAA"
        );
        assert_eq!(strip_data_url("AAAA"), "AAAA");
    }

    #[test]
    fn reply_text_is_extracted_from_response() {
        let data = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] }
            }]
        });
        assert_eq!(extract_reply(&data).as_deref(), Some("Hello there"));
    }

    #[test]
    fn empty_or_malformed_response_yields_none() {
        let empty = serde_json::json!({
            "candidates": [{ "content": { "parts": [] } }]
        });
        assert_eq!(extract_reply(&empty), None);

        let malformed = serde_json::json!({ "error": { "code": 500 } });
        assert_eq!(extract_reply(&malformed), None);
    }

    #[tokio::test]
    async fn missing_credentials_map_to_fallback_reply() {
        let assistant = Assistant::new(None);
        let reply = assistant.reply("question", &[], None, "", "").await;
        assert_eq!(reply, FALLBACK_REPLY);

        let failure = assistant.ask("question", &[], None, "", "").await;
        assert!(matches!(failure, Err(ChatFailure::MissingCredentials)));
    }
}
