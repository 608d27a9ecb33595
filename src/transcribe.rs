//! Remote transcription of audio into LRC text.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::TranscribeError;

const PROMPT: &str = "You are a highly accurate audio transcription service. \
Transcribe the provided audio file and generate lyrics in LRC format. \
LRC format includes timestamps for each line, like [mm:ss.xx]. \
If the audio has no lyrics, just return \"[00:00.00]Instrumental\". \
If transcription is not possible, return \"[00:00.00]Transcription failed.\"";

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Anything that turns audio bytes into raw LRC text.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &[u8], mime_type: &str, name: &str) -> Result<String, TranscribeError>;
}

pub struct GeminiTranscriber {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiTranscriber {
    pub fn new(api_key: String, model: String, endpoint: String, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        GeminiTranscriber {
            agent,
            api_key,
            model,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl Transcriber for GeminiTranscriber {
    fn transcribe(&self, audio: &[u8], mime_type: &str, name: &str) -> Result<String, TranscribeError> {
        if self.api_key.trim().is_empty() {
            return Err(TranscribeError::MissingApiKey);
        }
        let payload = request_body(audio, mime_type).to_string();
        info!(%name, %mime_type, bytes = audio.len(), model = %self.model, "transcribing");

        let body = self
            .agent
            .post(&self.url())
            .header("x-goog-api-key", self.api_key.trim())
            .header("Content-Type", "application/json")
            .send(payload)?
            .body_mut()
            .read_to_string()?;

        let json: Value = serde_json::from_str(&body)?;
        let text = response_text(&json)?;
        debug!(%name, chars = text.len(), "transcription received");
        sanitize_lrc(&text)
    }
}

fn request_body(audio: &[u8], mime_type: &str) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "inlineData": { "mimeType": mime_type, "data": STANDARD.encode(audio) } },
                { "text": PROMPT },
            ]
        }]
    })
}

/// Concatenate the text parts of the first candidate.
fn response_text(json: &Value) -> Result<String, TranscribeError> {
    if let Some(err) = json.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(TranscribeError::Api(message.to_string()));
    }
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .ok_or(TranscribeError::InvalidFormat)?;
    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect())
}

/// Accept the model output only if it looks like LRC. A surrounding
/// markdown code fence is removed first.
pub fn sanitize_lrc(text: &str) -> Result<String, TranscribeError> {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string ("lrc", "text", ...) on the opening fence
        let rest = rest.split_once('\n').map_or("", |(_, body)| body);
        text = rest.trim_end().strip_suffix("```").unwrap_or(rest).trim();
    }
    if text.starts_with('[') && text.contains(']') {
        Ok(text.to_string())
    } else {
        Err(TranscribeError::InvalidFormat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lrc() {
        let out = sanitize_lrc("  [00:01.00]Hello\n[00:02.00]World \n").unwrap();
        assert_eq!(out, "[00:01.00]Hello\n[00:02.00]World");
    }

    #[test]
    fn rejects_prose() {
        assert!(matches!(
            sanitize_lrc("Sorry, I can't help with that."),
            Err(TranscribeError::InvalidFormat)
        ));
        assert!(matches!(sanitize_lrc(""), Err(TranscribeError::InvalidFormat)));
        assert!(matches!(sanitize_lrc("[no closing"), Err(TranscribeError::InvalidFormat)));
    }

    #[test]
    fn strips_code_fence() {
        let out = sanitize_lrc("```lrc\n[00:00.00]Instrumental\n```").unwrap();
        assert_eq!(out, "[00:00.00]Instrumental");
    }

    #[test]
    fn extracts_candidate_text() {
        let json = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "[00:01.00]a\n" }, { "text": "[00:02.00]b" }] }
            }]
        });
        assert_eq!(response_text(&json).unwrap(), "[00:01.00]a\n[00:02.00]b");
    }

    #[test]
    fn surfaces_api_errors() {
        let json = json!({ "error": { "code": 400, "message": "API key not valid" } });
        match response_text(&json) {
            Err(TranscribeError::Api(msg)) => assert_eq!(msg, "API key not valid"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(response_text(&json!({})), Err(TranscribeError::InvalidFormat)));
    }

    #[test]
    fn request_carries_inline_audio() {
        let body = request_body(b"abc", "audio/mpeg");
        let inline = &body["contents"][0]["parts"][0]["inlineData"];
        assert_eq!(inline["mimeType"], "audio/mpeg");
        assert_eq!(inline["data"], "YWJj");
        assert!(body["contents"][0]["parts"][1]["text"].as_str().unwrap().contains("LRC"));
    }

    #[test]
    fn missing_key_fails_without_network() {
        let t = GeminiTranscriber::new(
            "  ".into(),
            DEFAULT_MODEL.into(),
            DEFAULT_ENDPOINT.into(),
            Duration::from_secs(1),
        );
        assert!(matches!(
            t.transcribe(b"x", "audio/mpeg", "x.mp3"),
            Err(TranscribeError::MissingApiKey)
        ));
        assert_eq!(
            t.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
