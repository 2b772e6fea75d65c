// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini `generateContent` / `embedContent` request and response types.
//!
//! The wire format uses camelCase keys throughout; responses are
//! deserialized leniently because the API adds fields over time.

use serde::{Deserialize, Serialize};

// --- Request types ---

/// A request to the Gemini `generateContent` endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// System instruction steering the whole conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,

    /// Conversation turns, oldest first.
    pub contents: Vec<Content>,

    /// Sampling configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// System instruction wrapper (role-less content).
#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    /// Instruction text parts.
    pub parts: Vec<Part>,
}

impl SystemInstruction {
    /// Wraps a single block of instruction text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// A single conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Turn role: "user" or "model".
    pub role: String,
    /// Text parts of the turn.
    pub parts: Vec<Part>,
}

impl Content {
    /// Builds a single-part turn.
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// A text part within a content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Raw text.
    pub text: String,
}

/// Sampling configuration for generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// A request to the Gemini `embedContent` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedContentRequest {
    /// Fully qualified model name, e.g. "models/text-embedding-004".
    pub model: String,
    /// Text to embed.
    pub content: EmbedContent,
}

/// Content wrapper for an embedding request.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedContent {
    /// Text parts to embed.
    pub parts: Vec<Part>,
}

// --- Response types ---

/// A response from `generateContent`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    /// Generation candidates; the first one carries the reply.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn first_text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let content = candidate.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// One generation candidate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content; absent when the candidate was blocked.
    #[serde(default)]
    pub content: Option<ResponseContent>,
    /// Why generation stopped (e.g. "STOP", "SAFETY").
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Content of a candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseContent {
    /// Text parts; non-text parts deserialize with `text: None`.
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
    /// Role, normally "model".
    #[serde(default)]
    pub role: Option<String>,
}

/// A part of a response, text or otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePart {
    /// Text payload when the part is textual.
    #[serde(default)]
    pub text: Option<String>,
}

/// A response from `embedContent`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedContentResponse {
    /// The embedding vector.
    pub embedding: EmbeddingValues,
}

/// Embedding vector wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingValues {
    /// Vector components.
    pub values: Vec<f32>,
}

/// Google API error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorDetail,
}

/// Error detail within an API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// Numeric HTTP-style code.
    #[serde(default)]
    pub code: i64,
    /// Human-readable error message.
    #[serde(default)]
    pub message: String,
    /// Status identifier (e.g. "RESOURCE_EXHAUSTED").
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_generate_request_camel_case() {
        let req = GenerateContentRequest {
            system_instruction: Some(SystemInstruction::text("You are a support agent.")),
            contents: vec![Content::new("user", "hello")],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.4),
            }),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are a support agent."
        );
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["temperature"], 0.4);
    }

    #[test]
    fn serialize_generate_request_omits_absent_fields() {
        let req = GenerateContentRequest {
            system_instruction: None,
            contents: vec![],
            generation_config: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("systemInstruction").is_none());
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn first_text_joins_parts() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Hello "}, {"text": "there"}]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.first_text().as_deref(), Some("Hello there"));
        assert_eq!(resp.candidates[0].finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn first_text_none_when_no_candidates() {
        let resp: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.first_text().is_none());
    }

    #[test]
    fn first_text_none_when_candidate_blocked() {
        let json = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let resp: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(resp.first_text().is_none());
    }

    #[test]
    fn deserialize_embed_response() {
        let json = r#"{"embedding": {"values": [0.1, -0.2, 0.3]}}"#;
        let resp: EmbedContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.embedding.values.len(), 3);
        assert!((resp.embedding.values[1] + 0.2).abs() < 1e-6);
    }

    #[test]
    fn deserialize_api_error() {
        let json = r#"{
            "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
        }"#;
        let err: ApiErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(err.error.code, 429);
        assert_eq!(err.error.status, "RESOURCE_EXHAUSTED");
    }
}
