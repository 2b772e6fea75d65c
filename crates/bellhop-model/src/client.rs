// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini API.
//!
//! Provides [`GeminiClient`], which implements both [`ModelProvider`]
//! (reply generation) and [`EmbeddingProvider`] (query/document vectors).
//! Every call makes exactly one attempt: the conversation pipeline treats
//! a failed generation as a fallback reply, so retrying here would only
//! stretch the customer's wait.

use std::time::Duration;

use async_trait::async_trait;
use bellhop_config::model::ModelConfig;
use bellhop_core::{BellhopError, EmbeddingProvider, ModelProvider, ModelTurn};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{
    ApiErrorResponse, Content, EmbedContent, EmbedContentRequest, EmbedContentResponse,
    GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part, SystemInstruction,
};

/// HTTP client for Gemini generation and embedding endpoints.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    generation_model: String,
    embedding_model: String,
    temperature: f64,
}

impl GeminiClient {
    /// Creates a client from the model section of the configuration.
    ///
    /// Fails when `model.api_key` is unset or unusable as a header value.
    pub fn new(config: &ModelConfig) -> Result<Self, BellhopError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| BellhopError::Config("model.api_key is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key).map_err(|e| {
                BellhopError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BellhopError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            generation_model: config.generation_model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: config.temperature,
        })
    }

    /// Returns the generation model identifier.
    pub fn generation_model(&self) -> &str {
        &self.generation_model
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn post_json<B: serde::Serialize>(
        &self,
        url: String,
        body: &B,
    ) -> Result<String, BellhopError> {
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BellhopError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, url = %url, "Gemini response received");

        let body = response.text().await.map_err(|e| BellhopError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if status.is_success() {
            return Ok(body);
        }

        let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
            format!(
                "Gemini API error ({}): {}",
                api_err.error.status, api_err.error.message
            )
        } else {
            format!("API returned {status}: {body}")
        };
        Err(BellhopError::Provider {
            message,
            source: None,
        })
    }
}

#[async_trait]
impl ModelProvider for GeminiClient {
    async fn generate(
        &self,
        system_instruction: &str,
        turns: &[ModelTurn],
    ) -> Result<String, BellhopError> {
        let request = GenerateContentRequest {
            system_instruction: if system_instruction.is_empty() {
                None
            } else {
                Some(SystemInstruction::text(system_instruction))
            },
            contents: turns
                .iter()
                .map(|t| Content::new(t.role.as_str(), t.text.clone()))
                .collect(),
            generation_config: Some(GenerationConfig {
                temperature: Some(self.temperature),
            }),
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.generation_model
        );
        let body = self.post_json(url, &request).await?;

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| BellhopError::Provider {
                message: format!("failed to parse generation response: {e}"),
                source: Some(Box::new(e)),
            })?;

        parsed.first_text().ok_or_else(|| BellhopError::Provider {
            message: "generation response contained no text".to_string(),
            source: None,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BellhopError> {
        let request = EmbedContentRequest {
            model: format!("models/{}", self.embedding_model),
            content: EmbedContent {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        };

        let url = format!(
            "{}/models/{}:embedContent",
            self.base_url, self.embedding_model
        );
        let body = self.post_json(url, &request).await?;

        let parsed: EmbedContentResponse =
            serde_json::from_str(&body).map_err(|e| BellhopError::Provider {
                message: format!("failed to parse embedding response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.embedding.values)
    }
}
