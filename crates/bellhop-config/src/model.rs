// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Bellhop support agent.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so that typoed config
//! keys are rejected at startup with an actionable diagnostic instead of
//! being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level Bellhop configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional and defaults to sensible
/// values; only credentials genuinely have to come from the operator.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BellhopConfig {
    /// Agent identity and persona settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Generation and embedding model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Webhook gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// WhatsApp Business integration settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Inbound message batching settings.
    #[serde(default)]
    pub batching: BatchingConfig,

    /// Hybrid knowledge retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Conversation context assembly settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Per-channel response templates, keyed by (channel, format_type).
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

/// Agent identity and persona configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent, used in prompts and replies.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Language the agent replies in.
    #[serde(default = "default_language")]
    pub language: String,

    /// Tone of voice used in replies.
    #[serde(default = "default_tone")]
    pub tone: String,

    /// Free-form extra behavior instructions appended to the prompt.
    #[serde(default)]
    pub custom_behavior: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            language: default_language(),
            tone: default_tone(),
            custom_behavior: None,
        }
    }
}

fn default_agent_name() -> String {
    "bellhop".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

fn default_tone() -> String {
    "friendly and professional".to_string()
}

/// Generation and embedding model configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// API key for the model provider. `None` requires an environment override.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the model API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for reply generation and classification.
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Model used for text embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Sampling temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            generation_model: default_generation_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_generation_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_temperature() -> f64 {
    0.4
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("bellhop").join("bellhop.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("bellhop.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Webhook gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address to bind the webhook server to.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind the webhook server to.
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8488
}

/// WhatsApp Business Cloud API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Base URL of the Cloud API.
    #[serde(default = "default_whatsapp_api_base")]
    pub api_base: String,

    /// Business phone numbers served by this instance.
    #[serde(default)]
    pub accounts: Vec<WhatsAppAccount>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base: default_whatsapp_api_base(),
            accounts: Vec::new(),
        }
    }
}

fn default_whatsapp_api_base() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}

/// One WhatsApp business phone number.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppAccount {
    /// Cloud API phone number id.
    pub phone_number_id: String,

    /// Bearer token for sending messages from this number.
    pub access_token: String,

    /// Token expected in webhook verification handshakes.
    pub verify_token: String,
}

/// Inbound message batching configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchingConfig {
    /// Debounce window in milliseconds. Each new message from a sender
    /// restarts this window; the batch flushes when it expires.
    #[serde(default = "default_batch_window_ms")]
    pub window_ms: u64,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            window_ms: default_batch_window_ms(),
        }
    }
}

fn default_batch_window_ms() -> u64 {
    1600
}

/// Hybrid knowledge retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Maximum number of fused matches returned per query.
    #[serde(default = "default_match_count")]
    pub match_count: usize,

    /// Weight of the full-text (BM25) channel in rank fusion.
    #[serde(default = "default_channel_weight")]
    pub full_text_weight: f64,

    /// Weight of the semantic (vector) channel in rank fusion.
    #[serde(default = "default_channel_weight")]
    pub semantic_weight: f64,

    /// Minimum cosine similarity for the semantic channel to count an
    /// entry as a candidate. Keyword (BM25) hits are not affected.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Rank-fusion smoothing constant. Larger values flatten the
    /// contribution difference between adjacent ranks.
    #[serde(default = "default_fusion_constant")]
    pub fusion_constant: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            match_count: default_match_count(),
            full_text_weight: default_channel_weight(),
            semantic_weight: default_channel_weight(),
            match_threshold: default_match_threshold(),
            fusion_constant: default_fusion_constant(),
        }
    }
}

fn default_match_count() -> usize {
    5
}

fn default_channel_weight() -> f64 {
    1.0
}

fn default_match_threshold() -> f64 {
    0.01
}

fn default_fusion_constant() -> u32 {
    60
}

/// Conversation context assembly configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Default memory length for new conversations, in exchange pairs.
    /// The history window is twice this value. Valid range 0..=5.
    #[serde(default = "default_memory_length")]
    pub default_memory_length: u32,

    /// Default inactivity timeout in hours before a conversation's
    /// context is considered stale. Valid range 1..=6.
    #[serde(default = "default_timeout_hours")]
    pub default_timeout_hours: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_memory_length: default_memory_length(),
            default_timeout_hours: default_timeout_hours(),
        }
    }
}

fn default_memory_length() -> u32 {
    3
}

fn default_timeout_hours() -> u32 {
    2
}

/// One response template, selected by (channel, format_type).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    /// Channel the template applies to, e.g. `whatsapp`.
    pub channel: String,

    /// Format type the template applies to, e.g. `text`.
    pub format_type: String,

    /// Template body. `{content}` is replaced with the reply text.
    pub template: String,
}
