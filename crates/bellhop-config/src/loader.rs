// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./bellhop.toml` > `~/.config/bellhop/bellhop.toml`
//! > `/etc/bellhop/bellhop.toml`, with environment variable overrides via the
//! `BELLHOP_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BellhopConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/bellhop/bellhop.toml` (system-wide)
/// 3. `~/.config/bellhop/bellhop.toml` (user XDG config)
/// 4. `./bellhop.toml` (local directory)
/// 5. `BELLHOP_*` environment variables
pub fn load_config() -> Result<BellhopConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit inline configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<BellhopConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BellhopConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BellhopConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BellhopConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BellhopConfig::default()))
        .merge(Toml::file("/etc/bellhop/bellhop.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("bellhop/bellhop.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("bellhop.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because many key names
/// themselves contain underscores: `BELLHOP_MODEL_API_KEY` must map to
/// `model.api_key`, not `model.api.key`.
fn env_provider() -> Env {
    Env::prefixed("BELLHOP_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: BELLHOP_MODEL_API_KEY -> "model_api_key"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("model_", "model.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("whatsapp_", "whatsapp.", 1)
            .replacen("batching_", "batching.", 1)
            .replacen("retrieval_", "retrieval.", 1)
            .replacen("context_", "context.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.agent.name, "bellhop");
        assert_eq!(config.batching.window_ms, 1600);
        assert_eq!(config.retrieval.fusion_constant, 60);
        assert_eq!(config.context.default_memory_length, 3);
        assert!(config.whatsapp.accounts.is_empty());
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[agent]
name = "concierge"
language = "Sinhala"

[batching]
window_ms = 2500

[[whatsapp.accounts]]
phone_number_id = "1055"
access_token = "secret"
verify_token = "handshake"
"#,
        )
        .unwrap();
        assert_eq!(config.agent.name, "concierge");
        assert_eq!(config.agent.language, "Sinhala");
        // Untouched agent keys keep their defaults.
        assert_eq!(config.agent.tone, "friendly and professional");
        assert_eq!(config.batching.window_ms, 2500);
        assert_eq!(config.whatsapp.accounts.len(), 1);
        assert_eq!(config.whatsapp.accounts[0].phone_number_id, "1055");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = load_config_from_str(
            r#"
[agent]
naem = "typo"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn templates_deserialize_as_array_of_tables() {
        let config = load_config_from_str(
            r#"
[[templates]]
channel = "whatsapp"
format_type = "text"
template = "{{response}}"

[[templates]]
channel = "whatsapp"
format_type = "order_confirmation"
template = "Order update: {{response}}"
"#,
        )
        .unwrap();
        assert_eq!(config.templates.len(), 2);
        assert_eq!(config.templates[1].format_type, "order_confirmation");
    }
}
