// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as value ranges, non-empty credentials, and duplicate
//! account or template keys.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::BellhopConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// every collected validation error (does not fail fast).
pub fn validate_config(config: &BellhopConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.agent.log_level
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.batching.window_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "batching.window_ms must be greater than zero".to_string(),
        });
    }

    if config.model.temperature < 0.0 || config.model.temperature > 2.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "model.temperature must be within 0.0..=2.0, got {}",
                config.model.temperature
            ),
        });
    }

    if config.model.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "model.request_timeout_secs must be greater than zero".to_string(),
        });
    }

    if config.retrieval.match_count == 0 {
        errors.push(ConfigError::Validation {
            message: "retrieval.match_count must be at least 1".to_string(),
        });
    }

    if config.retrieval.full_text_weight < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "retrieval.full_text_weight must be non-negative, got {}",
                config.retrieval.full_text_weight
            ),
        });
    }

    if config.retrieval.semantic_weight < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "retrieval.semantic_weight must be non-negative, got {}",
                config.retrieval.semantic_weight
            ),
        });
    }

    if config.retrieval.match_threshold < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "retrieval.match_threshold must be non-negative, got {}",
                config.retrieval.match_threshold
            ),
        });
    }

    if config.retrieval.fusion_constant == 0 {
        errors.push(ConfigError::Validation {
            message: "retrieval.fusion_constant must be at least 1".to_string(),
        });
    }

    if config.context.default_memory_length > 5 {
        errors.push(ConfigError::Validation {
            message: format!(
                "context.default_memory_length must be within 0..=5, got {}",
                config.context.default_memory_length
            ),
        });
    }

    if !(1..=6).contains(&config.context.default_timeout_hours) {
        errors.push(ConfigError::Validation {
            message: format!(
                "context.default_timeout_hours must be within 1..=6, got {}",
                config.context.default_timeout_hours
            ),
        });
    }

    let mut seen_numbers = HashSet::new();
    for (i, account) in config.whatsapp.accounts.iter().enumerate() {
        if account.phone_number_id.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("whatsapp.accounts[{i}].phone_number_id must not be empty"),
            });
        } else if !seen_numbers.insert(&account.phone_number_id) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate phone_number_id `{}` in [[whatsapp.accounts]]",
                    account.phone_number_id
                ),
            });
        }
        if account.access_token.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("whatsapp.accounts[{i}].access_token must not be empty"),
            });
        }
        if account.verify_token.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("whatsapp.accounts[{i}].verify_token must not be empty"),
            });
        }
    }

    let mut seen_templates = HashSet::new();
    for (i, template) in config.templates.iter().enumerate() {
        if template.channel.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("templates[{i}].channel must not be empty"),
            });
        }
        if template.format_type.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("templates[{i}].format_type must not be empty"),
            });
        }
        let key = (template.channel.as_str(), template.format_type.as_str());
        if !seen_templates.insert(key) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate template for channel `{}` and format_type `{}`",
                    template.channel, template.format_type
                ),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
