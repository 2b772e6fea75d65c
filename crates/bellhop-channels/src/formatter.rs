// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel response templates.

use std::collections::HashMap;

use bellhop_config::model::TemplateConfig;

/// The placeholder a template must contain to receive the reply text.
pub const CONTENT_PLACEHOLDER: &str = "{content}";

/// Applies administrator-configured templates to outgoing text.
///
/// Templates are keyed by (channel, format_type). A missing template means
/// the content passes through unchanged; there is no default wrapping.
#[derive(Debug, Clone, Default)]
pub struct ResponseFormatter {
    templates: HashMap<(String, String), String>,
}

impl ResponseFormatter {
    pub fn from_config(templates: &[TemplateConfig]) -> Self {
        let templates = templates
            .iter()
            .map(|t| {
                (
                    (t.channel.clone(), t.format_type.clone()),
                    t.template.clone(),
                )
            })
            .collect();
        Self { templates }
    }

    pub fn format(&self, channel: &str, format_type: &str, content: &str) -> String {
        match self
            .templates
            .get(&(channel.to_string(), format_type.to_string()))
        {
            Some(template) => template.replace(CONTENT_PLACEHOLDER, content),
            None => content.to_string(),
        }
    }
}
