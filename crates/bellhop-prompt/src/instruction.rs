// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System instruction composition.
//!
//! Sections are appended in a fixed order: role, guidance, channel notes,
//! language, tone, administrator behavior, knowledge context, and finally
//! the JSON reply contract. The contract must come last so it is the
//! freshest instruction in the model's window.

use bellhop_config::model::AgentConfig;

use crate::guidance::GuidanceKind;

const ORDER_GUIDANCE: &str = "The customer appears to be placing or asking about an order. \
Collect the product name and quantity, answer pricing questions from the product information \
provided, and keep the order moving toward confirmation.";

const SUPPORT_GUIDANCE: &str = "The customer appears to need support. Acknowledge the issue, \
use the store information provided, and collect the details needed to resolve or escalate it.";

const GENERAL_GUIDANCE: &str =
    "Answer the customer's question directly using the store information provided.";

const REPLY_CONTRACT: &str = r#"Reply ONLY with a single JSON object and no other text:
{
  "intent": "HUMAN_AGENT_REQUEST" | "SUPPORT_REQUEST" | "ORDER_PLACEMENT" | "GENERAL_QUERY",
  "confidence": <number between 0 and 1>,
  "response": "<the message to send to the customer>",
  "requires_escalation": <boolean>,
  "escalation_reason": "<string>" | null,
  "detected_entities": {
    "product_mentions": ["<product name>", ...],
    "issue_type": "<string>" | null,
    "urgency_level": "low" | "medium" | "high",
    "order_info": {"product": "<string>" | null, "quantity": <number> | null} | null
  }
}"#;

/// Compose the full system instruction for one turn.
pub fn build_instruction(
    agent: &AgentConfig,
    guidance: GuidanceKind,
    channel: &str,
    knowledge_block: &str,
) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(format!(
        "You are {}, a customer support assistant for this business. You handle questions, \
         support issues, and product orders over chat.",
        agent.name
    ));

    sections.push(
        match guidance {
            GuidanceKind::Order => ORDER_GUIDANCE,
            GuidanceKind::Support => SUPPORT_GUIDANCE,
            GuidanceKind::General => GENERAL_GUIDANCE,
        }
        .to_string(),
    );

    if channel.eq_ignore_ascii_case("whatsapp") {
        sections.push(
            "You are replying on WhatsApp. Keep replies short and conversational. \
             Plain text only, no markdown formatting."
                .to_string(),
        );
    } else {
        sections.push("Keep replies short and conversational.".to_string());
    }

    sections.push(format!("Respond in {}.", agent.language));
    sections.push(format!("Tone: {}.", agent.tone));

    if let Some(behavior) = &agent.custom_behavior {
        if !behavior.trim().is_empty() {
            sections.push(behavior.clone());
        }
    }

    if !knowledge_block.is_empty() {
        sections.push(knowledge_block.to_string());
    }

    sections.push(REPLY_CONTRACT.to_string());

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> AgentConfig {
        AgentConfig {
            custom_behavior: Some("Always mention the loyalty program.".to_string()),
            ..AgentConfig::default()
        }
    }

    #[test]
    fn sections_appear_in_contract_order() {
        let instruction = build_instruction(
            &agent(),
            GuidanceKind::Order,
            "whatsapp",
            "Matching products:\n- Chocolate Cake (price 2400.00)",
        );

        let role = instruction.find("customer support assistant").unwrap();
        let guidance = instruction.find("placing or asking about an order").unwrap();
        let channel = instruction.find("replying on WhatsApp").unwrap();
        let language = instruction.find("Respond in").unwrap();
        let tone = instruction.find("Tone:").unwrap();
        let custom = instruction.find("loyalty program").unwrap();
        let knowledge = instruction.find("Matching products:").unwrap();
        let contract = instruction.find("Reply ONLY with a single JSON object").unwrap();

        assert!(role < guidance);
        assert!(guidance < channel);
        assert!(channel < language);
        assert!(language < tone);
        assert!(tone < custom);
        assert!(custom < knowledge);
        assert!(knowledge < contract);
    }

    #[test]
    fn empty_knowledge_block_is_omitted() {
        let instruction = build_instruction(&agent(), GuidanceKind::General, "whatsapp", "");
        assert!(!instruction.contains("\n\n\n"));
        assert!(instruction.contains("Reply ONLY"));
    }

    #[test]
    fn unknown_channel_gets_generic_notes() {
        let instruction = build_instruction(&agent(), GuidanceKind::General, "telegram", "");
        assert!(!instruction.contains("WhatsApp"));
        assert!(instruction.contains("short and conversational"));
    }

    #[test]
    fn contract_names_all_intents() {
        let instruction = build_instruction(&agent(), GuidanceKind::General, "whatsapp", "");
        for intent in [
            "HUMAN_AGENT_REQUEST",
            "SUPPORT_REQUEST",
            "ORDER_PLACEMENT",
            "GENERAL_QUERY",
        ] {
            assert!(instruction.contains(intent), "missing {intent}");
        }
    }
}
