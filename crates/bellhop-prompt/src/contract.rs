// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tolerant extraction of the structured reply from raw model output.
//!
//! Models wrap the JSON they were asked for in thinking blocks, code
//! fences, and prose. Extraction peels those layers in a fixed order and
//! then validates the object against the reply schema. Any failure means
//! the caller falls back to a canned reply; nothing in here returns an
//! error.

use bellhop_core::{clamp_unit, DetectedEntities, Intent, IntentResult, OrderInfo, UrgencyLevel};
use serde_json::Value;

/// Parse raw model output into an [`IntentResult`].
///
/// Returns `None` on any parse or schema failure; the caller substitutes
/// [`IntentResult::fallback`].
pub fn parse_model_reply(raw: &str) -> Option<IntentResult> {
    let without_think = strip_think_blocks(raw);
    let without_fences = strip_code_fences(&without_think);
    let value = first_json_object(&without_fences)?;
    validate_reply(&value)
}

/// Remove `<think>...</think>` spans. An unclosed tag swallows the rest of
/// the text, which matches how truncated thinking output arrives.
fn strip_think_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// Deserialize the first complete JSON object found in the text. Anything
/// after the closing brace is ignored.
fn first_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Validate the parsed object against the reply schema.
fn validate_reply(value: &Value) -> Option<IntentResult> {
    let obj = value.as_object()?;

    let intent: Intent = serde_json::from_value(obj.get("intent")?.clone()).ok()?;
    let confidence = clamp_unit(obj.get("confidence")?.as_f64()?);

    let response = obj.get("response")?.as_str()?.trim();
    if response.is_empty() {
        return None;
    }

    // requires_escalation and detected_entities are required fields; a
    // reply that drops them failed the schema as a whole, so the caller
    // falls back rather than trusting the rest of it.
    let requires_escalation = obj.get("requires_escalation")?.as_bool()?;
    let escalation_reason = match obj.get("escalation_reason") {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_str()?.to_string()),
    };

    let detected_entities = validate_entities(obj.get("detected_entities")?)?;

    Some(IntentResult {
        intent,
        confidence,
        response: response.to_string(),
        requires_escalation,
        escalation_reason,
        detected_entities,
    })
}

fn validate_entities(value: &Value) -> Option<DetectedEntities> {
    let obj = value.as_object()?;

    let product_mentions = match obj.get("product_mentions") {
        None | Some(Value::Null) => Vec::new(),
        Some(v) => v
            .as_array()?
            .iter()
            .filter_map(|item| item.as_str().map(String::from))
            .collect(),
    };

    let issue_type = match obj.get("issue_type") {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_str()?.to_string()),
    };

    let urgency_level = match obj.get("urgency_level") {
        None | Some(Value::Null) => UrgencyLevel::default(),
        Some(v) => match v.as_str()?.to_lowercase().as_str() {
            "low" => UrgencyLevel::Low,
            "medium" => UrgencyLevel::Medium,
            "high" => UrgencyLevel::High,
            _ => return None,
        },
    };

    let order_info: Option<OrderInfo> = match obj.get("order_info") {
        None | Some(Value::Null) => None,
        Some(v) => Some(serde_json::from_value(v.clone()).ok()?),
    };

    Some(DetectedEntities {
        product_mentions,
        issue_type,
        urgency_level,
        order_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{
        "intent": "ORDER_PLACEMENT",
        "confidence": 0.92,
        "response": "Sure, how many would you like?",
        "requires_escalation": false,
        "escalation_reason": null,
        "detected_entities": {
            "product_mentions": ["chocolate cake"],
            "issue_type": null,
            "urgency_level": "low",
            "order_info": {"product": "chocolate cake", "quantity": null}
        }
    }"#;

    #[test]
    fn parses_plain_json() {
        let result = parse_model_reply(PLAIN).unwrap();
        assert_eq!(result.intent, Intent::OrderPlacement);
        assert!((result.confidence - 0.92).abs() < 1e-9);
        assert_eq!(result.detected_entities.product_mentions, vec!["chocolate cake"]);
        assert_eq!(
            result
                .detected_entities
                .order_info
                .as_ref()
                .unwrap()
                .product
                .as_deref(),
            Some("chocolate cake")
        );
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{PLAIN}\n```");
        assert!(parse_model_reply(&fenced).is_some());
    }

    #[test]
    fn strips_closed_think_block() {
        let wrapped = format!("<think>the user wants cake</think>\n{PLAIN}");
        assert!(parse_model_reply(&wrapped).is_some());
    }

    #[test]
    fn tolerates_unclosed_think_block() {
        let truncated = format!("{PLAIN}\n<think>and also");
        assert!(parse_model_reply(&truncated).is_some());
    }

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let prose = format!("Here is the JSON you asked for:\n{PLAIN}\nHope that helps!");
        assert!(parse_model_reply(&prose).is_some());
    }

    #[test]
    fn confidence_is_clamped() {
        let hot = PLAIN.replace("0.92", "1.7");
        assert_eq!(parse_model_reply(&hot).unwrap().confidence, 1.0);
        let cold = PLAIN.replace("0.92", "-0.5");
        assert_eq!(parse_model_reply(&cold).unwrap().confidence, 0.0);
    }

    #[test]
    fn unknown_intent_fails() {
        let bad = PLAIN.replace("ORDER_PLACEMENT", "PIZZA_TIME");
        assert!(parse_model_reply(&bad).is_none());
    }

    #[test]
    fn empty_response_fails() {
        let bad = PLAIN.replace("Sure, how many would you like?", "  ");
        assert!(parse_model_reply(&bad).is_none());
    }

    #[test]
    fn missing_confidence_fails() {
        let bad = PLAIN.replace("\"confidence\": 0.92,", "");
        assert!(parse_model_reply(&bad).is_none());
    }

    #[test]
    fn non_list_product_mentions_fails() {
        let bad = PLAIN.replace("[\"chocolate cake\"]", "\"chocolate cake\"");
        assert!(parse_model_reply(&bad).is_none());
    }

    #[test]
    fn uppercase_urgency_is_accepted() {
        let loud = PLAIN.replace("\"low\"", "\"HIGH\"");
        let result = parse_model_reply(&loud).unwrap();
        assert_eq!(result.detected_entities.urgency_level, UrgencyLevel::High);
    }

    #[test]
    fn invalid_urgency_fails() {
        let bad = PLAIN.replace("\"low\"", "\"apocalyptic\"");
        assert!(parse_model_reply(&bad).is_none());
    }

    #[test]
    fn missing_requires_escalation_fails() {
        let bad = PLAIN.replace("\"requires_escalation\": false,", "");
        assert!(parse_model_reply(&bad).is_none());
        let null = PLAIN.replace("\"requires_escalation\": false", "\"requires_escalation\": null");
        assert!(parse_model_reply(&null).is_none());
    }

    #[test]
    fn missing_detected_entities_fails() {
        let bad = r#"{"intent": "GENERAL_QUERY", "confidence": 0.8, "response": "We open at 8am.",
                      "requires_escalation": false}"#;
        assert!(parse_model_reply(bad).is_none());
    }

    #[test]
    fn empty_detected_entities_gets_inner_defaults() {
        let minimal = r#"{"intent": "GENERAL_QUERY", "confidence": 0.8, "response": "We open at 8am.",
                          "requires_escalation": false, "detected_entities": {}}"#;
        let result = parse_model_reply(minimal).unwrap();
        assert!(!result.requires_escalation);
        assert!(result.detected_entities.product_mentions.is_empty());
        assert_eq!(result.detected_entities.urgency_level, UrgencyLevel::Low);
    }

    #[test]
    fn trailing_junk_after_object_is_ignored() {
        let with_junk = format!("{PLAIN}{{not json at all");
        assert!(parse_model_reply(&with_junk).is_some());
    }

    #[test]
    fn no_object_at_all_fails() {
        assert!(parse_model_reply("I could not produce JSON, sorry.").is_none());
        assert!(parse_model_reply("").is_none());
    }

    #[test]
    fn bare_array_fails() {
        assert!(parse_model_reply("[1, 2, 3]").is_none());
    }
}
