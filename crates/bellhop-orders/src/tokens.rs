// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confirmation token matching.
//!
//! A pending order is confirmed or declined only by an exact token after
//! trimming and lowercasing. "yes please" is conversation, not confirmation;
//! it re-routes through normal intent classification with the order intact.

/// Affirmative tokens. "ow" and the Sinhala form cover the deployment's
/// bilingual customer base.
const AFFIRMATIVE_TOKENS: &[&str] = &["yes", "ow", "ඔව්"];

/// Negative tokens, mirroring the affirmative set.
const NEGATIVE_TOKENS: &[&str] = &["no", "nope", "naa", "නෑ", "epa"];

/// The customer's answer to a pending confirmation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Affirmed,
    Declined,
}

/// Read a confirmation from raw input, or `None` when the input is neither
/// an exact affirmative nor an exact negative token.
pub fn read_confirmation(input: &str) -> Option<Confirmation> {
    let normalized = input.trim().to_lowercase();
    if AFFIRMATIVE_TOKENS.contains(&normalized.as_str()) {
        Some(Confirmation::Affirmed)
    } else if NEGATIVE_TOKENS.contains(&normalized.as_str()) {
        Some(Confirmation::Declined)
    } else {
        None
    }
}
