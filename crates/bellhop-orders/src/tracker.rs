// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order phase transitions and their persistence.
//!
//! [`OrderTracker::advance`] moves an order toward Confirming from whatever
//! the model extracted this turn. The Confirming exits (`confirm_pending`,
//! `complete`, `cancel`) are separate calls because the agent resolves
//! confirmation tokens before any model call is made.

use bellhop_core::{BellhopError, OrderInfo, OrderPhase};
use bellhop_knowledge::KnowledgeStore;
use bellhop_storage::queries::orders;
use bellhop_storage::Database;
use tracing::{debug, info};

use crate::state::OrderState;

/// Result of advancing an order: the persisted state and the reply the
/// customer should see this turn.
#[derive(Debug, Clone)]
pub struct OrderAdvance {
    pub state: OrderState,
    pub reply: String,
}

/// Drives order phase transitions for all conversations.
pub struct OrderTracker {
    db: Database,
    store: KnowledgeStore,
}

impl OrderTracker {
    pub fn new(db: Database, store: KnowledgeStore) -> Self {
        Self { db, store }
    }

    /// The conversation's in-flight order, if any.
    ///
    /// Completed and Cancelled records are not in flight; a new order
    /// placement starts over from CollectingInfo.
    pub async fn active_order(
        &self,
        conversation_id: &str,
    ) -> Result<Option<OrderState>, BellhopError> {
        let record = orders::get_order_state(&self.db, conversation_id).await?;
        Ok(record
            .map(|r| OrderState::from_record(&r))
            .filter(|s| !s.phase.is_terminal()))
    }

    /// Fold this turn's detected order details into the order and advance it.
    ///
    /// With no product yet, the reply asks for one. Once a product is known,
    /// an unspecified quantity defaults to 1 and the order moves to
    /// Confirming with a summary. Called again while Confirming (the customer
    /// changed something mid-confirmation), it refreshes the details and
    /// re-issues the summary.
    pub async fn advance(
        &self,
        conversation_id: &str,
        detected: Option<&OrderInfo>,
        product_mentions: &[String],
    ) -> Result<OrderAdvance, BellhopError> {
        let mut state = self
            .active_order(conversation_id)
            .await?
            .unwrap_or_else(|| OrderState::new(conversation_id));

        if let Some(info) = detected {
            if let Some(product) = info.product.as_deref().filter(|p| !p.trim().is_empty()) {
                state.product = Some(product.trim().to_string());
            }
            if let Some(quantity) = info.quantity.filter(|&q| q > 0) {
                state.quantity = Some(quantity);
            }
        }
        if state.product.is_none() {
            if let Some(mention) = product_mentions.iter().find(|m| !m.trim().is_empty()) {
                state.product = Some(mention.trim().to_string());
            }
        }

        let reply = match state.product.clone() {
            None => {
                state.phase = OrderPhase::CollectingInfo;
                "I'd be happy to help you place an order. Which product would you like?"
                    .to_string()
            }
            Some(product) => {
                let quantity = state.quantity.unwrap_or(1);
                state.quantity = Some(quantity);

                // Resolve the catalog entry for the canonical title and price.
                let catalog = self.store.find_product_by_name(&product).await?;
                if let Some(ref entry) = catalog {
                    state.product = Some(entry.title.clone());
                }

                state.phase = OrderPhase::Confirming;
                state.confirmed = false;
                summary_reply(
                    state.product.as_deref().unwrap_or(&product),
                    quantity,
                    catalog.as_ref().and_then(|p| unit_price(p.price, p.discount)),
                )
            }
        };

        orders::upsert_order_state(&self.db, &state.to_record()).await?;
        debug!(
            conversation = conversation_id,
            phase = state.phase.as_str(),
            product = state.product.as_deref().unwrap_or("-"),
            "order advanced"
        );
        Ok(OrderAdvance { state, reply })
    }

    /// Confirming -> Processing. The caller has already matched an exact
    /// affirmative token.
    pub async fn confirm_pending(
        &self,
        mut state: OrderState,
    ) -> Result<OrderState, BellhopError> {
        state.phase = OrderPhase::Processing;
        state.confirmed = true;
        orders::upsert_order_state(&self.db, &state.to_record()).await?;
        Ok(state)
    }

    /// Processing -> Completed once the order ticket exists. The ticket id
    /// lands in the order record and in the confirmation reply.
    pub async fn complete(
        &self,
        mut state: OrderState,
        ticket_id: &str,
    ) -> Result<OrderAdvance, BellhopError> {
        state.phase = OrderPhase::Completed;
        state.ticket_id = Some(ticket_id.to_string());
        orders::upsert_order_state(&self.db, &state.to_record()).await?;
        info!(
            conversation = state.conversation_id.as_str(),
            ticket = ticket_id,
            "order completed"
        );
        let reply = format!(
            "Thank you! Your order has been placed. Your order reference is {ticket_id}. \
             We'll be in touch shortly."
        );
        Ok(OrderAdvance { state, reply })
    }

    /// Confirming -> Cancelled on an exact negative token. Terminal.
    pub async fn cancel(&self, mut state: OrderState) -> Result<OrderAdvance, BellhopError> {
        state.phase = OrderPhase::Cancelled;
        state.confirmed = false;
        orders::upsert_order_state(&self.db, &state.to_record()).await?;
        info!(
            conversation = state.conversation_id.as_str(),
            "order cancelled"
        );
        Ok(OrderAdvance {
            state,
            reply: "No problem, I've cancelled that order. Is there anything else I can help \
                    you with?"
                .to_string(),
        })
    }
}

/// Discounted unit price, when the catalog has one.
fn unit_price(price: Option<f64>, discount: Option<f64>) -> Option<f64> {
    let price = price?;
    match discount {
        Some(d) if d > 0.0 => Some(price * (1.0 - d / 100.0)),
        _ => Some(price),
    }
}

fn summary_reply(product: &str, quantity: u32, unit_price: Option<f64>) -> String {
    let line = match unit_price {
        Some(unit) => {
            let total = unit * f64::from(quantity);
            format!("{quantity} x {product} ({unit:.2} each, {total:.2} total)")
        }
        None => format!("{quantity} x {product}"),
    };
    format!("Here's your order: {line}. Reply \"yes\" to confirm or \"no\" to cancel.")
}
