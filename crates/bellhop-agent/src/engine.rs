// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-turn pipeline.
//!
//! One [`TurnEngine::handle_inbound`] call takes a batched turn from
//! conversation lookup to the outbound reply. Failure handling is
//! deliberately lopsided: anything up to and including the inbound message
//! store aborts the turn, everything after degrades. A customer should get
//! a reply whenever one can possibly be produced, even if a ticket write or
//! the context log fell over along the way.

use std::sync::Arc;

use async_trait::async_trait;
use bellhop_batcher::{BatchHandler, BatchedTurn};
use bellhop_channels::ResponseFormatter;
use bellhop_config::model::ContextConfig;
use bellhop_context::{ContextAssembler, TurnContext};
use bellhop_core::{
    BellhopError, ChannelSender, Intent, IntentResult, OrderPhase, TicketKind, TicketPriority,
    FALLBACK_RESPONSE,
};
use bellhop_orders::{read_confirmation, Confirmation, OrderState, OrderTracker};
use bellhop_prompt::PromptContract;
use bellhop_storage::models::{Conversation, StoredMessage, DIRECTION_RECEIVED, DIRECTION_SENT};
use bellhop_storage::queries::{conversations, events, messages};
use bellhop_storage::Database;
use bellhop_tickets::{TicketDraft, TicketIssuer};
use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const FORMAT_TEXT: &str = "text";

/// Orchestrates one customer turn end to end.
pub struct TurnEngine {
    db: Database,
    assembler: ContextAssembler,
    contract: PromptContract,
    orders: OrderTracker,
    tickets: TicketIssuer,
    formatter: ResponseFormatter,
    sender: Arc<dyn ChannelSender>,
    context_defaults: ContextConfig,
}

impl TurnEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        assembler: ContextAssembler,
        contract: PromptContract,
        orders: OrderTracker,
        tickets: TicketIssuer,
        formatter: ResponseFormatter,
        sender: Arc<dyn ChannelSender>,
        context_defaults: ContextConfig,
    ) -> Self {
        Self {
            db,
            assembler,
            contract,
            orders,
            tickets,
            formatter,
            sender,
            context_defaults,
        }
    }

    /// Handle one batched turn. Returns the reply that was sent, or `None`
    /// when the conversation has the agent switched off.
    pub async fn handle_inbound(
        &self,
        turn: &BatchedTurn,
    ) -> Result<Option<String>, BellhopError> {
        let conversation = conversations::get_or_create(
            &self.db,
            &turn.channel,
            &turn.sender_id,
            turn.sender_name.as_deref(),
            self.context_defaults.default_memory_length,
            self.context_defaults.default_timeout_hours,
        )
        .await?;

        let inbound = StoredMessage {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            direction: DIRECTION_RECEIVED.to_string(),
            body: turn.text.clone(),
            order_info: None,
            created_at: Utc::now().to_rfc3339(),
        };
        messages::insert_message(&self.db, &inbound).await?;

        if !conversation.ai_enabled {
            debug!(
                conversation = conversation.id.as_str(),
                "agent disabled, message stored without reply"
            );
            return Ok(None);
        }

        let active = match self.orders.active_order(&conversation.id).await {
            Ok(active) => active,
            Err(e) => {
                self.note_failure("orders", &conversation.id, &e).await;
                None
            }
        };

        // Exact confirmation tokens bypass the model entirely.
        if let Some(state) = &active {
            if state.phase == OrderPhase::Confirming {
                match read_confirmation(&turn.text) {
                    Some(Confirmation::Affirmed) => {
                        return self.resolve_confirmed_order(&conversation, turn, state.clone()).await;
                    }
                    Some(Confirmation::Declined) => {
                        return self.resolve_declined_order(&conversation, turn, state.clone()).await;
                    }
                    None => {}
                }
            }
        }

        let order_active = active.is_some();
        let context = match self.assembler.assemble(&conversation, &turn.text).await {
            Ok(context) => context,
            Err(e) => {
                self.note_failure("context", &conversation.id, &e).await;
                TurnContext {
                    knowledge_block: String::new(),
                    history: Vec::new(),
                    matches: Vec::new(),
                }
            }
        };

        let result = self
            .contract
            .generate(&turn.text, &turn.channel, &context, order_active)
            .await;

        let mut reply = result.response.clone();
        let mut order_state: Option<OrderState> = None;

        if result.intent == Intent::OrderPlacement || order_active {
            match self
                .orders
                .advance(
                    &conversation.id,
                    result.detected_entities.order_info.as_ref(),
                    &result.detected_entities.product_mentions,
                )
                .await
            {
                Ok(advance) => {
                    reply = advance.reply;
                    order_state = Some(advance.state);
                }
                Err(e) => self.note_failure("orders", &conversation.id, &e).await,
            }
        }

        let message_count = match messages::count_messages(&self.db, &conversation.id).await {
            Ok(count) => count,
            Err(e) => {
                self.note_failure("storage", &conversation.id, &e).await;
                0
            }
        };

        let decision = crate::escalation::decide(
            &result,
            result.detected_entities.urgency_level,
            message_count,
        );
        if let Some(reason) = decision.reason {
            match self
                .tickets
                .create(
                    self.escalation_draft(&conversation, turn, &result, reason),
                    &turn.provider_message_id,
                )
                .await
            {
                Ok(issued) => {
                    info!(
                        conversation = conversation.id.as_str(),
                        ticket = issued.id.as_str(),
                        reason,
                        "turn escalated to a human agent"
                    );
                    reply.push_str(&format!(
                        "\n\nI've escalated this to a human agent who will follow up with \
                         you shortly. Your reference is {}.",
                        issued.id
                    ));
                }
                Err(e) => self.note_failure("tickets", &conversation.id, &e).await,
            }
        } else if result.intent == Intent::SupportRequest {
            match self
                .tickets
                .create(
                    self.support_draft(&conversation, turn, &result),
                    &turn.provider_message_id,
                )
                .await
            {
                Ok(issued) if !issued.deduplicated => {
                    reply.push_str(&format!(
                        "\n\nI've logged a support ticket for this. Your reference is {}.",
                        issued.id
                    ));
                }
                Ok(_) => {}
                Err(e) => self.note_failure("tickets", &conversation.id, &e).await,
            }
        }

        self.finish_turn(&conversation, turn, reply, order_state.as_ref())
            .await
    }

    /// Affirmed while Confirming: ticket first, then Completed, then reply.
    /// The ticket write is the one step that must succeed; without it the
    /// order stays Processing and the customer gets the apology reply.
    async fn resolve_confirmed_order(
        &self,
        conversation: &Conversation,
        turn: &BatchedTurn,
        state: OrderState,
    ) -> Result<Option<String>, BellhopError> {
        let outcome = async {
            let processing = self.orders.confirm_pending(state).await?;
            let issued = self
                .tickets
                .create(self.order_draft(conversation, &processing), &turn.provider_message_id)
                .await?;
            self.orders.complete(processing, &issued.id).await
        }
        .await;

        match outcome {
            Ok(done) => {
                self.finish_turn(conversation, turn, done.reply, Some(&done.state))
                    .await
            }
            Err(e) => {
                self.note_failure("orders", &conversation.id, &e).await;
                self.finish_turn(conversation, turn, FALLBACK_RESPONSE.to_string(), None)
                    .await
            }
        }
    }

    async fn resolve_declined_order(
        &self,
        conversation: &Conversation,
        turn: &BatchedTurn,
        state: OrderState,
    ) -> Result<Option<String>, BellhopError> {
        match self.orders.cancel(state).await {
            Ok(done) => {
                self.finish_turn(conversation, turn, done.reply, Some(&done.state))
                    .await
            }
            Err(e) => {
                self.note_failure("orders", &conversation.id, &e).await;
                self.finish_turn(conversation, turn, FALLBACK_RESPONSE.to_string(), None)
                    .await
            }
        }
    }

    /// Format, send, store the outbound message, bump the context clock.
    /// Everything in here is recoverable; the turn is already handled.
    async fn finish_turn(
        &self,
        conversation: &Conversation,
        turn: &BatchedTurn,
        reply: String,
        order_state: Option<&OrderState>,
    ) -> Result<Option<String>, BellhopError> {
        let formatted = self.formatter.format(&turn.channel, FORMAT_TEXT, &reply);

        if let Err(e) = self
            .sender
            .send_text(&turn.account_id, &turn.sender_id, &formatted)
            .await
        {
            self.note_failure("channel", &conversation.id, &e).await;
        }

        let outbound = StoredMessage {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            direction: DIRECTION_SENT.to_string(),
            body: formatted.clone(),
            order_info: order_state.map(OrderState::snapshot_json),
            created_at: Utc::now().to_rfc3339(),
        };
        if let Err(e) = messages::insert_message(&self.db, &outbound).await {
            self.note_failure("storage", &conversation.id, &e).await;
        }

        if let Err(e) = conversations::touch_context(&self.db, &conversation.id).await {
            self.note_failure("storage", &conversation.id, &e).await;
        }

        Ok(Some(formatted))
    }

    fn order_draft(&self, conversation: &Conversation, state: &OrderState) -> TicketDraft {
        let product = state.product.as_deref().unwrap_or("unknown product");
        TicketDraft {
            title: format!("Order: {product}"),
            customer_name: self.customer_name(conversation),
            channel: conversation.channel.clone(),
            kind: TicketKind::Order,
            priority: TicketPriority::High,
            body: format!(
                "Confirmed order of {} x {product}.",
                state.quantity.unwrap_or(1)
            ),
            product_info: Some(state.snapshot_json()),
            conversation_id: conversation.id.clone(),
        }
    }

    fn escalation_draft(
        &self,
        conversation: &Conversation,
        turn: &BatchedTurn,
        result: &IntentResult,
        reason: &str,
    ) -> TicketDraft {
        TicketDraft {
            title: format!("Escalation: {reason}"),
            customer_name: self.customer_name(conversation),
            channel: conversation.channel.clone(),
            kind: TicketKind::Escalation,
            priority: TicketPriority::High,
            body: format!(
                "Reason: {reason}\nIntent: {}\nCustomer message: {}",
                result.intent, turn.text
            ),
            product_info: None,
            conversation_id: conversation.id.clone(),
        }
    }

    fn support_draft(
        &self,
        conversation: &Conversation,
        turn: &BatchedTurn,
        result: &IntentResult,
    ) -> TicketDraft {
        let title = match result.detected_entities.issue_type.as_deref() {
            Some(issue) => format!("Support: {issue}"),
            None => "Support request".to_string(),
        };
        TicketDraft {
            title,
            customer_name: self.customer_name(conversation),
            channel: conversation.channel.clone(),
            kind: TicketKind::Support,
            priority: TicketPriority::Low,
            body: turn.text.clone(),
            product_info: None,
            conversation_id: conversation.id.clone(),
        }
    }

    fn customer_name(&self, conversation: &Conversation) -> String {
        conversation
            .contact_name
            .clone()
            .unwrap_or_else(|| conversation.contact_id.clone())
    }

    async fn note_failure(&self, component: &str, conversation_id: &str, err: &BellhopError) {
        warn!(
            component,
            conversation = conversation_id,
            error = %err,
            "recoverable pipeline failure"
        );
        let metadata = format!(r#"{{"conversation":"{conversation_id}"}}"#);
        if let Err(log_err) =
            events::record_error(&self.db, component, "error", &err.to_string(), Some(&metadata))
                .await
        {
            error!(error = %log_err, "failed to append to the error log");
        }
    }
}

#[async_trait]
impl BatchHandler for TurnEngine {
    async fn handle_turn(&self, turn: BatchedTurn) {
        if let Err(e) = self.handle_inbound(&turn).await {
            error!(
                sender = turn.sender_id.as_str(),
                error = %e,
                "turn aborted"
            );
            let metadata = format!(r#"{{"sender":"{}"}}"#, turn.sender_id);
            if let Err(log_err) =
                events::record_error(&self.db, "agent", "error", &e.to_string(), Some(&metadata))
                    .await
            {
                error!(error = %log_err, "failed to append to the error log");
            }
        }
    }
}
