// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-sender debounce batching.
//!
//! Customers often send a thought as several rapid fragments. The batcher
//! collects fragments per sender and delivers them downstream as one logical
//! turn once the sender pauses for the debounce window. Every new fragment
//! restarts the window, so a sender who never pauses defers processing
//! indefinitely; there is deliberately no maximum-wait ceiling.
//!
//! Buffers live in a `DashMap` keyed by sender, so one sender's burst never
//! blocks another's. Timers are plain tokio sleeps; a generation counter on
//! each buffer guards the abort/re-arm race so a stale timer can never flush
//! a buffer that has since grown.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

/// One inbound fragment as the gateway received it.
#[derive(Debug, Clone)]
pub struct InboundFragment {
    pub channel: String,
    /// Receiving business account (the WhatsApp phone number id).
    pub account_id: String,
    pub sender_name: Option<String>,
    /// Provider-assigned message id, already deduplicated upstream.
    pub provider_message_id: String,
    pub text: String,
}

/// One logical turn: every fragment a sender submitted within one
/// continuously-extended debounce window, joined with single spaces.
#[derive(Debug, Clone)]
pub struct BatchedTurn {
    pub sender_id: String,
    pub channel: String,
    pub account_id: String,
    pub sender_name: Option<String>,
    /// Id of the last fragment in the batch; used as the turn's idempotency
    /// key downstream.
    pub provider_message_id: String,
    pub text: String,
}

/// Downstream consumer of batched turns.
#[async_trait]
pub trait BatchHandler: Send + Sync {
    async fn handle_turn(&self, turn: BatchedTurn);
}

struct PendingBatch {
    fragments: Vec<String>,
    channel: String,
    account_id: String,
    sender_name: Option<String>,
    provider_message_id: String,
    /// Bumped on every enqueue; a timer only flushes if its generation
    /// still matches.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl PendingBatch {
    fn new(fragment: InboundFragment) -> Self {
        Self {
            fragments: vec![fragment.text],
            channel: fragment.channel,
            account_id: fragment.account_id,
            sender_name: fragment.sender_name,
            provider_message_id: fragment.provider_message_id,
            generation: 0,
            timer: None,
        }
    }

    fn push(&mut self, fragment: InboundFragment) {
        self.fragments.push(fragment.text);
        self.account_id = fragment.account_id;
        self.provider_message_id = fragment.provider_message_id;
        if fragment.sender_name.is_some() {
            self.sender_name = fragment.sender_name;
        }
        self.generation += 1;
    }

    fn into_turn(self, sender_id: String) -> BatchedTurn {
        BatchedTurn {
            sender_id,
            channel: self.channel,
            account_id: self.account_id,
            sender_name: self.sender_name,
            provider_message_id: self.provider_message_id,
            text: self.fragments.join(" "),
        }
    }
}

/// Debounces inbound fragments into logical turns, one buffer per sender.
pub struct MessageBatcher {
    window: Duration,
    handler: Arc<dyn BatchHandler>,
    pending: DashMap<String, PendingBatch>,
}

impl MessageBatcher {
    pub fn new(window: Duration, handler: Arc<dyn BatchHandler>) -> Arc<Self> {
        Arc::new(Self {
            window,
            handler,
            pending: DashMap::new(),
        })
    }

    /// Buffer a fragment and (re)start the sender's debounce timer.
    ///
    /// The previous timer for the same sender is aborted; its generation is
    /// stale, so even an abort that lands after the sleep completed cannot
    /// cause a double flush.
    pub fn enqueue(self: &Arc<Self>, sender_id: &str, fragment: InboundFragment) {
        let generation = match self.pending.entry(sender_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let batch = occupied.get_mut();
                if let Some(timer) = batch.timer.take() {
                    timer.abort();
                }
                batch.push(fragment);
                let generation = batch.generation;
                batch.timer = Some(self.spawn_timer(sender_id.to_string(), generation));
                generation
            }
            Entry::Vacant(vacant) => {
                let mut batch = PendingBatch::new(fragment);
                batch.timer = Some(self.spawn_timer(sender_id.to_string(), 0));
                vacant.insert(batch);
                0
            }
        };
        debug!(sender = sender_id, generation, "fragment buffered");
    }

    fn spawn_timer(self: &Arc<Self>, sender_id: String, generation: u64) -> JoinHandle<()> {
        let batcher = Arc::clone(self);
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            batcher.fire(&sender_id, generation).await;
        })
    }

    async fn fire(&self, sender_id: &str, generation: u64) {
        let Some((key, batch)) = self
            .pending
            .remove_if(sender_id, |_, batch| batch.generation == generation)
        else {
            return;
        };
        let turn = batch.into_turn(key);
        debug!(
            sender = sender_id,
            fragments = turn.text.split(' ').count(),
            "debounce window expired, delivering turn"
        );
        self.handler.handle_turn(turn).await;
    }

    /// Deliver a sender's buffer immediately, if one is pending. Used on
    /// shutdown so buffered text is not lost.
    pub async fn flush(&self, sender_id: &str) {
        let Some((key, mut batch)) = self.pending.remove(sender_id) else {
            return;
        };
        if let Some(timer) = batch.timer.take() {
            timer.abort();
        }
        self.handler.handle_turn(batch.into_turn(key)).await;
    }

    /// Senders with a buffer currently waiting on the debounce window.
    pub fn pending_senders(&self) -> Vec<String> {
        self.pending.iter().map(|entry| entry.key().clone()).collect()
    }
}
