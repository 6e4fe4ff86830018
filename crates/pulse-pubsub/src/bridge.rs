//! # Trigger Stream
//!
//! The push-to-pull bridge. A `TriggerStream` covers one or more trigger
//! names on a [`PubSubEngine`] and turns their push-side deliveries into an
//! ordered, cancellable pull sequence.
//!
//! All covered triggers feed clones of one channel sender, so the merged
//! sequence preserves global arrival order (per-trigger order within it).
//! The channel buffer is the pending-item queue; the single outstanding
//! `recv` is the pending pull. An arriving event either completes that pull
//! or is buffered, never both.

use crate::engine::{ChannelOptions, EventPayload, PubSubEngine, SubscriptionId};
use crate::error::PubSubError;
use crate::source::EventSource;
use async_trait::async_trait;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

/// Pull-based stream over one or more triggers.
///
/// Construction is cold: no engine listeners exist until the first pull (or
/// an explicit [`TriggerStream::ensure_subscribed`]), so a stream nobody
/// reads never buffers events and never leaks listeners.
///
/// State machine: `{not-subscribed} → first pull → {running} → cancel/fail →
/// {stopped}`, and `{stopped}` is terminal.
pub struct TriggerStream {
    engine: Arc<dyn PubSubEngine>,

    /// Trigger names this stream covers.
    triggers: Vec<String>,

    /// Options forwarded to each per-trigger registration.
    options: ChannelOptions,

    /// Sender cloned into each engine registration.
    sender: mpsc::UnboundedSender<EventPayload>,

    /// Pull side: buffered events in arrival order.
    receiver: mpsc::UnboundedReceiver<EventPayload>,

    /// Engine handles, present only while subscribed.
    subscription_ids: Option<Vec<SubscriptionId>>,

    /// Terminal latch.
    stopped: bool,
}

impl TriggerStream {
    /// Create a cold stream over `triggers` with default channel options.
    #[must_use]
    pub fn new(engine: Arc<dyn PubSubEngine>, triggers: Vec<String>) -> Self {
        Self::with_options(engine, triggers, ChannelOptions::default())
    }

    /// Create a cold stream over a single trigger.
    #[must_use]
    pub fn single(engine: Arc<dyn PubSubEngine>, trigger: impl Into<String>) -> Self {
        Self::new(engine, vec![trigger.into()])
    }

    /// Create a cold stream with explicit channel options.
    #[must_use]
    pub fn with_options(
        engine: Arc<dyn PubSubEngine>,
        triggers: Vec<String>,
        options: ChannelOptions,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            engine,
            triggers,
            options,
            sender,
            receiver,
            subscription_ids: None,
            stopped: false,
        }
    }

    /// Register one engine subscription per covered trigger.
    ///
    /// Normally invoked by the first pull; callers that must know all
    /// registrations exist before handing the stream off (e.g., a lifecycle
    /// manager) call it eagerly. No-op once subscribed or stopped.
    pub fn ensure_subscribed(&mut self) {
        if self.stopped || self.subscription_ids.is_some() {
            return;
        }
        let ids = self
            .triggers
            .iter()
            .map(|trigger| {
                self.engine
                    .subscribe(trigger, self.sender.clone(), &self.options)
            })
            .collect();
        debug!(triggers = ?self.triggers, ids = ?ids, "Trigger stream subscribed");
        self.subscription_ids = Some(ids);
    }

    /// Engine handles currently held, empty while cold or stopped.
    #[must_use]
    pub fn subscription_ids(&self) -> &[SubscriptionId] {
        self.subscription_ids.as_deref().unwrap_or(&[])
    }

    /// Trigger names this stream covers.
    #[must_use]
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    /// Pull the next event, `None` once stopped.
    ///
    /// The first call registers the engine listeners. Returns a buffered
    /// event immediately if one is pending, otherwise waits for the next
    /// publish on any covered trigger.
    pub async fn recv(&mut self) -> Option<EventPayload> {
        if self.stopped {
            return None;
        }
        self.ensure_subscribed();
        self.receiver.recv().await
    }

    /// Deregister listeners, drain buffered events, and latch `stopped`.
    fn teardown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        if let Some(ids) = self.subscription_ids.take() {
            for id in ids {
                if let Err(error) = self.engine.unsubscribe(id) {
                    debug!(id, %error, "Stale handle during stream teardown");
                }
            }
        }

        // Discard anything that arrived before deregistration took effect.
        while self.receiver.try_recv().is_ok() {}

        debug!(triggers = ?self.triggers, "Trigger stream stopped");
    }
}

#[async_trait]
impl EventSource for TriggerStream {
    async fn next(&mut self) -> Result<Option<EventPayload>, PubSubError> {
        Ok(self.recv().await)
    }

    async fn cancel(&mut self) {
        self.teardown();
    }
}

impl Stream for TriggerStream {
    type Item = EventPayload;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.stopped {
            return Poll::Ready(None);
        }
        this.ensure_subscribed();
        this.receiver.poll_recv(cx)
    }
}

impl Drop for TriggerStream {
    fn drop(&mut self) {
        self.teardown();
    }
}
