//! # PubSub Engine Contract
//!
//! Defines the named-channel publish/subscribe boundary that event
//! substrates implement. The in-memory implementation lives in
//! [`crate::bus`]; distributed deployments would implement the same trait
//! over an external broker.

use crate::error::PubSubError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Payload carried by every published event.
///
/// The engine is payload-agnostic; JSON is the lingua franca between
/// publishers, filters, and the decode/execute boundary.
pub type EventPayload = Value;

/// Handle for one `(trigger, listener)` registration.
///
/// Monotonically increasing and unique for the lifetime of one engine
/// instance. Invalidated by `unsubscribe`; reusing a removed handle is an
/// error, never a silent no-op.
pub type SubscriptionId = u64;

/// Listener side of a registration: the engine forwards every payload
/// published on the trigger into this sink.
pub type EventSink = mpsc::UnboundedSender<EventPayload>;

/// Per-trigger subscription options.
///
/// Forwarded opaquely to the underlying transport/channel. The in-memory
/// engine has no transport and ignores them. Defaults to an empty map.
#[derive(Debug, Clone, Default)]
pub struct ChannelOptions {
    /// Free-form transport options keyed by name.
    pub values: HashMap<String, Value>,
}

impl ChannelOptions {
    /// Create empty channel options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one option value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

/// Named-channel publish/subscribe engine.
#[async_trait]
pub trait PubSubEngine: Send + Sync {
    /// Publish `payload` on `trigger`, forwarding it to every currently
    /// registered sink for that trigger.
    ///
    /// Delivery happens within this call (no deferral to a later tick), so
    /// per-trigger publish order is the delivery order. Publishing with zero
    /// listeners is success, not an error.
    ///
    /// # Returns
    ///
    /// The number of sinks the payload was delivered to.
    async fn publish(&self, trigger: &str, payload: EventPayload) -> usize;

    /// Register `sink` as a listener on `trigger`.
    ///
    /// Returns a fresh handle identifying exactly this registration.
    fn subscribe(&self, trigger: &str, sink: EventSink, options: &ChannelOptions)
        -> SubscriptionId;

    /// Remove the listener registered under `id`.
    ///
    /// # Errors
    ///
    /// `PubSubError::UnknownSubscription` if `id` was never issued or was
    /// already removed.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), PubSubError>;
}
