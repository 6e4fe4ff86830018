//! # Persistent PubSub
//!
//! Pairs a [`PubSubEngine`] with an [`EventStore`] so events can be saved
//! before they are published and replayed later from a cursor. Also holds
//! the in-memory reference store used by tests and demos.

use crate::bridge::TriggerStream;
use crate::engine::{ChannelOptions, EventPayload, EventSink, PubSubEngine, SubscriptionId};
use crate::error::PubSubError;
use crate::replay::{Cursor, EventStore, ReplayOptions, ReplayStream, StoredEvent};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Outcome of a save-then-publish operation.
#[derive(Debug, Clone)]
pub struct PersistedPublish {
    /// The record as persisted, with its assigned sequence.
    pub record: StoredEvent,
    /// Number of live sinks the merged payload reached.
    pub delivered: usize,
}

/// A pub/sub engine with a durable log alongside it.
///
/// Live-only operations pass straight through to the engine; the durable
/// paths save first and publish the payload enriched with the record's
/// assigned sequence, so live consumers can resume from it later.
pub struct PersistentPubSub {
    engine: Arc<dyn PubSubEngine>,
    store: Arc<dyn EventStore>,
}

impl PersistentPubSub {
    /// Pair `engine` with `store`.
    pub fn new(engine: Arc<dyn PubSubEngine>, store: Arc<dyn EventStore>) -> Self {
        Self { engine, store }
    }

    /// Plain live publish, no persistence.
    pub async fn publish(&self, trigger: &str, payload: EventPayload) -> usize {
        self.engine.publish(trigger, payload).await
    }

    /// Passthrough to [`PubSubEngine::subscribe`].
    pub fn subscribe(
        &self,
        trigger: &str,
        sink: EventSink,
        options: &ChannelOptions,
    ) -> SubscriptionId {
        self.engine.subscribe(trigger, sink, options)
    }

    /// Passthrough to [`PubSubEngine::unsubscribe`].
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), PubSubError> {
        self.engine.unsubscribe(id)
    }

    /// Live pull stream over `triggers`.
    #[must_use]
    pub fn trigger_stream(&self, triggers: Vec<String>) -> TriggerStream {
        TriggerStream::new(self.engine.clone(), triggers)
    }

    /// Pull stream that drains persisted history (per `options`) before the
    /// live events on `triggers`.
    ///
    /// The live registration is created here, before any history fetch, so
    /// the handover precondition documented on [`ReplayStream`] holds as
    /// long as the store and engine share one ordering domain.
    #[must_use]
    pub fn replay_stream(
        &self,
        triggers: Vec<String>,
        options: ReplayOptions,
    ) -> ReplayStream<TriggerStream> {
        let mut live = TriggerStream::new(self.engine.clone(), triggers);
        live.ensure_subscribed();
        ReplayStream::new(self.store.clone(), options, live)
    }

    /// Save `payload` into `collection`, then publish it on `trigger` with
    /// the store-assigned sequence merged in under `"seq"` (the saved record
    /// wins on key conflict).
    ///
    /// # Errors
    ///
    /// Store save failures. Publish itself cannot fail.
    pub async fn publish_with_persistence(
        &self,
        trigger: &str,
        payload: EventPayload,
        collection: &str,
    ) -> anyhow::Result<PersistedPublish> {
        let record = self.store.save(collection, payload.clone()).await?;

        let merged = match payload {
            Value::Object(mut fields) => {
                fields.insert("seq".to_string(), Value::String(record.seq.0.clone()));
                Value::Object(fields)
            }
            other => serde_json::json!({ "payload": other, "seq": record.seq.0 }),
        };

        let delivered = self.engine.publish(trigger, merged).await;
        debug!(trigger, collection, seq = %record.seq, delivered, "Event persisted and published");

        Ok(PersistedPublish { record, delivered })
    }
}

/// In-memory [`EventStore`] backed by per-collection vectors.
///
/// Sequences are zero-padded decimal strings from a counter owned by this
/// instance, so cursor comparison matches insertion order. Single-process
/// reference implementation; durable deployments bring their own store.
pub struct InMemoryEventStore {
    collections: RwLock<HashMap<String, Vec<StoredEvent>>>,
    next_seq: AtomicU64,
}

impl InMemoryEventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Number of events persisted in `collection`.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|collections| collections.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Whether `collection` holds no events.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Shallow match: every key in `query` must equal the payload's field.
    fn matches(payload: &EventPayload, query: &Value) -> bool {
        let Some(wanted) = query.as_object() else {
            return true;
        };
        wanted.iter().all(|(key, value)| payload.get(key) == Some(value))
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn fetch_batch(
        &self,
        collection: &str,
        from: &Cursor,
        batch_size: usize,
        query: Option<&Value>,
    ) -> anyhow::Result<Vec<StoredEvent>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;

        Ok(collections
            .get(collection)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| event.seq > *from)
                    .filter(|event| query.map_or(true, |q| Self::matches(&event.payload, q)))
                    .take(batch_size)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn save(&self, collection: &str, item: EventPayload) -> anyhow::Result<StoredEvent> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let record = StoredEvent {
            // Zero-padded so lexicographic cursor order is numeric order.
            seq: Cursor::new(format!("{seq:020}")),
            payload: item,
        };

        let mut collections = self
            .collections
            .write()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());

        Ok(record)
    }
}
