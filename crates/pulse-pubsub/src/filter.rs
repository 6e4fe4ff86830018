//! # Filtered Streams
//!
//! Predicate-based filtering over any [`EventSource`]. A `FilteredStream`
//! implements the same pull protocol as the source it wraps, transparently
//! skipping events the predicate rejects.

use crate::engine::EventPayload;
use crate::error::PubSubError;
use crate::source::EventSource;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Predicate evaluated per event.
///
/// `context` is an opaque value the subscriber resolved at subscribe time
/// (`Null` when none was supplied). Returning `Err` means "skip": a flaky
/// predicate degrades to dropped messages, never to a broken pull chain.
#[async_trait]
pub trait TriggerFilter: Send + Sync {
    /// Decide whether `payload` passes.
    async fn check(&self, payload: &EventPayload, context: &Value) -> anyhow::Result<bool>;
}

/// Filter that passes every event. The default when no filter is configured.
pub struct PassAllFilter;

#[async_trait]
impl TriggerFilter for PassAllFilter {
    async fn check(&self, _payload: &EventPayload, _context: &Value) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Adapter lifting a plain closure into a [`TriggerFilter`].
pub struct SyncFilter<F>(F);

impl<F> SyncFilter<F>
where
    F: Fn(&EventPayload) -> bool + Send + Sync,
{
    /// Wrap `predicate`.
    pub fn new(predicate: F) -> Self {
        Self(predicate)
    }
}

#[async_trait]
impl<F> TriggerFilter for SyncFilter<F>
where
    F: Fn(&EventPayload) -> bool + Send + Sync,
{
    async fn check(&self, payload: &EventPayload, _context: &Value) -> anyhow::Result<bool> {
        Ok((self.0)(payload))
    }
}

/// An [`EventSource`] that yields only events its filter accepts.
///
/// Skipping runs as a flat loop with exactly one inner pull in flight, so a
/// long run of rejected events holds no per-skip state: memory stays bounded
/// no matter how many events are filtered out between deliveries.
pub struct FilteredStream<S> {
    inner: S,
    filter: Arc<dyn TriggerFilter>,
    context: Value,
}

impl<S: EventSource> FilteredStream<S> {
    /// Wrap `inner` with `filter` and a `Null` context.
    pub fn new(inner: S, filter: Arc<dyn TriggerFilter>) -> Self {
        Self {
            inner,
            filter,
            context: Value::Null,
        }
    }

    /// Attach the context handed to the predicate on every check.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

#[async_trait]
impl<S: EventSource> EventSource for FilteredStream<S> {
    async fn next(&mut self) -> Result<Option<EventPayload>, PubSubError> {
        loop {
            let Some(payload) = self.inner.next().await? else {
                return Ok(None);
            };
            match self.filter.check(&payload, &self.context).await {
                Ok(true) => return Ok(Some(payload)),
                Ok(false) => {}
                Err(error) => {
                    debug!(%error, "Filter predicate failed, skipping event");
                }
            }
        }
    }

    async fn cancel(&mut self) {
        self.inner.cancel().await;
    }
}
