//! # Durable Replay
//!
//! Splices persisted history in front of a live stream. While the store has
//! events past the cursor they are handed out first, in cursor order; once a
//! fetch comes back empty the splice latches onto the live source for good.
//!
//! ## Precondition
//!
//! Gap-free, duplicate-free handover requires that the store's sequence
//! field and the live channel share one ordering domain, and that the live
//! subscription exists no later than the moment history draining begins.
//! The splice cannot observe the store's ordering domain, so this is a
//! contract on the caller, not something enforced here.

use crate::engine::EventPayload;
use crate::error::PubSubError;
use crate::source::EventSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Default page size for history fetches.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Opaque position marker into a durable log.
///
/// Ordering is whatever the issuing store's sequence field encodes; cursors
/// from different stores (or hand-built ones) are not comparable.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cursor(pub String);

impl Cursor {
    /// Wrap a store-issued sequence value.
    #[must_use]
    pub fn new(seq: impl Into<String>) -> Self {
        Self(seq.into())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cursor {
    fn from(seq: &str) -> Self {
        Self(seq.to_string())
    }
}

/// One persisted event: a sequence cursor plus the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Position of this event in the store's ordering domain.
    pub seq: Cursor,
    /// The persisted payload.
    pub payload: EventPayload,
}

/// Query contract of a durable event log.
///
/// Only the read/write boundary is specified here; storage engines are
/// external. Implementations must return batches in ascending sequence
/// order, strictly after `from`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Fetch up to `batch_size` events from `collection` with sequence
    /// strictly greater than `from`, in ascending order.
    ///
    /// `query` optionally narrows the result set; stores that do not index
    /// payloads may apply it as a post-filter.
    async fn fetch_batch(
        &self,
        collection: &str,
        from: &Cursor,
        batch_size: usize,
        query: Option<&Value>,
    ) -> anyhow::Result<Vec<StoredEvent>>;

    /// Persist `item` into `collection`, assigning it the next sequence.
    async fn save(&self, collection: &str, item: EventPayload) -> anyhow::Result<StoredEvent>;
}

/// Where and how to start draining history.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Store collection holding the history.
    pub collection: String,

    /// Replay starts strictly after this cursor.
    pub last_sequence: Cursor,

    /// Page size per fetch, [`DEFAULT_BATCH_SIZE`] unless overridden.
    pub batch_size: usize,
}

impl ReplayOptions {
    /// Options for `collection` starting after `last_sequence`.
    #[must_use]
    pub fn new(collection: impl Into<String>, last_sequence: Cursor) -> Self {
        Self {
            collection: collection.into(),
            last_sequence,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the fetch page size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// An [`EventSource`] that yields persisted history, then the live source.
///
/// Pages are fetched lazily, one at a time, and the cursor advances as each
/// item is consumed. The first empty fetch flips a one-way latch; from then
/// on every pull delegates to the live source, including after errors.
pub struct ReplayStream<S> {
    store: Arc<dyn EventStore>,
    collection: String,
    batch_size: usize,
    cursor: Cursor,

    /// Remainder of the current page.
    page: VecDeque<StoredEvent>,

    /// One-way latch: true until a fetch returns an empty page.
    has_history: bool,

    live: S,
}

impl<S: EventSource> ReplayStream<S> {
    /// Splice `store` history (per `options`) in front of `live`.
    pub fn new(store: Arc<dyn EventStore>, options: ReplayOptions, live: S) -> Self {
        Self {
            store,
            collection: options.collection,
            batch_size: options.batch_size,
            cursor: options.last_sequence,
            page: VecDeque::new(),
            has_history: true,
            live,
        }
    }

    /// Position of the most recently consumed historical event (the starting
    /// cursor until the first item is handed out).
    #[must_use]
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }
}

#[async_trait]
impl<S: EventSource> EventSource for ReplayStream<S> {
    async fn next(&mut self) -> Result<Option<EventPayload>, PubSubError> {
        while self.has_history {
            if let Some(StoredEvent { seq, payload }) = self.page.pop_front() {
                self.cursor = seq;
                return Ok(Some(payload));
            }

            let page = self
                .store
                .fetch_batch(&self.collection, &self.cursor, self.batch_size, None)
                .await
                .map_err(PubSubError::StoreFetch)?;

            if page.is_empty() {
                self.has_history = false;
                debug!(
                    collection = %self.collection,
                    cursor = %self.cursor,
                    "History drained, switching to live stream"
                );
                break;
            }
            self.page = page.into();
        }

        self.live.next().await
    }

    async fn cancel(&mut self) {
        self.live.cancel().await;
    }
}
