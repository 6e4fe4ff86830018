//! # Pulse PubSub - Named-Channel Event Streaming
//!
//! A publish/subscribe engine paired with a push-to-pull adapter: publishers
//! fan events out to named triggers, and consumers pull them one at a time
//! through cancellable, ordered streams.
//!
//! ## Pipeline
//!
//! ```text
//! ┌───────────┐  publish()   ┌──────────────┐   sink    ┌───────────────┐
//! │ Publisher │ ───────────▶ │ PubSubEngine │ ────────▶ │ TriggerStream │
//! └───────────┘              └──────────────┘           └───────┬───────┘
//!                                                               │
//!                                   (optional) ┌────────────────▼─┐
//!                                              │   ReplayStream   │
//!                                              └────────────────┬─┘
//!                                              ┌────────────────▼─┐  next()
//!                                              │  FilteredStream  │ ───────▶ consumer
//!                                              └──────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Per-trigger publish order is preserved; a stream covering several
//!   triggers yields events in global arrival order.
//! - Streams register no listeners until the first pull and tear down
//!   idempotently on `cancel`.
//! - `ReplayStream` drains persisted history before handing over to the live
//!   stream, provided the store and the live channel share one ordering key.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bridge;
pub mod bus;
pub mod engine;
pub mod error;
pub mod filter;
pub mod persistent;
pub mod replay;
pub mod source;

// Re-export main types
pub use bridge::TriggerStream;
pub use bus::InMemoryPubSub;
pub use engine::{ChannelOptions, EventPayload, EventSink, PubSubEngine, SubscriptionId};
pub use error::PubSubError;
pub use filter::{FilteredStream, PassAllFilter, SyncFilter, TriggerFilter};
pub use persistent::{InMemoryEventStore, PersistedPublish, PersistentPubSub};
pub use replay::{Cursor, EventStore, ReplayOptions, ReplayStream, StoredEvent, DEFAULT_BATCH_SIZE};
pub use source::EventSource;
