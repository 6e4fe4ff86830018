//! # Pulse Subscriptions - Lifecycle Management
//!
//! Binds one external subscription id to a set of trigger registrations on a
//! [`pulse_pubsub::PubSubEngine`]. Each trigger gets its own filter and
//! channel options; filter-passed events are handed to an external
//! [`EventExecutor`] and every outcome is reported through the
//! subscription's callback.
//!
//! ```text
//! subscribe(request)
//!     │  setup fn: name ──▶ { trigger ──▶ TriggerConfig }
//!     ▼
//! ┌─────────────────────────────────────────────────┐
//! │ external id ──▶ [ TriggerStream + FilteredStream│
//! │                   + driver task ]  per trigger  │
//! └─────────────────────────────────────────────────┘
//!     │ unsubscribe(id): remove mapping, then
//!     ▼ cancel every stream (all-or-nothing)
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod error;
pub mod executor;
pub mod manager;

// Re-export main types
pub use config::{
    EventCallback, ExternalSubscriptionId, SetupFn, SubscriptionRequest, TriggerConfig, TriggerMap,
};
pub use error::SubscriptionError;
pub use executor::{EventExecutor, ExecutionScope};
pub use manager::SubscriptionManager;
