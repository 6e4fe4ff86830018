//! # PubSub Errors
//!
//! Error types shared by the engine and the stream adapters.

use crate::engine::SubscriptionId;
use thiserror::Error;

/// Errors from engine and stream operations.
#[derive(Debug, Error)]
pub enum PubSubError {
    /// Unsubscribe was called with a handle that is not currently
    /// registered (never issued, or already removed).
    #[error("unknown subscription id: {0}")]
    UnknownSubscription(SubscriptionId),

    /// A durable store fetch failed while draining replay history.
    ///
    /// Surfaced to the pending pull; the stream does not retry. Retry
    /// policy, if any, belongs to the caller.
    #[error("store fetch failed: {0}")]
    StoreFetch(anyhow::Error),
}
