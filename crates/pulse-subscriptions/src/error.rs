//! # Subscription Errors

use crate::config::ExternalSubscriptionId;
use pulse_pubsub::PubSubError;
use thiserror::Error;

/// Errors from subscription lifecycle operations.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Unsubscribe was called with an external id that is not currently
    /// registered. A duplicate unsubscribe lands here rather than being
    /// silently ignored, so double-release bugs in callers stay visible.
    #[error("unknown subscription id: {0}")]
    UnknownSubscription(ExternalSubscriptionId),

    /// The external decode/execute engine failed on one event. Reported per
    /// event; the subscription keeps delivering.
    #[error("event execution failed: {0}")]
    Execution(anyhow::Error),

    /// Failure in the underlying pub/sub layer.
    #[error(transparent)]
    PubSub(#[from] PubSubError),
}
