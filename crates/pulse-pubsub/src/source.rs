//! # Event Source Protocol
//!
//! The pull/cancel/fail iteration contract shared by [`crate::TriggerStream`],
//! [`crate::FilteredStream`], and [`crate::ReplayStream`]. Adapters compose by
//! wrapping any other `EventSource`.

use crate::engine::EventPayload;
use crate::error::PubSubError;
use async_trait::async_trait;

/// Pull side of the event pipeline.
#[async_trait]
pub trait EventSource: Send {
    /// Pull the next event.
    ///
    /// `Ok(Some(payload))` is the next item in order; `Ok(None)` is the
    /// terminal signal and every later pull must also resolve terminal.
    ///
    /// # Errors
    ///
    /// Adapter-specific failures (e.g., a replay store fetch). The live
    /// bridge itself never errors.
    async fn next(&mut self) -> Result<Option<EventPayload>, PubSubError>;

    /// Graceful stop. Idempotent: a second call is a no-op.
    ///
    /// Deregisters any listeners, discards buffered items, and makes every
    /// subsequent pull resolve terminal.
    async fn cancel(&mut self);

    /// Tear down like [`EventSource::cancel`], then surface `error` as the
    /// pull result so the caller can propagate it.
    async fn fail(&mut self, error: PubSubError) -> Result<Option<EventPayload>, PubSubError> {
        self.cancel().await;
        Err(error)
    }
}
