//! # Execution Boundary
//!
//! The decode/execute contract between the subscription layer and the
//! external query engine. The manager calls it once per delivered,
//! filter-passed event; what "execute" means (query evaluation, decoding,
//! projection) is entirely the collaborator's business.

use async_trait::async_trait;
use pulse_pubsub::EventPayload;
use serde_json::Value;
use std::collections::HashMap;

/// Execution parameters resolved at subscribe time, passed to the executor
/// with every event.
#[derive(Debug, Clone)]
pub struct ExecutionScope {
    /// The subscription name the event was delivered for.
    pub subscription: String,

    /// Variables from the originating request.
    pub variables: HashMap<String, Value>,

    /// The request's opaque context value.
    pub context: Value,
}

/// External engine that turns a raw payload into a structured result.
#[async_trait]
pub trait EventExecutor: Send + Sync {
    /// Evaluate one event.
    ///
    /// # Errors
    ///
    /// Per-event failures (e.g., a payload with a mismatched shape). They
    /// are reported through the subscription callback and do not terminate
    /// the subscription.
    async fn execute(&self, payload: EventPayload, scope: &ExecutionScope)
        -> anyhow::Result<Value>;
}
