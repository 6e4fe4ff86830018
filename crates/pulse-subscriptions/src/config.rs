//! # Subscription Configuration
//!
//! Typed request and per-trigger configuration structures. A subscriber
//! names a subscription, optionally passes variables and a context value,
//! and supplies the callback that receives every execution outcome. Setup
//! functions map the subscription name to the triggers it listens on.

use crate::error::SubscriptionError;
use pulse_pubsub::{ChannelOptions, TriggerFilter};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Consumer-facing identifier aggregating one or more trigger
/// registrations. Issued by [`crate::SubscriptionManager`], independent of
/// the engine's internal handles.
pub type ExternalSubscriptionId = u64;

/// Receives one `Ok` (execution result) or `Err` per delivered,
/// filter-passed event.
pub type EventCallback = Arc<dyn Fn(Result<Value, SubscriptionError>) + Send + Sync>;

/// Maps a subscription request to the triggers it should listen on.
///
/// When no setup function is registered for a name, the subscription
/// listens on the single trigger of that name with default configuration.
pub type SetupFn = Box<dyn Fn(&SubscriptionRequest) -> TriggerMap + Send + Sync>;

/// Per-subscription trigger set: trigger name to its configuration.
pub type TriggerMap = HashMap<String, TriggerConfig>;

/// Configuration for one trigger within a subscription.
#[derive(Default)]
pub struct TriggerConfig {
    /// Per-event predicate; `None` lets every event through.
    pub filter: Option<Arc<dyn TriggerFilter>>,

    /// Options forwarded to the engine registration. Default empty.
    pub channel_options: ChannelOptions,
}

impl TriggerConfig {
    /// Config with `filter` and default channel options.
    #[must_use]
    pub fn filtered(filter: Arc<dyn TriggerFilter>) -> Self {
        Self {
            filter: Some(filter),
            channel_options: ChannelOptions::default(),
        }
    }

    /// Set the channel options.
    #[must_use]
    pub fn with_channel_options(mut self, channel_options: ChannelOptions) -> Self {
        self.channel_options = channel_options;
        self
    }
}

/// One subscription request.
pub struct SubscriptionRequest {
    /// Subscription name, used to look up the setup function (and as the
    /// default trigger name when none is registered).
    pub name: String,

    /// Variables resolved for this subscription, available to setup
    /// functions and the executor.
    pub variables: HashMap<String, Value>,

    /// Opaque context handed to filters and the executor. Default `Null`.
    pub context: Value,

    /// Outcome sink for this subscription.
    pub callback: EventCallback,
}

impl SubscriptionRequest {
    /// Request for `name` with empty variables and `Null` context.
    pub fn new(name: impl Into<String>, callback: EventCallback) -> Self {
        Self {
            name: name.into(),
            variables: HashMap::new(),
            context: Value::Null,
            callback,
        }
    }

    /// Attach resolved variables.
    #[must_use]
    pub fn with_variables(mut self, variables: HashMap<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    /// Attach a context value.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}
