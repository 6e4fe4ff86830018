//! # In-Memory PubSub Engine
//!
//! Reference [`PubSubEngine`] implementation backed by per-trigger sink
//! lists. Suitable for single-process operation; distributed deployments
//! would implement the trait over an external broker (e.g., Redis, NATS).

use crate::engine::{ChannelOptions, EventPayload, EventSink, PubSubEngine, SubscriptionId};
use crate::error::PubSubError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::{debug, warn};

/// One registered listener.
struct RegisteredSink {
    id: SubscriptionId,
    sink: EventSink,
}

/// Listener tables, guarded by one lock.
#[derive(Default)]
struct Registry {
    /// Sinks per trigger, in registration order.
    by_trigger: HashMap<String, Vec<RegisteredSink>>,

    /// Trigger name per handle, for unsubscribe lookup.
    trigger_by_id: HashMap<SubscriptionId, String>,
}

impl Registry {
    /// Remove the registration for `id`. Returns false if unknown.
    fn remove(&mut self, id: SubscriptionId) -> bool {
        let Some(trigger) = self.trigger_by_id.remove(&id) else {
            return false;
        };
        if let Some(sinks) = self.by_trigger.get_mut(&trigger) {
            sinks.retain(|entry| entry.id != id);
            if sinks.is_empty() {
                self.by_trigger.remove(&trigger);
            }
        }
        true
    }
}

/// In-memory implementation of the pub/sub engine.
///
/// Handles are issued from a counter owned by this instance, so independent
/// engines never share id space. Delivery is synchronous within `publish`:
/// each payload is forwarded to every sink registered at that instant, in
/// registration order.
pub struct InMemoryPubSub {
    /// Listener tables.
    registry: RwLock<Registry>,

    /// Next handle to issue.
    next_id: AtomicU64,

    /// Total events published (delivered or not).
    events_published: AtomicU64,
}

impl InMemoryPubSub {
    /// Create an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            next_id: AtomicU64::new(0),
            events_published: AtomicU64::new(0),
        }
    }

    /// Number of sinks currently registered on `trigger`.
    #[must_use]
    pub fn listener_count(&self, trigger: &str) -> usize {
        self.registry
            .read()
            .map(|registry| registry.by_trigger.get(trigger).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Number of live registrations across all triggers.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.registry
            .read()
            .map(|registry| registry.trigger_by_id.len())
            .unwrap_or(0)
    }

    /// Total events published on this engine.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    /// Drop registrations whose receiving side has gone away.
    fn prune(&self, dead: &[SubscriptionId]) {
        let Ok(mut registry) = self.registry.write() else {
            return;
        };
        for &id in dead {
            if registry.remove(id) {
                warn!(id, "Pruned subscription with closed sink");
            }
        }
    }
}

impl Default for InMemoryPubSub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PubSubEngine for InMemoryPubSub {
    async fn publish(&self, trigger: &str, payload: EventPayload) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        // Snapshot the sink list so delivery happens outside the lock.
        let sinks: Vec<(SubscriptionId, EventSink)> = match self.registry.read() {
            Ok(registry) => registry
                .by_trigger
                .get(trigger)
                .map(|entries| {
                    entries
                        .iter()
                        .map(|entry| (entry.id, entry.sink.clone()))
                        .collect()
                })
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        if sinks.is_empty() {
            debug!(trigger, "Event published with no listeners");
            return 0;
        }

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, sink) in sinks {
            if sink.send(payload.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            self.prune(&dead);
        }

        debug!(trigger, delivered, "Event published");
        delivered
    }

    fn subscribe(
        &self,
        trigger: &str,
        sink: EventSink,
        _options: &ChannelOptions,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        if let Ok(mut registry) = self.registry.write() {
            registry
                .by_trigger
                .entry(trigger.to_string())
                .or_default()
                .push(RegisteredSink { id, sink });
            registry.trigger_by_id.insert(id, trigger.to_string());
        }

        debug!(trigger, id, "New subscription registered");
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), PubSubError> {
        let removed = self
            .registry
            .write()
            .map(|mut registry| registry.remove(id))
            .unwrap_or(false);

        if removed {
            debug!(id, "Subscription removed");
            Ok(())
        } else {
            Err(PubSubError::UnknownSubscription(id))
        }
    }
}
