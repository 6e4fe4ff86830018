//! # Subscription Manager
//!
//! Owns the mapping from external subscription ids to live per-trigger
//! machinery. Subscribing resolves the trigger map, registers every trigger
//! eagerly (all-or-nothing: the id is handed out only once every
//! registration exists), and spawns one driver task per trigger that pulls
//! filter-passed events and feeds the executor. Unsubscribing removes the
//! mapping first, then tears every stream down, so duplicate unsubscribes
//! fail loudly instead of double-releasing.

use crate::config::{
    EventCallback, ExternalSubscriptionId, SetupFn, SubscriptionRequest, TriggerConfig, TriggerMap,
};
use crate::error::SubscriptionError;
use crate::executor::{EventExecutor, ExecutionScope};
use pulse_pubsub::{
    EventSource, FilteredStream, PassAllFilter, PubSubEngine, SubscriptionId, TriggerStream,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Live state held per external subscription.
struct ActiveSubscription {
    /// Engine handles owned by this subscription, one per trigger.
    handles: Vec<SubscriptionId>,

    /// Broadcast stop signal for the driver tasks.
    shutdown: watch::Sender<bool>,

    /// One driver per trigger.
    tasks: Vec<JoinHandle<()>>,
}

/// Binds external subscription ids to sets of filtered trigger streams.
pub struct SubscriptionManager {
    engine: Arc<dyn PubSubEngine>,
    executor: Arc<dyn EventExecutor>,
    setup_functions: HashMap<String, SetupFn>,
    subscriptions: RwLock<HashMap<ExternalSubscriptionId, ActiveSubscription>>,
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Manager over `engine` with `executor` and no setup functions: every
    /// subscription listens on the single trigger matching its name.
    pub fn new(engine: Arc<dyn PubSubEngine>, executor: Arc<dyn EventExecutor>) -> Self {
        Self::with_setup_functions(engine, executor, HashMap::new())
    }

    /// Manager with named setup functions resolving trigger maps.
    pub fn with_setup_functions(
        engine: Arc<dyn PubSubEngine>,
        executor: Arc<dyn EventExecutor>,
        setup_functions: HashMap<String, SetupFn>,
    ) -> Self {
        Self {
            engine,
            executor,
            setup_functions,
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a setup function for `name`, replacing any previous one.
    pub fn register_setup(&mut self, name: impl Into<String>, setup: SetupFn) {
        self.setup_functions.insert(name.into(), setup);
    }

    /// Publish passthrough to the underlying engine.
    pub async fn publish(&self, trigger: &str, payload: serde_json::Value) -> usize {
        self.engine.publish(trigger, payload).await
    }

    /// Number of currently active external subscriptions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Engine handles owned by `id`, if it is active.
    #[must_use]
    pub fn internal_handles(&self, id: ExternalSubscriptionId) -> Option<Vec<SubscriptionId>> {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|active| active.handles.clone())
    }

    /// Create a subscription for `request`.
    ///
    /// The returned id is inserted only after every per-trigger registration
    /// has completed, so a caller holding the id always holds the full set.
    ///
    /// # Errors
    ///
    /// Currently infallible in the in-memory engine; the `Result` is part of
    /// the contract for engines whose registration can fail.
    pub async fn subscribe(
        &self,
        request: SubscriptionRequest,
    ) -> Result<ExternalSubscriptionId, SubscriptionError> {
        let trigger_map = self.resolve_triggers(&request);

        let scope = ExecutionScope {
            subscription: request.name.clone(),
            variables: request.variables.clone(),
            context: request.context.clone(),
        };

        let (shutdown, _) = watch::channel(false);
        let mut handles = Vec::with_capacity(trigger_map.len());
        let mut tasks = Vec::with_capacity(trigger_map.len());

        for (trigger, config) in trigger_map {
            let mut stream = TriggerStream::with_options(
                self.engine.clone(),
                vec![trigger.clone()],
                config.channel_options,
            );
            stream.ensure_subscribed();
            handles.extend_from_slice(stream.subscription_ids());

            let filter = config
                .filter
                .unwrap_or_else(|| Arc::new(PassAllFilter));
            let filtered =
                FilteredStream::new(stream, filter).with_context(request.context.clone());

            tasks.push(self.spawn_driver(
                trigger,
                filtered,
                scope.clone(),
                request.callback.clone(),
                shutdown.subscribe(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                ActiveSubscription {
                    handles,
                    shutdown,
                    tasks,
                },
            );

        debug!(id, name = %request.name, "External subscription created");
        Ok(id)
    }

    /// Destroy the subscription registered under `id`.
    ///
    /// The mapping is removed before any teardown, so a concurrent duplicate
    /// call reliably fails. Returns once every driver task has cancelled its
    /// stream and released its engine handles.
    ///
    /// # Errors
    ///
    /// `SubscriptionError::UnknownSubscription` if `id` is not active
    /// (including a second unsubscribe of the same id).
    pub async fn unsubscribe(&self, id: ExternalSubscriptionId) -> Result<(), SubscriptionError> {
        let active = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or(SubscriptionError::UnknownSubscription(id))?;

        // Tasks cancel their streams on this signal, which deregisters the
        // engine handles.
        let _ = active.shutdown.send(true);
        for task in active.tasks {
            if let Err(error) = task.await {
                warn!(id, %error, "Driver task failed during teardown");
            }
        }

        debug!(id, "External subscription released");
        Ok(())
    }

    /// Resolve the trigger map for a request: its setup function, or the
    /// single trigger of the same name with defaults.
    fn resolve_triggers(&self, request: &SubscriptionRequest) -> TriggerMap {
        match self.setup_functions.get(&request.name) {
            Some(setup) => setup(request),
            None => HashMap::from([(request.name.clone(), TriggerConfig::default())]),
        }
    }

    /// Spawn the pull loop for one trigger.
    fn spawn_driver(
        &self,
        trigger: String,
        mut filtered: FilteredStream<TriggerStream>,
        scope: ExecutionScope,
        callback: EventCallback,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let executor = self.executor.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    // A closed sender counts as shutdown too.
                    _ = shutdown.changed() => {
                        filtered.cancel().await;
                        debug!(trigger = %trigger, "Driver stopped");
                        break;
                    }
                    pulled = filtered.next() => match pulled {
                        Ok(Some(payload)) => {
                            let outcome = executor
                                .execute(payload, &scope)
                                .await
                                .map_err(SubscriptionError::Execution);
                            callback(outcome);
                        }
                        Ok(None) => break,
                        Err(error) => {
                            callback(Err(error.into()));
                            break;
                        }
                    }
                }
            }
        })
    }
}
