//! # Manager Flow Integration
//!
//! Exercises the subscription lifecycle manager end to end over the live
//! bus: setup-function trigger resolution, per-trigger filters, executor
//! outcomes through the callback, and all-or-nothing teardown.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use async_trait::async_trait;
    use pulse_pubsub::{
        EventPayload, InMemoryPubSub, PubSubEngine, SyncFilter,
    };
    use pulse_subscriptions::{
        EventCallback, EventExecutor, ExecutionScope, SetupFn, SubscriptionError,
        SubscriptionManager, SubscriptionRequest, TriggerConfig,
    };
    use serde_json::{json, Value};

    /// Executor that wraps the payload under `"data"`.
    struct EchoExecutor;

    #[async_trait]
    impl EventExecutor for EchoExecutor {
        async fn execute(
            &self,
            payload: EventPayload,
            _scope: &ExecutionScope,
        ) -> anyhow::Result<Value> {
            Ok(json!({ "data": payload }))
        }
    }

    fn callback_channel() -> (
        EventCallback,
        mpsc::UnboundedReceiver<Result<Value, SubscriptionError>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: EventCallback = Arc::new(move |outcome| {
            let _ = tx.send(outcome);
        });
        (callback, rx)
    }

    async fn recv_data(
        rx: &mut mpsc::UnboundedReceiver<Result<Value, SubscriptionError>>,
    ) -> Value {
        timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timeout")
            .expect("callback")
            .expect("execution result")
    }

    /// Price alerts: one subscription name fanning out to two triggers with
    /// different filters, the way a real consumer wires a watchlist.
    fn watchlist_setup() -> HashMap<String, SetupFn> {
        let mut setup_functions: HashMap<String, SetupFn> = HashMap::new();
        setup_functions.insert(
            "watchlist".to_string(),
            Box::new(|request| {
                let threshold = request.variables.get("min").and_then(Value::as_i64).unwrap_or(0);
                let above_threshold = Arc::new(SyncFilter::new(move |payload: &EventPayload| {
                    payload["price"].as_i64().is_some_and(|p| p >= threshold)
                }));
                HashMap::from([
                    ("trades".to_string(), TriggerConfig::filtered(above_threshold)),
                    ("alerts".to_string(), TriggerConfig::default()),
                ])
            }),
        );
        setup_functions
    }

    #[tokio::test]
    async fn test_watchlist_flow() {
        let bus = Arc::new(InMemoryPubSub::new());
        let engine: Arc<dyn PubSubEngine> = bus.clone();
        let manager = SubscriptionManager::with_setup_functions(
            engine,
            Arc::new(EchoExecutor),
            watchlist_setup(),
        );

        let (callback, mut rx) = callback_channel();
        let request = SubscriptionRequest::new("watchlist", callback)
            .with_variables(HashMap::from([("min".to_string(), json!(100))]));
        let id = manager.subscribe(request).await.unwrap();

        // Two triggers registered under one external id.
        assert_eq!(bus.subscription_count(), 2);
        assert_eq!(manager.internal_handles(id).unwrap().len(), 2);

        // Below threshold: filtered out on the trades trigger.
        bus.publish("trades", json!({"price": 50})).await;
        // Above threshold: delivered.
        bus.publish("trades", json!({"price": 150})).await;
        // Alerts are unfiltered.
        bus.publish("alerts", json!({"kind": "halt"})).await;

        let first = recv_data(&mut rx).await;
        assert_eq!(first["data"]["price"], json!(150));
        let second = recv_data(&mut rx).await;
        assert_eq!(second["data"]["kind"], json!("halt"));

        manager.unsubscribe(id).await.unwrap();
        assert_eq!(bus.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_independent_subscriptions_do_not_interfere() {
        let bus = Arc::new(InMemoryPubSub::new());
        let engine: Arc<dyn PubSubEngine> = bus.clone();
        let manager = SubscriptionManager::new(engine, Arc::new(EchoExecutor));

        let (callback_a, mut rx_a) = callback_channel();
        let (callback_b, mut rx_b) = callback_channel();

        let id_a = manager
            .subscribe(SubscriptionRequest::new("ticker", callback_a))
            .await
            .unwrap();
        let _id_b = manager
            .subscribe(SubscriptionRequest::new("ticker", callback_b))
            .await
            .unwrap();

        bus.publish("ticker", json!(1)).await;
        assert_eq!(recv_data(&mut rx_a).await["data"], json!(1));
        assert_eq!(recv_data(&mut rx_b).await["data"], json!(1));

        // Tearing one down leaves the other delivering.
        manager.unsubscribe(id_a).await.unwrap();
        bus.publish("ticker", json!(2)).await;

        assert_eq!(recv_data(&mut rx_b).await["data"], json!(2));
        let gone = timeout(Duration::from_millis(50), rx_a.recv()).await;
        assert!(gone.is_err() || matches!(gone, Ok(None)));
    }

    #[tokio::test]
    async fn test_manager_publish_passthrough() {
        let bus = Arc::new(InMemoryPubSub::new());
        let engine: Arc<dyn PubSubEngine> = bus.clone();
        let manager = SubscriptionManager::new(engine, Arc::new(EchoExecutor));

        let (callback, mut rx) = callback_channel();
        manager
            .subscribe(SubscriptionRequest::new("ticker", callback))
            .await
            .unwrap();

        manager.publish("ticker", json!("through-manager")).await;
        assert_eq!(recv_data(&mut rx).await["data"], json!("through-manager"));
    }
}
