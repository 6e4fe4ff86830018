//! # Pipeline Integration
//!
//! Drives the full delivery chain — publisher → bus → trigger stream →
//! replay splice → filter — the way a streaming consumer would, checking
//! ordering, buffering symmetry, lazy registration, and teardown across
//! component boundaries.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    use pulse_pubsub::{
        Cursor, EventPayload, EventSource, FilteredStream, InMemoryEventStore, InMemoryPubSub,
        PersistentPubSub, PubSubEngine, ReplayOptions, SyncFilter, TriggerFilter, TriggerStream,
    };
    use serde_json::json;

    fn bus_fixture() -> (Arc<InMemoryPubSub>, Arc<dyn PubSubEngine>) {
        let bus = Arc::new(InMemoryPubSub::new());
        let engine: Arc<dyn PubSubEngine> = bus.clone();
        (bus, engine)
    }

    fn is_even_field() -> Arc<dyn TriggerFilter> {
        Arc::new(SyncFilter::new(|payload: &EventPayload| {
            payload["n"].as_i64().is_some_and(|n| n % 2 == 0)
        }))
    }

    // =========================================================================
    // BUFFERING SYMMETRY
    // =========================================================================

    /// The i-th non-terminal pull equals the i-th publish, whether the
    /// publishes or the pulls arrive first.
    #[tokio::test]
    async fn test_buffering_symmetry_publishes_first() {
        let (bus, engine) = bus_fixture();
        let mut stream = TriggerStream::single(engine, "metrics");
        stream.ensure_subscribed();

        for n in 1..=4 {
            bus.publish("metrics", json!(n)).await;
        }
        for n in 1..=4 {
            assert_eq!(stream.recv().await, Some(json!(n)));
        }
    }

    #[tokio::test]
    async fn test_buffering_symmetry_pulls_first() {
        let (bus, engine) = bus_fixture();
        let mut stream = TriggerStream::single(engine, "metrics");
        stream.ensure_subscribed();

        let puller = tokio::spawn(async move {
            let mut values = Vec::new();
            for _ in 0..4 {
                values.push(stream.recv().await);
            }
            values
        });

        // Give the puller a chance to park on its first pull.
        tokio::time::sleep(Duration::from_millis(10)).await;
        for n in 1..=4 {
            bus.publish("metrics", json!(n)).await;
        }

        let values = timeout(Duration::from_millis(200), puller)
            .await
            .expect("timeout")
            .expect("join");
        assert_eq!(values, vec![Some(json!(1)), Some(json!(2)), Some(json!(3)), Some(json!(4))]);
    }

    // =========================================================================
    // LAZINESS & TEARDOWN ACROSS THE CHAIN
    // =========================================================================

    #[tokio::test]
    async fn test_filtered_stream_is_still_lazy() {
        let (bus, engine) = bus_fixture();

        let stream = TriggerStream::single(engine, "metrics");
        let _filtered = FilteredStream::new(stream, is_even_field());

        // Wrapping adds no engine registration of its own.
        assert_eq!(bus.listener_count("metrics"), 0);
    }

    #[tokio::test]
    async fn test_cancel_through_filter_reaches_engine() {
        let (bus, engine) = bus_fixture();

        let mut stream = TriggerStream::single(engine, "metrics");
        stream.ensure_subscribed();
        let mut filtered = FilteredStream::new(stream, is_even_field());

        filtered.cancel().await;

        assert_eq!(bus.listener_count("metrics"), 0);
        assert_eq!(filtered.next().await.unwrap(), None);
    }

    // =========================================================================
    // HISTORY → FILTER → LIVE
    // =========================================================================

    #[tokio::test]
    async fn test_history_then_live_through_filter() {
        let bus = Arc::new(InMemoryPubSub::new());
        let store = Arc::new(InMemoryEventStore::new());
        let pubsub = PersistentPubSub::new(bus.clone(), store.clone());

        // Six persisted events, before any live consumer exists.
        for n in 1..=6 {
            pubsub
                .publish_with_persistence("metrics", json!({"n": n}), "metrics-log")
                .await
                .unwrap();
        }

        let replay = pubsub.replay_stream(
            vec!["metrics".into()],
            ReplayOptions::new("metrics-log", Cursor::default()).with_batch_size(2),
        );
        let mut filtered = FilteredStream::new(replay, is_even_field());

        // History drains in order, odd events skipped inside the splice.
        for n in [2, 4, 6] {
            let event = filtered.next().await.unwrap().unwrap();
            assert_eq!(event["n"], json!(n));
        }

        // Live events keep flowing through the same filter.
        pubsub.publish("metrics", json!({"n": 7})).await;
        pubsub.publish("metrics", json!({"n": 8})).await;

        let event = filtered.next().await.unwrap().unwrap();
        assert_eq!(event["n"], json!(8));

        filtered.cancel().await;
        assert_eq!(bus.listener_count("metrics"), 0);
    }

    #[tokio::test]
    async fn test_empty_history_goes_straight_to_live() {
        let bus = Arc::new(InMemoryPubSub::new());
        let store = Arc::new(InMemoryEventStore::new());
        let pubsub = PersistentPubSub::new(bus.clone(), store);

        let mut replay = pubsub.replay_stream(
            vec!["metrics".into()],
            ReplayOptions::new("metrics-log", Cursor::default()),
        );

        pubsub.publish("metrics", json!("live")).await;

        let event = timeout(Duration::from_millis(200), replay.next())
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(event, Some(json!("live")));
    }

    // =========================================================================
    // MULTI-CONSUMER FAN-OUT
    // =========================================================================

    #[tokio::test]
    async fn test_two_streams_both_receive() {
        let (bus, engine) = bus_fixture();

        let mut first = TriggerStream::single(engine.clone(), "metrics");
        let mut second = TriggerStream::single(engine, "metrics");
        first.ensure_subscribed();
        second.ensure_subscribed();

        let delivered = bus.publish("metrics", json!("fan-out")).await;
        assert_eq!(delivered, 2);

        assert_eq!(first.recv().await, Some(json!("fan-out")));
        assert_eq!(second.recv().await, Some(json!("fan-out")));

        // Cancelling one leaves the other live.
        first.cancel().await;
        let delivered = bus.publish("metrics", json!("solo")).await;
        assert_eq!(delivered, 1);
        assert_eq!(second.recv().await, Some(json!("solo")));
    }
}
