use dynamic_router::{DynamicRouter, RawMessage, RouterConfig};
use integration_test_utils::InMemoryBroker;
use std::sync::Arc;

#[allow(dead_code)]
pub(crate) fn make_router(
    name: &str,
    broker: &InMemoryBroker,
    config: RouterConfig,
) -> DynamicRouter {
    DynamicRouter::new(
        name,
        config,
        Arc::new(broker.clone()),
        Arc::new(broker.clone()),
    )
    .expect("router creation should succeed")
}

#[allow(dead_code)]
pub(crate) async fn start_router(name: &str, broker: &InMemoryBroker) -> DynamicRouter {
    let router = make_router(name, broker, RouterConfig::default());
    router.start().await.expect("router should start");
    router
}

/// Delivers through the broker and waits until the dispatch worker has applied
/// the message.
#[allow(dead_code)]
pub(crate) async fn deliver_and_flush(
    broker: &InMemoryBroker,
    router: &DynamicRouter,
    channel: &str,
    message: RawMessage,
) {
    assert_eq!(
        broker.deliver(channel, message).await,
        1,
        "router should be subscribed to {channel}"
    );
    router.flush_dispatch().await;
}
