//! # Integration Test Flows
//!
//! The login and cart-total flows, plus bus and store used together the way
//! a screen would: shared state acquired from the store, changes announced on
//! the bus, everything released when the screen's scope is destroyed.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use lifeline_runtime::scenarios::{cart, login};
    use lifeline_runtime::{AppContainer, RuntimeConfig};
    use shared_bus::{BusConfig, BusError, EventBus, TopicMode};
    use shared_store::ScopedStore;
    use shared_types::{LifecycleScope, ScopeRef};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn scope(kind: &str) -> (Arc<LifecycleScope>, ScopeRef) {
        let scope = LifecycleScope::shared(kind);
        let scope_ref: ScopeRef = scope.clone();
        (scope, scope_ref)
    }

    fn sink<T: Clone + Send + Sync + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync + 'static) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::clone(&log);
        (log, move |value: &T| writer.lock().push(value.clone()))
    }

    // =============================================================================
    // LOGIN: NON-STICKY, NO REPLAY
    // =============================================================================

    #[test]
    fn test_login_subscriber_receives_bob_once() {
        let bus = EventBus::new();
        let (_a, a) = scope("profile");
        let (received, callback) = sink::<String>();

        bus.subscribe("login", TopicMode::NonSticky, Some(&a), callback)
            .unwrap();
        assert!(received.lock().is_empty());

        let report = bus
            .publish("login", TopicMode::NonSticky, "bob".to_string())
            .unwrap();

        assert_eq!(*received.lock(), vec!["bob".to_string()]);
        assert_eq!(report.delivered, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn test_login_earlier_value_never_replayed() {
        let bus = EventBus::new();
        bus.publish("login", TopicMode::NonSticky, "alice".to_string())
            .unwrap();

        let (received, callback) = sink::<String>();
        bus.subscribe("login", TopicMode::NonSticky, None, callback)
            .unwrap();
        bus.publish("login", TopicMode::NonSticky, "bob".to_string())
            .unwrap();

        assert_eq!(*received.lock(), vec!["bob".to_string()]);
    }

    #[test]
    fn test_login_scenario_through_runtime() {
        let app = AppContainer::default();
        let outcome = login::run(&app).unwrap();

        assert_eq!(outcome.received, vec!["bob".to_string()]);
        assert_eq!(outcome.subscribers_after_finish, 0);
        assert_eq!(app.metrics().deliveries, 1);
    }

    // =============================================================================
    // CART-TOTAL: STICKY REPLAY
    // =============================================================================

    #[test]
    fn test_cart_total_replays_latest_during_subscribe() {
        let bus = EventBus::new();
        bus.publish("cart-total", TopicMode::Sticky, 3u32).unwrap();
        bus.publish("cart-total", TopicMode::Sticky, 5u32).unwrap();

        let (received, callback) = sink::<u32>();
        bus.subscribe("cart-total", TopicMode::Sticky, None, callback)
            .unwrap();

        // Delivered before subscribe returned, and only the latest value
        assert_eq!(*received.lock(), vec![5]);
        assert_eq!(bus.latest::<u32>("cart-total", TopicMode::Sticky), Ok(Some(5)));
    }

    #[test]
    fn test_cart_scenario_through_runtime() {
        let app = AppContainer::default();
        let outcome = cart::run(&app).unwrap();

        assert_eq!(outcome.replayed_on_subscribe, vec![5]);
        assert!(outcome.shared_instance);
        assert!(outcome.evicted);
        assert!(app.store.is_empty());
        assert_eq!(app.metrics().entries_created, 1);
        assert_eq!(app.metrics().entries_evicted, 1);
    }

    #[test]
    fn test_both_scenarios_share_one_container() {
        let app = AppContainer::default();
        login::run(&app).unwrap();
        cart::run(&app).unwrap();

        assert_eq!(app.bus.topic_count(), 2);
        assert!(app.stack.is_empty());
        assert_eq!(app.metrics().publishes, 5);
    }

    // =============================================================================
    // BUS + STORE TOGETHER
    // =============================================================================

    #[derive(Default)]
    struct Cart {
        total: Mutex<u32>,
    }

    #[test]
    fn test_callback_updates_shared_store_container() {
        let bus = EventBus::new();
        let store = ScopedStore::new();
        let (list_scope, list) = scope("list");
        let (_detail_scope, detail) = scope("detail");

        let cart = store.acquire_shared("cart", &list, Cart::default).unwrap();
        let from_callback = store.clone();
        let detail_in_callback = detail.clone();
        bus.subscribe(
            "price-added",
            TopicMode::NonSticky,
            Some(&detail),
            move |price: &u32| {
                let cart = from_callback
                    .acquire_shared("cart", &detail_in_callback, Cart::default)
                    .unwrap();
                *cart.total.lock() += *price;
            },
        )
        .unwrap();

        bus.publish("price-added", TopicMode::NonSticky, 3u32).unwrap();
        bus.publish("price-added", TopicMode::NonSticky, 2u32).unwrap();

        assert_eq!(*cart.total.lock(), 5);
        assert_eq!(store.owner_count("cart"), 2);

        list_scope.destroy();
        assert!(store.contains("cart"));
    }

    #[test]
    fn test_callback_republishes_total_on_sticky_topic() {
        let bus = EventBus::new();
        let relay = bus.clone();
        bus.subscribe("item-price", TopicMode::NonSticky, None, move |price: &u32| {
            let total = relay
                .latest::<u32>("cart-total", TopicMode::Sticky)
                .unwrap()
                .unwrap_or(0);
            relay
                .publish("cart-total", TopicMode::Sticky, total + price)
                .unwrap();
        })
        .unwrap();

        bus.publish("item-price", TopicMode::NonSticky, 3u32).unwrap();
        bus.publish("item-price", TopicMode::NonSticky, 2u32).unwrap();

        let (received, callback) = sink::<u32>();
        bus.subscribe("cart-total", TopicMode::Sticky, None, callback)
            .unwrap();
        assert_eq!(*received.lock(), vec![5]);
        assert_eq!(bus.version("cart-total", TopicMode::Sticky), Some(1));
    }

    #[test]
    fn test_store_partial_ownership_then_eviction() {
        let store = ScopedStore::new();
        let (a_scope, a) = scope("a");
        let (b_scope, b) = scope("b");
        let (c_scope, c) = scope("c");

        let first = store.acquire_shared("cart", &a, Cart::default).unwrap();
        store.acquire_shared("cart", &b, Cart::default).unwrap();
        a_scope.destroy();

        let while_b_lives = store.acquire_shared("cart", &c, Cart::default).unwrap();
        assert!(Arc::ptr_eq(&first, &while_b_lives));

        b_scope.destroy();
        c_scope.destroy();
        assert!(!store.contains("cart"));

        let (_d_scope, d) = scope("d");
        let fresh = store.acquire_shared("cart", &d, Cart::default).unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
    }

    // =============================================================================
    // TOPIC MODES
    // =============================================================================

    #[test]
    fn test_mode_conflict_surfaces_to_caller() {
        let app = AppContainer::default();
        app.bus.publish("login", TopicMode::NonSticky, 1u8).unwrap();

        let err = app
            .bus
            .subscribe("login", TopicMode::Sticky, None, |_: &u8| {})
            .unwrap_err();
        assert!(matches!(
            err,
            BusError::TopicModeConflict {
                existing: TopicMode::NonSticky,
                requested: TopicMode::Sticky,
                ..
            }
        ));
    }

    #[test]
    fn test_isolated_modes_keep_namespaces_apart() {
        let config = RuntimeConfig {
            bus: BusConfig::default().with_isolated_modes(true),
            ..RuntimeConfig::default()
        };
        let app = AppContainer::new(config);

        app.bus.publish("login", TopicMode::Sticky, "sticky".to_string()).unwrap();
        let (received, callback) = sink::<String>();
        app.bus
            .subscribe("login", TopicMode::NonSticky, None, callback)
            .unwrap();

        assert!(received.lock().is_empty());
        assert_eq!(app.bus.topic_count(), 2);
    }

    #[test]
    fn test_payload_mismatch_is_isolated() {
        let bus = EventBus::new();
        let (good, good_cb) = sink::<u32>();
        bus.subscribe("cart-total", TopicMode::NonSticky, None, |_: &String| {})
            .unwrap();
        bus.subscribe("cart-total", TopicMode::NonSticky, None, good_cb)
            .unwrap();

        let report = bus.publish("cart-total", TopicMode::NonSticky, 7u32).unwrap();

        assert_eq!(*good.lock(), vec![7]);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            BusError::PayloadTypeMismatch { .. }
        ));
    }
}
