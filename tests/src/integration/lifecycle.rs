//! # Scope Lifecycle Tests
//!
//! Scope destruction as the single cancellation path: subscriptions and
//! store ownership disappear together, whether a scope is destroyed
//! directly, finished through the stack, or torn down mid-dispatch.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use parking_lot::Mutex;

    use lifeline_runtime::AppContainer;
    use shared_bus::{EventBus, TopicMode};
    use shared_store::ScopedStore;
    use shared_types::{LifecycleScope, Scope, ScopeRef};

    fn as_ref(scope: &Arc<LifecycleScope>) -> ScopeRef {
        scope.clone()
    }

    #[test]
    fn test_destroy_releases_subscriptions_and_ownership_together() {
        let app = AppContainer::default();
        let screen = app.open_scope("detail");
        let screen_ref = as_ref(&screen);

        app.store
            .acquire_shared("draft", &screen_ref, String::new)
            .unwrap();
        app.bus
            .subscribe("login", TopicMode::NonSticky, Some(&screen_ref), |_: &String| {})
            .unwrap();
        app.bus
            .subscribe("cart-total", TopicMode::Sticky, Some(&screen_ref), |_: &u32| {})
            .unwrap();

        screen.destroy();

        assert!(!app.store.contains("draft"));
        assert_eq!(app.bus.subscriber_count("login", TopicMode::NonSticky), 0);
        assert_eq!(app.bus.subscriber_count("cart-total", TopicMode::Sticky), 0);
        assert!(app.stack.is_empty());
        assert_eq!(screen.pending_listeners(), 0);
    }

    #[test]
    fn test_finish_except_evicts_only_finished_owners() {
        let app = AppContainer::default();
        let home = as_ref(&app.open_scope("home"));
        let list = as_ref(&app.open_scope("list"));
        let detail = as_ref(&app.open_scope("detail"));

        app.store.acquire_shared("session", &home, || 1u64).unwrap();
        app.store.acquire_shared("cart", &list, || 2u64).unwrap();
        app.store.acquire_shared("cart", &detail, || 2u64).unwrap();
        app.store.acquire_shared("draft", &detail, || 3u64).unwrap();

        assert_eq!(app.stack.finish_except(&["home"]), 2);

        assert_eq!(app.store.keys(), vec!["session".to_string()]);
        assert!(!home.is_destroyed());
        assert!(list.is_destroyed() && detail.is_destroyed());
        assert_eq!(app.metrics().entries_evicted, 2);
    }

    #[test]
    fn test_unsubscribe_after_destroy_is_noop() {
        let bus = EventBus::new();
        let scope = LifecycleScope::shared("list");
        let handle = bus
            .subscribe("login", TopicMode::NonSticky, Some(&as_ref(&scope)), |_: &u8| {})
            .unwrap();

        scope.destroy();
        assert!(!bus.unsubscribe(&handle));
        assert!(!bus.unsubscribe(&handle));
    }

    #[test]
    fn test_destroy_during_fan_out_skips_later_subscriber() {
        let bus = EventBus::new();
        let victim = LifecycleScope::shared("victim");
        let received = Arc::new(Mutex::new(Vec::new()));

        let killer_target = Arc::clone(&victim);
        bus.subscribe("tick", TopicMode::NonSticky, None, move |_: &u32| {
            killer_target.destroy();
        })
        .unwrap();

        let log = Arc::clone(&received);
        bus.subscribe(
            "tick",
            TopicMode::NonSticky,
            Some(&as_ref(&victim)),
            move |v: &u32| log.lock().push(*v),
        )
        .unwrap();

        let report = bus.publish("tick", TopicMode::NonSticky, 1u32).unwrap();

        assert!(received.lock().is_empty());
        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(bus.subscriber_count("tick", TopicMode::NonSticky), 1);
    }

    #[test]
    fn test_subscribe_with_destroyed_scope_registers_nothing() {
        let bus = EventBus::new();
        bus.publish("cart-total", TopicMode::Sticky, 5u32).unwrap();
        let dead = LifecycleScope::shared("dead");
        dead.destroy();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bus.subscribe(
            "cart-total",
            TopicMode::Sticky,
            Some(&as_ref(&dead)),
            move |_: &u32| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count("cart-total", TopicMode::Sticky), 0);
    }

    #[test]
    fn test_container_drop_does_not_depend_on_store() {
        struct Tracked(Arc<AtomicUsize>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let store = ScopedStore::new();
        let scope = LifecycleScope::shared("list");
        let counter = Arc::clone(&drops);
        let held = store
            .acquire_shared("tracked", &as_ref(&scope), move || Tracked(counter))
            .unwrap();

        scope.destroy();
        assert!(!store.contains("tracked"));
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(held);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    // =============================================================================
    // THREADS
    // =============================================================================

    #[test]
    fn test_concurrent_acquire_creates_one_container() {
        const THREADS: usize = 16;
        let store = ScopedStore::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));
        let scopes: Vec<_> = (0..THREADS)
            .map(|_| LifecycleScope::shared("worker"))
            .collect();

        let handles: Vec<_> = scopes
            .iter()
            .map(|scope| {
                let store = store.clone();
                let runs = Arc::clone(&runs);
                let barrier = Arc::clone(&barrier);
                let scope_ref = as_ref(scope);
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .acquire_shared("cart", &scope_ref, || {
                            runs.fetch_add(1, Ordering::SeqCst);
                            Mutex::new(Vec::<u32>::new())
                        })
                        .unwrap()
                })
            })
            .collect();

        let containers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(containers.iter().all(|c| Arc::ptr_eq(c, &containers[0])));
        assert_eq!(store.owner_count("cart"), THREADS);

        for scope in &scopes {
            scope.destroy();
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_publishers_deliver_each_version_once() {
        const PUBLISHERS: usize = 4;
        const PER_THREAD: usize = 50;
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        bus.subscribe("tick", TopicMode::NonSticky, None, move |v: &usize| {
            log.lock().push(*v);
        })
        .unwrap();

        let handles: Vec<_> = (0..PUBLISHERS)
            .map(|t| {
                let bus = bus.clone();
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        bus.publish("tick", TopicMode::NonSticky, t * PER_THREAD + i)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = seen.lock().clone();
        assert!(seen.len() <= PUBLISHERS * PER_THREAD);
        let before = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), before);
        assert_eq!(
            bus.version("tick", TopicMode::NonSticky),
            Some((PUBLISHERS * PER_THREAD - 1) as i64)
        );
    }

    #[test]
    fn test_concurrent_destroy_and_acquire_never_loses_live_owner() {
        let store = ScopedStore::new();
        for _ in 0..50 {
            let dying = LifecycleScope::shared("dying");
            let arriving = LifecycleScope::shared("arriving");
            store.acquire_shared("cart", &as_ref(&dying), || 0u32).unwrap();

            let arriving_ref = as_ref(&arriving);
            let store_for_thread = store.clone();
            let acquirer = thread::spawn(move || {
                store_for_thread
                    .acquire_shared("cart", &arriving_ref, || 0u32)
                    .unwrap()
            });
            dying.destroy();
            acquirer.join().unwrap();

            // Whatever the interleaving, the live scope owns a live entry
            assert!(store.is_owner("cart", arriving.id()));
            arriving.destroy();
            assert!(store.is_empty());
        }
    }
}
