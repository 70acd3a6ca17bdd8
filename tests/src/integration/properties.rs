//! # Property Tests
//!
//! Delivery and ownership invariants checked over generated operation
//! sequences against a simple model.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;
    use proptest::prelude::*;

    use shared_bus::{EventBus, TopicMode};
    use shared_store::ScopedStore;
    use shared_types::{LifecycleScope, Scope, ScopeRef};

    fn mode_strategy() -> impl Strategy<Value = TopicMode> {
        prop_oneof![Just(TopicMode::Sticky), Just(TopicMode::NonSticky)]
    }

    fn recording_subscriber(
        bus: &EventBus,
        mode: TopicMode,
    ) -> (Arc<Mutex<Vec<u32>>>, shared_bus::SubscriptionHandle) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::clone(&log);
        let handle = bus
            .subscribe("topic", mode, None, move |v: &u32| writer.lock().push(*v))
            .unwrap();
        (log, handle)
    }

    proptest! {
        /// Versions start at 0 and go up by exactly one per publish.
        #[test]
        fn versions_increase_by_one(mode in mode_strategy(), values in prop::collection::vec(any::<u32>(), 1..40)) {
            let bus = EventBus::new();
            prop_assert_eq!(bus.version("topic", mode), None);
            for (i, value) in values.iter().enumerate() {
                let report = bus.publish("topic", mode, *value).unwrap();
                prop_assert_eq!(report.version, i as i64);
            }
            prop_assert_eq!(bus.version("topic", mode), Some(values.len() as i64 - 1));
        }

        /// A subscriber sees exactly what is published while it is
        /// subscribed, plus the latest earlier value on sticky topics.
        #[test]
        fn subscriber_sees_its_window(
            mode in mode_strategy(),
            before in prop::collection::vec(any::<u32>(), 0..10),
            during in prop::collection::vec(any::<u32>(), 0..10),
            after in prop::collection::vec(any::<u32>(), 0..10),
        ) {
            let bus = EventBus::new();
            for v in &before {
                bus.publish("topic", mode, *v).unwrap();
            }

            let (log, handle) = recording_subscriber(&bus, mode);
            for v in &during {
                bus.publish("topic", mode, *v).unwrap();
            }
            prop_assert!(bus.unsubscribe(&handle));
            for v in &after {
                bus.publish("topic", mode, *v).unwrap();
            }

            let mut expected = Vec::new();
            if mode == TopicMode::Sticky {
                expected.extend(before.last().copied());
            }
            expected.extend(during.iter().copied());
            prop_assert_eq!(&*log.lock(), &expected);
        }

        /// Every subscriber gets each version at most once, in order, however
        /// subscriptions and publishes interleave.
        #[test]
        fn at_most_once_per_version(ops in prop::collection::vec(any::<bool>(), 1..60)) {
            let bus = EventBus::new();
            let versions = Arc::new(Mutex::new(Vec::<Vec<i64>>::new()));

            for (step, subscribe) in ops.iter().enumerate() {
                if *subscribe {
                    let index = {
                        let mut all = versions.lock();
                        all.push(Vec::new());
                        all.len() - 1
                    };
                    let log = Arc::clone(&versions);
                    let reader = bus.clone();
                    bus.subscribe("topic", TopicMode::Sticky, None, move |_: &usize| {
                        let version = reader.version("topic", TopicMode::Sticky).unwrap_or(-1);
                        log.lock()[index].push(version);
                    })
                    .unwrap();
                } else {
                    bus.publish("topic", TopicMode::Sticky, step).unwrap();
                }
            }

            for seen in versions.lock().iter() {
                prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
            }
        }

        /// A store entry exists exactly while some scope that acquired it in
        /// the current generation is alive, and the factory runs once per
        /// generation.
        #[test]
        fn store_matches_ownership_model(ops in prop::collection::vec((any::<bool>(), 0usize..6), 1..80)) {
            let store = ScopedStore::new();
            let scopes: Vec<Arc<LifecycleScope>> =
                (0..6).map(|i| LifecycleScope::shared(format!("scope-{i}"))).collect();
            let runs = AtomicUsize::new(0);

            let mut owners: HashSet<usize> = HashSet::new();
            let mut expected_runs = 0usize;

            for (acquire, index) in ops {
                let scope = &scopes[index];
                if acquire {
                    let scope_ref: ScopeRef = scope.clone();
                    store
                        .acquire_shared("k", &scope_ref, || {
                            runs.fetch_add(1, Ordering::SeqCst);
                            index
                        })
                        .unwrap();
                    // A destroyed scope with no live entry gets an unstored
                    // container, which also costs a factory run.
                    if owners.is_empty() {
                        expected_runs += 1;
                    }
                    if !scope.is_destroyed() {
                        owners.insert(index);
                    }
                } else if scope.destroy() {
                    owners.remove(&index);
                }

                prop_assert_eq!(store.contains("k"), !owners.is_empty());
                prop_assert_eq!(store.owner_count("k"), owners.len());
            }

            prop_assert_eq!(runs.load(Ordering::SeqCst), expected_runs);
        }
    }
}
