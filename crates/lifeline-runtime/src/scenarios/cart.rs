//! Cart flow: a store-shared cart and a sticky running total.
//!
//! ```text
//! list   ─ acquire("cart") ─┐
//! detail ─ acquire("cart") ─┼─► one Cart, owners {list, detail, summary}
//! summary ─ acquire("cart") ┘
//!
//! list adds 3   ─► publish cart-total 3
//! detail adds 2 ─► publish cart-total 5
//! summary subscribes to cart-total ─► receives 5 before subscribe returns
//! finish all ─► cart evicted
//! ```

use parking_lot::Mutex;
use serde::Serialize;
use shared_bus::TopicMode;
use shared_types::ScopeRef;
use std::sync::Arc;
use tracing::info;

use super::ScenarioError;
use crate::AppContainer;

pub const CART_KEY: &str = "cart";
pub const CART_TOTAL_TOPIC: &str = "cart-total";

/// Shared cart state.
#[derive(Debug, Default)]
pub struct Cart {
    items: Mutex<Vec<(String, u32)>>,
}

impl Cart {
    pub fn add(&self, name: &str, price: u32) -> u32 {
        let mut items = self.items.lock();
        items.push((name.to_string(), price));
        items.iter().map(|(_, price)| price).sum()
    }

    pub fn total(&self) -> u32 {
        self.items.lock().iter().map(|(_, price)| price).sum()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartOutcome {
    /// Totals the summary scope received while `subscribe` was running.
    pub replayed_on_subscribe: Vec<u32>,
    /// Whether every scope saw the same cart instance.
    pub shared_instance: bool,
    /// Owners of the cart before the scopes were finished.
    pub owners: usize,
    /// Whether the cart entry is gone after finishing all scopes.
    pub evicted: bool,
}

pub fn run(app: &AppContainer) -> Result<CartOutcome, ScenarioError> {
    let list: ScopeRef = app.open_scope("list");
    let detail: ScopeRef = app.open_scope("detail");
    let summary: ScopeRef = app.open_scope("summary");

    let list_cart = app.store.acquire_shared(CART_KEY, &list, Cart::default)?;
    let detail_cart = app.store.acquire_shared(CART_KEY, &detail, Cart::default)?;
    let summary_cart = app.store.acquire_shared(CART_KEY, &summary, Cart::default)?;
    let shared_instance =
        Arc::ptr_eq(&list_cart, &detail_cart) && Arc::ptr_eq(&detail_cart, &summary_cart);

    let total = list_cart.add("apple", 3);
    app.bus.publish(CART_TOTAL_TOPIC, TopicMode::Sticky, total)?;
    let total = detail_cart.add("pear", 2);
    app.bus.publish(CART_TOTAL_TOPIC, TopicMode::Sticky, total)?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    app.bus.subscribe(
        CART_TOTAL_TOPIC,
        TopicMode::Sticky,
        Some(&summary),
        move |total: &u32| sink.lock().push(*total),
    )?;
    let replayed_on_subscribe = seen.lock().clone();

    let owners = app.store.owner_count(CART_KEY);
    drop((list_cart, detail_cart, summary_cart));
    app.stack.finish_all();

    let outcome = CartOutcome {
        replayed_on_subscribe,
        shared_instance,
        owners,
        evicted: !app.store.contains(CART_KEY),
    };
    info!(
        replayed = ?outcome.replayed_on_subscribe,
        owners = outcome.owners,
        evicted = outcome.evicted,
        "Cart scenario finished"
    );
    Ok(outcome)
}
