//! Login flow on a non-sticky topic.
//!
//! ```text
//! publish("alice")            nobody listening, value stored
//! profile subscribes          aligned to version 0, nothing replayed
//! publish("bob")              profile receives "bob"
//! profile finished            subscription removed with the scope
//! publish("carol")            nobody listening
//! ```

use parking_lot::Mutex;
use serde::Serialize;
use shared_bus::TopicMode;
use shared_types::ScopeRef;
use std::sync::Arc;
use tracing::info;

use super::ScenarioError;
use crate::AppContainer;

pub const LOGIN_TOPIC: &str = "login";

/// What the profile scope observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    /// Names delivered to the profile scope, in order.
    pub received: Vec<String>,
    /// Topic version after the last publish.
    pub final_version: i64,
    /// Subscribers left on the topic after the scope was finished.
    pub subscribers_after_finish: usize,
}

pub fn run(app: &AppContainer) -> Result<LoginOutcome, ScenarioError> {
    app.bus.publish(LOGIN_TOPIC, TopicMode::NonSticky, "alice".to_string())?;

    let profile = app.open_scope("profile");
    let profile_ref: ScopeRef = profile.clone();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    app.bus.subscribe(
        LOGIN_TOPIC,
        TopicMode::NonSticky,
        Some(&profile_ref),
        move |name: &String| sink.lock().push(name.clone()),
    )?;

    app.bus.publish(LOGIN_TOPIC, TopicMode::NonSticky, "bob".to_string())?;
    app.stack.finish(&["profile"]);
    app.bus.publish(LOGIN_TOPIC, TopicMode::NonSticky, "carol".to_string())?;

    let outcome = LoginOutcome {
        received: received.lock().clone(),
        final_version: app.bus.version(LOGIN_TOPIC, TopicMode::NonSticky).unwrap_or(-1),
        subscribers_after_finish: app.bus.subscriber_count(LOGIN_TOPIC, TopicMode::NonSticky),
    };
    info!(received = ?outcome.received, "Login scenario finished");
    Ok(outcome)
}
