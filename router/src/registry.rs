//! The subscription registry and dispatch loop.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use regex::Regex;

use crate::error::RouterError;

/// Identifier returned from [`Router::subscribe`], used to unsubscribe.
///
/// Ids are unique and monotonically increasing for the lifetime of the
/// router.
pub type SubscriptionId = u64;

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Subscription<T> {
    pattern: Regex,
    handler: Handler<T>,
    once: bool,
}

struct Registry<T> {
    // BTreeMap so iteration follows id order, which is registration order
    subscriptions: BTreeMap<SubscriptionId, Subscription<T>>,
    next_id: SubscriptionId,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            subscriptions: BTreeMap::new(),
            next_id: 0,
        }
    }
}

/// A clonable handle to a pattern-keyed publish/subscribe registry.
///
/// Handlers run synchronously on the publishing thread, in registration
/// order. The registry lock is not held while handlers run, so a handler
/// may subscribe, unsubscribe or publish reentrantly; subscriptions added
/// during a publish do not see that publish.
pub struct Router<T> {
    inner: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Router<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry::default())),
        }
    }

    /// Register a handler for every topic matching `pattern`.
    ///
    /// `pattern` is compiled as a regular expression; an invalid pattern
    /// fails with [`RouterError::InvalidPattern`].
    pub fn subscribe(
        &self,
        pattern: &str,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, RouterError> {
        let pattern = Regex::new(pattern)?;
        Ok(self.add(pattern, Arc::new(handler), false))
    }

    /// Register a handler that is invoked at most once.
    ///
    /// The subscription is removed before the handler is invoked, so a
    /// second publish to a matching topic never re-invokes it, even if
    /// the handler panics on its first invocation.
    pub fn once(
        &self,
        pattern: &str,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, RouterError> {
        let pattern = Regex::new(pattern)?;
        Ok(self.add(pattern, Arc::new(handler), true))
    }

    /// Register a handler with a pre-compiled pattern.
    pub fn subscribe_regex(
        &self,
        pattern: Regex,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.add(pattern, Arc::new(handler), false)
    }

    fn add(&self, pattern: Regex, handler: Handler<T>, once: bool) -> SubscriptionId {
        let mut registry = self.inner.lock().unwrap();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscriptions.insert(
            id,
            Subscription {
                pattern,
                handler,
                once,
            },
        );
        id
    }

    /// Remove a subscription, returning whether anything was removed.
    ///
    /// Unsubscribing an unknown id is not an error.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .remove(&id)
            .is_some()
    }

    /// Publish `payload` on `topic`, returning the number of handlers
    /// invoked.
    ///
    /// Every subscription whose pattern matches the topic is invoked, in
    /// registration order. A handler that panics is caught and logged; it
    /// does not prevent later handlers from running and does not fail the
    /// publish.
    pub fn publish(&self, topic: &str, payload: &T) -> usize {
        let matching: Vec<(SubscriptionId, Handler<T>)> = {
            let mut registry = self.inner.lock().unwrap();
            let matched: Vec<SubscriptionId> = registry
                .subscriptions
                .iter()
                .filter(|(_, sub)| sub.pattern.is_match(topic))
                .map(|(id, _)| *id)
                .collect();

            matched
                .into_iter()
                .map(|id| {
                    let handler = if registry.subscriptions[&id].once {
                        // single-shot: drop the registration before the
                        // handler runs
                        registry.subscriptions.remove(&id).unwrap().handler
                    } else {
                        Arc::clone(&registry.subscriptions[&id].handler)
                    };
                    (id, handler)
                })
                .collect()
        };

        let mut invoked = 0;
        for (id, handler) in matching {
            invoked += 1;
            if catch_unwind(AssertUnwindSafe(|| handler(payload))).is_err() {
                tracing::warn!(subscription = id, topic, "subscriber panicked");
            }
        }
        invoked
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().subscriptions.len()
    }

    /// Whether the router has no live subscriptions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
