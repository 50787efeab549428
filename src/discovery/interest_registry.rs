//! Interest Registry
//!
//! Tracks which subscribers are interested in which scopes and keeps exactly
//! one started [`ScopeWatch`] per scope that has at least one subscriber.
//!
//! Two indexes are kept in step under a single lock:
//!
//! ```text
//! interests:         scope      ──▶ { subscribers: SubscriberSet, watch }
//! subscriber_scopes: subscriber ──▶ [scope, ...]
//! ```
//!
//! A subscriber is listed under scope S in `subscriber_scopes` iff S's
//! subscriber set contains it, and an interest exists iff its subscriber set
//! is non-empty. Fan-out runs on the watch threads against the scope's
//! [`SubscriberSet`] snapshot, never under this lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use super::FilterMatcher;
use super::NotificationDispatcher;
use super::Scope;
use super::ScopeNotifier;
use super::SubscriberHandle;
use super::SubscriberResolver;
use super::SubscriberSet;
use crate::metrics::ACTIVE_SCOPE_WATCHES_METRIC;
use crate::metrics::WATCH_START_FAILURES_METRIC;
use crate::watch::ScopeWatch;
use crate::watch::ScopeWatchFactory;
use crate::DiscoveryError;
use crate::RegistryConfig;
use crate::Result;

/// Per-scope record
struct Interest {
    subscribers: Arc<SubscriberSet>,
    watch: Option<Box<dyn ScopeWatch>>,
}

impl Interest {
    fn new() -> Self {
        Self {
            subscribers: Arc::new(SubscriberSet::new()),
            watch: None,
        }
    }

    /// Closes the watch at most once; the watch is gone afterwards.
    fn close_watch(
        &mut self,
        scope: &Scope,
    ) {
        if let Some(mut watch) = self.watch.take() {
            watch.close();
            ACTIVE_SCOPE_WATCHES_METRIC.dec();
            debug!(%scope, "Scope watch closed");
        }
    }
}

#[derive(Default)]
struct RegistryState {
    interests: HashMap<Scope, Interest>,
    subscriber_scopes: HashMap<SubscriberHandle, Vec<Scope>>,
}

/// Registry of subscriber interests and their shared scope watches.
///
/// All methods may be called concurrently, including from inside an
/// [`EndpointListener`](crate::EndpointListener) callback.
pub struct InterestRegistry {
    state: Mutex<RegistryState>,
    watch_factory: Arc<dyn ScopeWatchFactory>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl std::fmt::Debug for InterestRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InterestRegistry")
            .field("scopes", &state.interests.len())
            .field("subscribers", &state.subscriber_scopes.len())
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl InterestRegistry {
    pub fn new(
        watch_factory: Arc<dyn ScopeWatchFactory>,
        resolver: Arc<dyn SubscriberResolver>,
        matcher: Arc<dyn FilterMatcher>,
    ) -> Self {
        Self::with_config(&RegistryConfig::default(), watch_factory, resolver, matcher)
    }

    pub fn with_config(
        config: &RegistryConfig,
        watch_factory: Arc<dyn ScopeWatchFactory>,
        resolver: Arc<dyn SubscriberResolver>,
        matcher: Arc<dyn FilterMatcher>,
    ) -> Self {
        let dispatcher =
            NotificationDispatcher::new(resolver, matcher).with_panic_isolation(config.isolate_listener_panics);

        Self {
            state: Mutex::new(RegistryState::default()),
            watch_factory,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Register `subscriber`'s interest in `scope`.
    ///
    /// The first subscriber of a scope creates and starts the scope's watch
    /// for `object_class`; later subscribers share it. Registering the same
    /// pair twice is a no-op.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::WatchStartFailed`] when the scope's watch
    /// cannot be started. The registry is left as if the call never
    /// happened, and the next call for the scope retries construction.
    pub fn add_interest(
        &self,
        subscriber: SubscriberHandle,
        scope: &Scope,
        object_class: &str,
    ) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let interest = state.interests.entry(scope.clone()).or_insert_with(Interest::new);
        let newly_added = interest.subscribers.insert(subscriber);

        if interest.watch.is_none() {
            match self.start_watch(scope, object_class, &interest.subscribers) {
                Ok(watch) => interest.watch = Some(watch),
                Err(e) => {
                    if newly_added {
                        interest.subscribers.remove(subscriber);
                    }
                    if interest.subscribers.is_empty() {
                        state.interests.remove(scope);
                    }
                    return Err(e);
                }
            }
        }

        let scopes = state.subscriber_scopes.entry(subscriber).or_default();
        if !scopes.contains(scope) {
            scopes.push(scope.clone());
        }

        trace!(
            %subscriber,
            %scope,
            object_class,
            newly_added,
            "Interest registered"
        );
        Ok(())
    }

    /// Withdraw every interest of `subscriber`.
    ///
    /// Scopes left without subscribers have their watch closed and are
    /// forgotten. Unknown subscribers are ignored.
    pub fn remove_interest(
        &self,
        subscriber: SubscriberHandle,
    ) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let scopes = match state.subscriber_scopes.remove(&subscriber) {
            Some(scopes) => scopes,
            None => {
                trace!(%subscriber, "No interest registered, nothing to remove");
                return;
            }
        };

        for scope in &scopes {
            let drained = match state.interests.get(scope) {
                Some(interest) => {
                    interest.subscribers.remove(subscriber);
                    interest.subscribers.is_empty()
                }
                None => false,
            };

            if drained {
                if let Some(mut interest) = state.interests.remove(scope) {
                    interest.close_watch(scope);
                }
            }
        }

        debug!(%subscriber, scopes = scopes.len(), "Interest removed");
    }

    /// Close every watch and forget all interests. Idempotent.
    pub fn close(&self) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if state.interests.is_empty() && state.subscriber_scopes.is_empty() {
            return;
        }

        let scopes = state.interests.len();
        for (scope, mut interest) in state.interests.drain() {
            interest.close_watch(&scope);
        }
        state.subscriber_scopes.clear();

        info!(scopes, "Interest registry closed");
    }

    fn start_watch(
        &self,
        scope: &Scope,
        object_class: &str,
        subscribers: &Arc<SubscriberSet>,
    ) -> Result<Box<dyn ScopeWatch>> {
        let notifier = ScopeNotifier::new(scope.clone(), Arc::clone(subscribers), Arc::clone(&self.dispatcher));
        let mut watch = self.watch_factory.create(object_class, scope, Arc::new(notifier));

        if let Err(e) = watch.start() {
            WATCH_START_FAILURES_METRIC.inc();
            error!(%scope, object_class, "Failed to start scope watch: {}", e);
            watch.close();
            return Err(DiscoveryError::watch_start_failed(scope.as_str(), object_class, e).into());
        }

        ACTIVE_SCOPE_WATCHES_METRIC.inc();
        debug!(%scope, object_class, "Scope watch started");
        Ok(watch)
    }

    //---------------------------------------------------------------
    // Introspection

    /// Scopes that currently have an interest, sorted
    pub fn scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self.state.lock().interests.keys().cloned().collect();
        scopes.sort();
        scopes
    }

    /// Subscribers interested in `scope`, sorted
    pub fn subscribers_of(
        &self,
        scope: &str,
    ) -> Vec<SubscriberHandle> {
        let state = self.state.lock();
        let mut subscribers = state
            .interests
            .get(scope)
            .map(|i| i.subscribers.snapshot().to_vec())
            .unwrap_or_default();
        subscribers.sort();
        subscribers
    }

    /// Scopes `subscriber` is interested in, in registration order
    pub fn scopes_of(
        &self,
        subscriber: SubscriberHandle,
    ) -> Vec<Scope> {
        self.state
            .lock()
            .subscriber_scopes
            .get(&subscriber)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_watch(
        &self,
        scope: &str,
    ) -> bool {
        self.state
            .lock()
            .interests
            .get(scope)
            .map(|i| i.watch.is_some())
            .unwrap_or(false)
    }

    pub fn interest_count(&self) -> usize {
        self.state.lock().interests.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscriber_scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.interests.is_empty() && state.subscriber_scopes.is_empty()
    }
}

impl Drop for InterestRegistry {
    fn drop(&mut self) {
        self.close();
    }
}
