//! Notification fan-out
//!
//! Delivers one watch event to every interested subscriber of a scope. Runs
//! on the watch's callback thread and never touches the registry lock: the
//! subscriber list is a snapshot of the scope's [`SubscriberSet`], taken when
//! the event arrives. Subscribers joining afterwards are not part of that
//! delivery.

use std::any::Any;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::EndpointDescription;
use super::EndpointEvent;
use super::EndpointListener;
use super::FilterMatcher;
use super::ResolvedSubscriber;
use super::Scope;
use super::SubscriberHandle;
use super::SubscriberResolver;
use super::SubscriberSet;
use crate::metrics::LISTENER_FAILURES_METRIC;
use crate::metrics::NOTIFICATIONS_DELIVERED_METRIC;
use crate::metrics::NOTIFICATIONS_SKIPPED_METRIC;
use crate::watch::ScopeWatchListener;

/// Why a subscriber did not receive an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Handle no longer resolves to a live subscriber
    Unresolved,
    /// Resolved object lacks the endpoint-listener capability
    NotAListener,
    /// Scope filter rejected the endpoint
    NoMatch,
    /// Owning unit has been torn down
    OwnerGone,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Unresolved => "unresolved",
            SkipReason::NotAListener => "not_a_listener",
            SkipReason::NoMatch => "no_match",
            SkipReason::OwnerGone => "owner_gone",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    Skipped(SkipReason),
    Failed,
}

/// Outcome counts of one fan-out
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanoutSummary {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Resolves, filters and notifies subscribers for watch events.
pub struct NotificationDispatcher {
    resolver: Arc<dyn SubscriberResolver>,
    matcher: Arc<dyn FilterMatcher>,
    isolate_panics: bool,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("isolate_panics", &self.isolate_panics)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(
        resolver: Arc<dyn SubscriberResolver>,
        matcher: Arc<dyn FilterMatcher>,
    ) -> Self {
        Self {
            resolver,
            matcher,
            isolate_panics: true,
        }
    }

    /// Contain panics raised while notifying a single subscriber.
    pub fn with_panic_isolation(
        mut self,
        enabled: bool,
    ) -> Self {
        self.isolate_panics = enabled;
        self
    }

    /// Deliver `event` for `endpoint` to every handle in `subscribers`.
    ///
    /// A failing or stale subscriber never prevents delivery to the rest.
    pub fn notify(
        &self,
        endpoint: &EndpointDescription,
        scope: &Scope,
        event: EndpointEvent,
        subscribers: &[SubscriberHandle],
    ) -> FanoutSummary {
        let mut summary = FanoutSummary::default();

        for &handle in subscribers {
            match self.notify_subscriber(endpoint, scope, event, handle) {
                Delivery::Delivered => {
                    summary.delivered += 1;
                    NOTIFICATIONS_DELIVERED_METRIC
                        .with_label_values(&[event.as_str()])
                        .inc();
                }
                Delivery::Skipped(reason) => {
                    summary.skipped += 1;
                    NOTIFICATIONS_SKIPPED_METRIC
                        .with_label_values(&[reason.as_str()])
                        .inc();
                }
                Delivery::Failed => {
                    summary.failed += 1;
                    LISTENER_FAILURES_METRIC.inc();
                }
            }
        }

        debug!(
            endpoint = %endpoint.id,
            %scope,
            event = event.as_str(),
            subscribers = subscribers.len(),
            delivered = summary.delivered,
            skipped = summary.skipped,
            failed = summary.failed,
            "Fan-out finished"
        );

        summary
    }

    fn notify_subscriber(
        &self,
        endpoint: &EndpointDescription,
        scope: &Scope,
        event: EndpointEvent,
        handle: SubscriberHandle,
    ) -> Delivery {
        if !self.isolate_panics {
            return self.resolve_and_deliver(endpoint, scope, event, handle);
        }

        // The resolved subscriber is released while unwinding, so a panic
        // here never leaks a resolution.
        match catch_unwind(AssertUnwindSafe(|| {
            self.resolve_and_deliver(endpoint, scope, event, handle)
        })) {
            Ok(delivery) => delivery,
            Err(payload) => {
                warn!(
                    %handle,
                    endpoint = %endpoint.id,
                    %scope,
                    "Endpoint listener panicked: {}",
                    panic_message(payload.as_ref())
                );
                Delivery::Failed
            }
        }
    }

    fn resolve_and_deliver(
        &self,
        endpoint: &EndpointDescription,
        scope: &Scope,
        event: EndpointEvent,
        handle: SubscriberHandle,
    ) -> Delivery {
        let subscriber = match ResolvedSubscriber::acquire(self.resolver.as_ref(), handle) {
            Some(s) => s,
            None => {
                debug!(%handle, "Subscriber no longer registered, skipping");
                return Delivery::Skipped(SkipReason::Unresolved);
            }
        };

        let listener = match subscriber.as_endpoint_listener() {
            Some(l) => l,
            None => {
                trace!(%handle, "Resolved subscriber is not an endpoint listener");
                return Delivery::Skipped(SkipReason::NotAListener);
            }
        };

        trace!("matching {} against {}", endpoint, scope);
        if !self.matcher.matches(scope, endpoint) {
            return Delivery::Skipped(SkipReason::NoMatch);
        }
        debug!("Matched {} against {}", endpoint, scope);

        let owner = match subscriber.owner() {
            Some(o) => o,
            None => {
                info!(%handle, "Listening service was unregistered, ignoring");
                return Delivery::Skipped(SkipReason::OwnerGone);
            }
        };

        info!(
            %handle,
            owner = %owner.name,
            endpoint = %endpoint,
            event = event.as_str(),
            "Calling endpoint listener"
        );

        match deliver(listener, endpoint, scope, event) {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                warn!(
                    %handle,
                    owner = %owner.name,
                    endpoint = %endpoint.id,
                    "Endpoint listener failed: {}",
                    e
                );
                Delivery::Failed
            }
        }
    }
}

fn deliver(
    listener: &dyn EndpointListener,
    endpoint: &EndpointDescription,
    scope: &Scope,
    event: EndpointEvent,
) -> crate::Result<()> {
    match event {
        EndpointEvent::Added => listener.endpoint_added(endpoint, scope),
        EndpointEvent::Removed => listener.endpoint_removed(endpoint, scope),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Watch callback bound to one scope.
///
/// Holds the scope's subscriber set, not the registry, so callbacks never
/// contend with `add_interest`/`remove_interest`.
pub struct ScopeNotifier {
    scope: Scope,
    subscribers: Arc<SubscriberSet>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl ScopeNotifier {
    pub fn new(
        scope: Scope,
        subscribers: Arc<SubscriberSet>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            scope,
            subscribers,
            dispatcher,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    fn fan_out(
        &self,
        endpoint: &EndpointDescription,
        event: EndpointEvent,
    ) -> FanoutSummary {
        let snapshot = self.subscribers.snapshot();
        self.dispatcher.notify(endpoint, &self.scope, event, &snapshot)
    }
}

impl ScopeWatchListener for ScopeNotifier {
    fn on_endpoint_added(
        &self,
        endpoint: &EndpointDescription,
        _scope: &Scope,
    ) {
        self.fan_out(endpoint, EndpointEvent::Added);
    }

    fn on_endpoint_removed(
        &self,
        endpoint: &EndpointDescription,
        _scope: &Scope,
    ) {
        self.fan_out(endpoint, EndpointEvent::Removed);
    }
}
