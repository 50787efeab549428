use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::InterestRegistry;
use super::Scope;
use super::SubscriberHandle;
use crate::Result;

/// Front-end translating subscriber lifecycle events into registry calls.
///
/// A subscriber announces the scopes it wants as filter expressions; each
/// scope must name the interface it targets through an `(objectClass=...)`
/// clause.
#[derive(Debug, Clone)]
pub struct SubscriptionTracker {
    registry: Arc<InterestRegistry>,
}

impl SubscriptionTracker {
    pub fn new(registry: Arc<InterestRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<InterestRegistry> {
        &self.registry
    }

    /// Register every scope of a new subscriber.
    ///
    /// Scopes without an object class are skipped. All scopes are attempted;
    /// the first watch construction failure is returned afterwards.
    pub fn subscriber_added(
        &self,
        subscriber: SubscriberHandle,
        scopes: &[Scope],
    ) -> Result<()> {
        let mut first_error = None;

        for scope in scopes {
            let object_class = match scope.object_class() {
                Some(class) => class,
                None => {
                    warn!(%subscriber, %scope, "Scope has no objectClass clause, ignoring");
                    continue;
                }
            };

            if let Err(e) = self.registry.add_interest(subscriber, scope, object_class) {
                warn!(%subscriber, %scope, "Failed to register interest: {}", e);
                first_error.get_or_insert(e);
            }
        }

        debug!(%subscriber, scopes = scopes.len(), "Subscriber tracked");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Replace a subscriber's scopes with `scopes`.
    pub fn subscriber_modified(
        &self,
        subscriber: SubscriberHandle,
        scopes: &[Scope],
    ) -> Result<()> {
        self.registry.remove_interest(subscriber);
        self.subscriber_added(subscriber, scopes)
    }

    pub fn subscriber_removed(
        &self,
        subscriber: SubscriberHandle,
    ) {
        self.registry.remove_interest(subscriber);
    }

    pub fn close(&self) {
        self.registry.close();
    }
}
