use std::ops::Deref;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use super::EndpointDescription;
use super::Scope;
use super::SubscriberHandle;
use crate::Result;

/// Capability of subscribers that want endpoint add/remove notifications.
pub trait EndpointListener: Send + Sync {
    /// `matched_scope` is the scope the endpoint was discovered under.
    fn endpoint_added(
        &self,
        endpoint: &EndpointDescription,
        matched_scope: &Scope,
    ) -> Result<()>;

    fn endpoint_removed(
        &self,
        endpoint: &EndpointDescription,
        matched_scope: &Scope,
    ) -> Result<()>;
}

/// Live object a subscriber handle resolves to.
///
/// Only objects exposing the [`EndpointListener`] capability take part in
/// fan-out; anything else is resolved, skipped and released.
pub trait SubscriberService: Send + Sync {
    fn as_endpoint_listener(&self) -> Option<&dyn EndpointListener> {
        None
    }
}

/// Unit owning a subscriber (the component that registered it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberOwner {
    pub name: String,
}

impl SubscriberOwner {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Subscriber resolution service.
///
/// Every `resolve` returning `Some` must be paired with exactly one
/// `release` for the same handle.
#[cfg_attr(test, automock)]
pub trait SubscriberResolver: Send + Sync + 'static {
    /// Live subscriber object, `None` once the subscriber is unregistered
    fn resolve(
        &self,
        handle: SubscriberHandle,
    ) -> Option<Arc<dyn SubscriberService>>;

    /// Owning unit, `None` once it has been torn down
    fn owner(
        &self,
        handle: SubscriberHandle,
    ) -> Option<SubscriberOwner>;

    fn release(
        &self,
        handle: SubscriberHandle,
    );
}

/// Scoped acquisition of a resolved subscriber.
///
/// Releases the subscriber back to its resolver when dropped, including when
/// the holder unwinds.
pub struct ResolvedSubscriber<'a> {
    resolver: &'a dyn SubscriberResolver,
    handle: SubscriberHandle,
    service: Arc<dyn SubscriberService>,
}

impl<'a> ResolvedSubscriber<'a> {
    /// Returns `None` (and holds nothing) when the handle no longer resolves.
    pub fn acquire(
        resolver: &'a dyn SubscriberResolver,
        handle: SubscriberHandle,
    ) -> Option<Self> {
        resolver.resolve(handle).map(|service| Self {
            resolver,
            handle,
            service,
        })
    }

    pub fn handle(&self) -> SubscriberHandle {
        self.handle
    }

    pub fn owner(&self) -> Option<SubscriberOwner> {
        self.resolver.owner(self.handle)
    }
}

impl Deref for ResolvedSubscriber<'_> {
    type Target = dyn SubscriberService;

    fn deref(&self) -> &Self::Target {
        self.service.as_ref()
    }
}

impl Drop for ResolvedSubscriber<'_> {
    fn drop(&mut self) {
        self.resolver.release(self.handle);
    }
}
