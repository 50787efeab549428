//! Shared fixtures for the discovery integration tests
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use d_engine_discovery::EndpointDescription;
use d_engine_discovery::EndpointEvent;
use d_engine_discovery::EndpointListener;
use d_engine_discovery::Result;
use d_engine_discovery::Scope;
use d_engine_discovery::SubscriberHandle;
use d_engine_discovery::SubscriberOwner;
use d_engine_discovery::SubscriberResolver;
use d_engine_discovery::SubscriberService;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

lazy_static! {
    static ref CLAUSE: Regex = Regex::new(r"\(([^()=&|!]+)=([^()]*)\)").expect("clause pattern is valid");
}

/// Conjunctive filter: every `(key=value)` clause must hold.
///
/// `objectClass` clauses match the exported interfaces, every other key
/// matches an endpoint property.
pub fn conjunctive_match(
    scope: &Scope,
    endpoint: &EndpointDescription,
) -> bool {
    CLAUSE.captures_iter(scope.as_str()).all(|caps| {
        let (key, value) = (caps[1].trim(), caps[2].trim());
        if key == "objectClass" {
            endpoint.exports(value)
        } else {
            endpoint.property(key) == Some(value)
        }
    })
}

/// Polls `condition` until it holds or `WAIT_TIMEOUT` elapses.
pub fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[derive(Default)]
pub struct Inbox {
    events: Mutex<Vec<(EndpointEvent, String)>>,
}

impl Inbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn received(&self) -> Vec<(EndpointEvent, String)> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

impl EndpointListener for Inbox {
    fn endpoint_added(
        &self,
        endpoint: &EndpointDescription,
        _matched_scope: &Scope,
    ) -> Result<()> {
        self.events.lock().push((EndpointEvent::Added, endpoint.id.clone()));
        Ok(())
    }

    fn endpoint_removed(
        &self,
        endpoint: &EndpointDescription,
        _matched_scope: &Scope,
    ) -> Result<()> {
        self.events.lock().push((EndpointEvent::Removed, endpoint.id.clone()));
        Ok(())
    }
}

impl SubscriberService for Inbox {
    fn as_endpoint_listener(&self) -> Option<&dyn EndpointListener> {
        Some(self)
    }
}

/// Service registry stand-in resolving handles to inboxes
#[derive(Default)]
pub struct InboxRegistry {
    inboxes: Mutex<HashMap<SubscriberHandle, Arc<Inbox>>>,
    outstanding: Mutex<i64>,
}

impl InboxRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(
        &self,
        handle: SubscriberHandle,
    ) -> Arc<Inbox> {
        let inbox = Inbox::new();
        self.inboxes.lock().insert(handle, inbox.clone());
        inbox
    }

    pub fn outstanding(&self) -> i64 {
        *self.outstanding.lock()
    }
}

impl SubscriberResolver for InboxRegistry {
    fn resolve(
        &self,
        handle: SubscriberHandle,
    ) -> Option<Arc<dyn SubscriberService>> {
        let inbox = self.inboxes.lock().get(&handle).cloned()?;
        *self.outstanding.lock() += 1;
        Some(inbox)
    }

    fn owner(
        &self,
        handle: SubscriberHandle,
    ) -> Option<SubscriberOwner> {
        self.inboxes
            .lock()
            .contains_key(&handle)
            .then(|| SubscriberOwner::new(format!("bundle-{}", handle.id())))
    }

    fn release(
        &self,
        _handle: SubscriberHandle,
    ) {
        *self.outstanding.lock() -= 1;
    }
}
