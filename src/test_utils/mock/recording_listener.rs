use std::sync::Arc;

use parking_lot::Mutex;

use crate::DiscoveryError;
use crate::EndpointDescription;
use crate::EndpointEvent;
use crate::EndpointListener;
use crate::Result;
use crate::Scope;
use crate::SubscriberService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerBehavior {
    Record,
    Fail,
    Panic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub event: EndpointEvent,
    pub endpoint_id: String,
    pub scope: Scope,
}

type Hook = Box<dyn Fn(&EndpointDescription, &Scope) + Send + Sync>;

/// Endpoint listener that records what it receives
pub struct RecordingListener {
    behavior: ListenerBehavior,
    events: Mutex<Vec<RecordedEvent>>,
    on_added: Option<Hook>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Self::with_behavior(ListenerBehavior::Record)
    }

    pub fn with_behavior(behavior: ListenerBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            events: Mutex::new(Vec::new()),
            on_added: None,
        })
    }

    /// Runs `hook` inside every `endpoint_added` call, after recording.
    pub fn with_added_hook<F>(hook: F) -> Arc<Self>
    where
        F: Fn(&EndpointDescription, &Scope) + Send + Sync + 'static,
    {
        Arc::new(Self {
            behavior: ListenerBehavior::Record,
            events: Mutex::new(Vec::new()),
            on_added: Some(Box::new(hook)),
        })
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    pub fn count(
        &self,
        event: EndpointEvent,
    ) -> usize {
        self.events.lock().iter().filter(|e| e.event == event).count()
    }

    fn record(
        &self,
        event: EndpointEvent,
        endpoint: &EndpointDescription,
        scope: &Scope,
    ) -> Result<()> {
        match self.behavior {
            ListenerBehavior::Record => {
                self.events.lock().push(RecordedEvent {
                    event,
                    endpoint_id: endpoint.id.clone(),
                    scope: scope.clone(),
                });
                Ok(())
            }
            ListenerBehavior::Fail => Err(DiscoveryError::Listener(format!("rejected {}", endpoint.id)).into()),
            ListenerBehavior::Panic => panic!("listener blew up on {}", endpoint.id),
        }
    }
}

impl EndpointListener for RecordingListener {
    fn endpoint_added(
        &self,
        endpoint: &EndpointDescription,
        matched_scope: &Scope,
    ) -> Result<()> {
        self.record(EndpointEvent::Added, endpoint, matched_scope)?;
        if let Some(hook) = &self.on_added {
            hook(endpoint, matched_scope);
        }
        Ok(())
    }

    fn endpoint_removed(
        &self,
        endpoint: &EndpointDescription,
        matched_scope: &Scope,
    ) -> Result<()> {
        self.record(EndpointEvent::Removed, endpoint, matched_scope)
    }
}

impl SubscriberService for RecordingListener {
    fn as_endpoint_listener(&self) -> Option<&dyn EndpointListener> {
        Some(self)
    }
}

/// Resolvable service without the endpoint-listener capability
#[derive(Debug, Default)]
pub struct PlainService;

impl SubscriberService for PlainService {}
