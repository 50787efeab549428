//! In-memory coordination store and scope watch
//!
//! Stands in for a real coordination store when embedding the discovery
//! layer in a single process or in tests:
//!
//! ```text
//! publish()/unpublish()
//!        │ (store lock)
//!        ▼
//! ┌─────────────────┐  path lookup   ┌──────────────────┐
//! │ MemoryCoord.    │ ─────────────▶ │ per-watch queue  │ (crossbeam, bounded)
//! │ Store           │   (DashMap)    └────────┬─────────┘
//! └─────────────────┘                         │
//!                                             ▼
//!                                   ┌──────────────────┐
//!                                   │ dispatcher thread│ ──▶ ScopeWatchListener
//!                                   └──────────────────┘
//! ```
//!
//! Every watch delivers on its own thread, in publish order. A watch that
//! starts replays every endpoint already published under its path before any
//! live event; the replay is handed to the thread directly and is never
//! subject to the queue bound.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::coordination_path;
use super::ScopeWatch;
use super::ScopeWatchFactory;
use super::ScopeWatchListener;
use crate::CoordinationConfig;
use crate::DiscoveryError;
use crate::EndpointDescription;
use crate::EndpointEvent;
use crate::RegistryConfig;
use crate::Result;
use crate::Scope;

#[derive(Debug, Clone)]
struct StoreEvent {
    kind: EndpointEvent,
    endpoint: EndpointDescription,
}

#[derive(Debug)]
struct Watcher {
    id: u64,
    sender: Sender<StoreEvent>,
}

/// Endpoints published under `root_path`, keyed by interface path
#[derive(Debug)]
pub struct MemoryCoordinationStore {
    root_path: String,

    /// Published endpoints by id. Also serializes publishing against watch
    /// registration so a starting watch sees each endpoint exactly once.
    endpoints: Mutex<BTreeMap<String, EndpointDescription>>,

    /// Watchers grouped by coordination path
    watchers: DashMap<String, Vec<Watcher>>,

    next_id: AtomicU64,

    available: AtomicBool,
}

impl MemoryCoordinationStore {
    pub fn new(root_path: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
            endpoints: Mutex::new(BTreeMap::new()),
            watchers: DashMap::new(),
            next_id: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Only `root_path` is used; the connection settings have no meaning
    /// for an in-process store.
    pub fn from_config(config: &CoordinationConfig) -> Self {
        debug!(
            root_path = %config.root_path,
            connect_string = %config.connect_string,
            "In-memory coordination store ignores connection settings"
        );
        Self::new(config.root_path.clone())
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn path_for(
        &self,
        object_class: &str,
    ) -> String {
        coordination_path(&self.root_path, object_class)
    }

    /// Simulate the store becoming (un)reachable for new watches.
    pub fn set_available(
        &self,
        available: bool,
    ) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Publish or replace an endpoint.
    ///
    /// Replacing an endpoint with different content is reported as a removal
    /// of the old description followed by an addition of the new one.
    pub fn publish(
        &self,
        endpoint: EndpointDescription,
    ) {
        let mut endpoints = self.endpoints.lock();

        if let Some(previous) = endpoints.get(&endpoint.id) {
            if *previous == endpoint {
                trace!(endpoint = %endpoint.id, "Endpoint already published");
                return;
            }
            let previous = previous.clone();
            self.broadcast(EndpointEvent::Removed, &previous);
        }

        self.broadcast(EndpointEvent::Added, &endpoint);
        debug!(endpoint = %endpoint, "Endpoint published");
        endpoints.insert(endpoint.id.clone(), endpoint);
    }

    /// Returns `false` if no endpoint with `endpoint_id` was published.
    pub fn unpublish(
        &self,
        endpoint_id: &str,
    ) -> bool {
        let mut endpoints = self.endpoints.lock();
        match endpoints.remove(endpoint_id) {
            Some(endpoint) => {
                self.broadcast(EndpointEvent::Removed, &endpoint);
                debug!(endpoint = %endpoint, "Endpoint unpublished");
                true
            }
            None => false,
        }
    }

    pub fn endpoints(&self) -> Vec<EndpointDescription> {
        self.endpoints.lock().values().cloned().collect()
    }

    /// Number of watchers registered on `path`
    pub fn watcher_count(
        &self,
        path: &str,
    ) -> usize {
        self.watchers.get(path).map(|w| w.len()).unwrap_or(0)
    }

    /// Number of distinct watched paths
    pub fn watched_path_count(&self) -> usize {
        self.watchers.len()
    }

    /// Register a watcher on `path`.
    ///
    /// Returns the watcher id and the endpoints already published under
    /// `path`. Events published after this call go to `sender`.
    fn register(
        &self,
        path: &str,
        sender: Sender<StoreEvent>,
    ) -> (u64, Vec<EndpointDescription>) {
        let endpoints = self.endpoints.lock();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let existing: Vec<EndpointDescription> = endpoints
            .values()
            .filter(|endpoint| self.exported_under(endpoint, path))
            .cloned()
            .collect();

        self.watchers
            .entry(path.to_string())
            .or_default()
            .push(Watcher { id, sender });

        trace!(watcher_id = id, path, existing = existing.len(), "Watcher registered");
        (id, existing)
    }

    fn unregister(
        &self,
        path: &str,
        id: u64,
    ) {
        self.watchers.remove_if_mut(path, |_path, watchers| {
            watchers.retain(|w| w.id != id);
            watchers.is_empty()
        });
        trace!(watcher_id = id, path, "Watcher unregistered");
    }

    fn exported_under(
        &self,
        endpoint: &EndpointDescription,
        path: &str,
    ) -> bool {
        endpoint.interfaces.iter().any(|i| self.path_for(i) == path)
    }

    fn broadcast(
        &self,
        kind: EndpointEvent,
        endpoint: &EndpointDescription,
    ) {
        for interface in &endpoint.interfaces {
            let path = self.path_for(interface);
            if let Some(watchers) = self.watchers.get(&path) {
                for watcher in watchers.iter() {
                    send_event(watcher.id, &watcher.sender, kind, endpoint);
                }
            }
        }
    }
}

fn send_event(
    watcher_id: u64,
    sender: &Sender<StoreEvent>,
    kind: EndpointEvent,
    endpoint: &EndpointDescription,
) {
    let event = StoreEvent {
        kind,
        endpoint: endpoint.clone(),
    };
    match sender.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!(
                watcher_id,
                endpoint = %endpoint.id,
                event = kind.as_str(),
                "Watch queue full, dropping event"
            );
        }
        // Watch closed concurrently
        Err(TrySendError::Disconnected(_)) => {}
    }
}

struct RunningWatch {
    watcher_id: u64,
    closed: Arc<AtomicBool>,
    shutdown_tx: Sender<()>,
}

/// Scope watch over one interface path of a [`MemoryCoordinationStore`]
pub struct MemoryScopeWatch {
    store: Arc<MemoryCoordinationStore>,
    object_class: String,
    scope: Scope,
    path: String,
    listener: Arc<dyn ScopeWatchListener>,
    queue_size: usize,
    running: Option<RunningWatch>,
    started: bool,
}

impl std::fmt::Debug for MemoryScopeWatch {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("MemoryScopeWatch")
            .field("object_class", &self.object_class)
            .field("scope", &self.scope)
            .field("path", &self.path)
            .field("running", &self.running.is_some())
            .finish_non_exhaustive()
    }
}

impl MemoryScopeWatch {
    pub fn new(
        store: Arc<MemoryCoordinationStore>,
        object_class: &str,
        scope: &Scope,
        listener: Arc<dyn ScopeWatchListener>,
        queue_size: usize,
    ) -> Self {
        let path = store.path_for(object_class);
        Self {
            store,
            object_class: object_class.to_string(),
            scope: scope.clone(),
            path,
            listener,
            queue_size,
            running: None,
            started: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn run_dispatcher(
        scope: Scope,
        listener: Arc<dyn ScopeWatchListener>,
        existing: Vec<EndpointDescription>,
        events: Receiver<StoreEvent>,
        shutdown_rx: Receiver<()>,
        closed: Arc<AtomicBool>,
    ) {
        debug!(%scope, existing = existing.len(), "Scope watch dispatcher started");

        // Replay bypasses the bounded queue; live events wait behind it.
        for endpoint in &existing {
            if closed.load(Ordering::SeqCst) {
                debug!(%scope, "Scope watch closed during replay");
                return;
            }
            listener.on_endpoint_added(endpoint, &scope);
        }

        loop {
            crossbeam_channel::select! {
                recv(events) -> result => {
                    match result {
                        Ok(event) => {
                            if closed.load(Ordering::SeqCst) {
                                break;
                            }
                            match event.kind {
                                EndpointEvent::Added => listener.on_endpoint_added(&event.endpoint, &scope),
                                EndpointEvent::Removed => listener.on_endpoint_removed(&event.endpoint, &scope),
                            }
                        }
                        Err(_) => break,
                    }
                }
                recv(shutdown_rx) -> _ => {
                    break;
                }
            }
        }

        debug!(%scope, "Scope watch dispatcher stopped");
    }
}

impl ScopeWatch for MemoryScopeWatch {
    fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(DiscoveryError::WatchAlreadyStarted {
                path: self.path.clone(),
            }
            .into());
        }

        if !self.store.is_available() {
            return Err(DiscoveryError::CoordinationUnavailable(format!(
                "cannot watch {}",
                self.path
            ))
            .into());
        }
        self.started = true;

        let (event_tx, event_rx) = if self.queue_size > 0 {
            bounded(self.queue_size)
        } else {
            unbounded()
        };
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let closed = Arc::new(AtomicBool::new(false));

        let (watcher_id, existing) = self.store.register(&self.path, event_tx);

        let scope = self.scope.clone();
        let listener = Arc::clone(&self.listener);
        let dispatcher_closed = Arc::clone(&closed);
        std::thread::spawn(move || {
            Self::run_dispatcher(scope, listener, existing, event_rx, shutdown_rx, dispatcher_closed);
        });

        self.running = Some(RunningWatch {
            watcher_id,
            closed,
            shutdown_tx,
        });

        debug!(
            watcher_id,
            path = %self.path,
            scope = %self.scope,
            "Memory scope watch started"
        );
        Ok(())
    }

    /// Stops delivery without waiting for the dispatcher thread: a callback
    /// in flight may itself be waiting on the lock held by the closer.
    fn close(&mut self) {
        if let Some(running) = self.running.take() {
            running.closed.store(true, Ordering::SeqCst);
            self.store.unregister(&self.path, running.watcher_id);
            let _ = running.shutdown_tx.try_send(());
            debug!(
                watcher_id = running.watcher_id,
                path = %self.path,
                "Memory scope watch closed"
            );
        }
    }
}

impl Drop for MemoryScopeWatch {
    fn drop(&mut self) {
        self.close();
    }
}

/// Creates [`MemoryScopeWatch`]es on a shared store
#[derive(Debug, Clone)]
pub struct MemoryWatchFactory {
    store: Arc<MemoryCoordinationStore>,
    queue_size: usize,
}

impl MemoryWatchFactory {
    pub fn new(store: Arc<MemoryCoordinationStore>) -> Self {
        Self::with_config(store, &RegistryConfig::default())
    }

    pub fn with_config(
        store: Arc<MemoryCoordinationStore>,
        config: &RegistryConfig,
    ) -> Self {
        Self {
            store,
            queue_size: config.dispatch_queue_size,
        }
    }

    pub fn store(&self) -> &Arc<MemoryCoordinationStore> {
        &self.store
    }
}

impl ScopeWatchFactory for MemoryWatchFactory {
    fn create(
        &self,
        object_class: &str,
        scope: &Scope,
        listener: Arc<dyn ScopeWatchListener>,
    ) -> Box<dyn ScopeWatch> {
        Box::new(MemoryScopeWatch::new(
            Arc::clone(&self.store),
            object_class,
            scope,
            listener,
            self.queue_size,
        ))
    }
}
