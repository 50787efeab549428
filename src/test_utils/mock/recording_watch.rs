use std::collections::HashSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::DiscoveryError;
use crate::EndpointDescription;
use crate::Result;
use crate::Scope;
use crate::ScopeWatch;
use crate::ScopeWatchFactory;
use crate::ScopeWatchListener;

/// One watch created by a [`RecordingWatchFactory`]
#[derive(Clone)]
pub struct WatchRecord {
    pub scope: Scope,
    pub object_class: String,
    pub listener: Arc<dyn ScopeWatchListener>,
    starts: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl WatchRecord {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn is_live(&self) -> bool {
        self.starts() == 1 && self.closes() == 0
    }
}

struct RecordingWatch {
    scope: Scope,
    starts: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    failing: Arc<Mutex<HashSet<Scope>>>,
}

impl ScopeWatch for RecordingWatch {
    fn start(&mut self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().contains(&self.scope) {
            return Err(DiscoveryError::CoordinationUnavailable("connection refused".into()).into());
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Watch factory that records every watch it creates
#[derive(Default, Clone)]
pub struct RecordingWatchFactory {
    records: Arc<Mutex<Vec<WatchRecord>>>,
    failing: Arc<Mutex<HashSet<Scope>>>,
}

impl RecordingWatchFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `start()` fail for watches on `scope`.
    pub fn fail_start_for(
        &self,
        scope: &Scope,
    ) {
        self.failing.lock().insert(scope.clone());
    }

    pub fn allow_start_for(
        &self,
        scope: &Scope,
    ) {
        self.failing.lock().remove(scope);
    }

    pub fn records(&self) -> Vec<WatchRecord> {
        self.records.lock().clone()
    }

    pub fn records_for(
        &self,
        scope: &Scope,
    ) -> Vec<WatchRecord> {
        self.records.lock().iter().filter(|r| &r.scope == scope).cloned().collect()
    }

    pub fn created(&self) -> usize {
        self.records.lock().len()
    }

    pub fn live_watches(
        &self,
        scope: &Scope,
    ) -> usize {
        self.records_for(scope).iter().filter(|r| r.is_live()).count()
    }

    /// Listener of the live watch on `scope`, if any
    pub fn listener_for(
        &self,
        scope: &Scope,
    ) -> Option<Arc<dyn ScopeWatchListener>> {
        self.records_for(scope)
            .into_iter()
            .find(|r| r.is_live())
            .map(|r| r.listener)
    }

    /// Report `endpoint` as added under `scope` on the calling thread.
    pub fn fire_added(
        &self,
        scope: &Scope,
        endpoint: &EndpointDescription,
    ) {
        let listener = self.listener_for(scope).expect("no live watch for scope");
        listener.on_endpoint_added(endpoint, scope);
    }

    /// Report `endpoint` as removed under `scope` on the calling thread.
    pub fn fire_removed(
        &self,
        scope: &Scope,
        endpoint: &EndpointDescription,
    ) {
        let listener = self.listener_for(scope).expect("no live watch for scope");
        listener.on_endpoint_removed(endpoint, scope);
    }
}

impl ScopeWatchFactory for RecordingWatchFactory {
    fn create(
        &self,
        object_class: &str,
        scope: &Scope,
        listener: Arc<dyn ScopeWatchListener>,
    ) -> Box<dyn ScopeWatch> {
        let starts = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));

        self.records.lock().push(WatchRecord {
            scope: scope.clone(),
            object_class: object_class.to_string(),
            listener,
            starts: Arc::clone(&starts),
            closes: Arc::clone(&closes),
        });

        Box::new(RecordingWatch {
            scope: scope.clone(),
            starts,
            closes,
            failing: Arc::clone(&self.failing),
        })
    }
}
