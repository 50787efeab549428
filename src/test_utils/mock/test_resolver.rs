use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::SubscriberHandle;
use crate::SubscriberOwner;
use crate::SubscriberResolver;
use crate::SubscriberService;

#[derive(Default)]
struct ResolverState {
    services: HashMap<SubscriberHandle, Arc<dyn SubscriberService>>,
    owners: HashMap<SubscriberHandle, SubscriberOwner>,
    resolved: HashMap<SubscriberHandle, usize>,
    released: HashMap<SubscriberHandle, usize>,
}

/// Resolution service backed by a map, counting resolves and releases
#[derive(Default)]
pub struct TestResolver {
    state: Mutex<ResolverState>,
}

impl TestResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `service` for `handle`, owned by a unit named `owner`.
    pub fn register(
        &self,
        handle: SubscriberHandle,
        service: Arc<dyn SubscriberService>,
    ) {
        let mut state = self.state.lock();
        state.services.insert(handle, service);
        state
            .owners
            .insert(handle, SubscriberOwner::new(format!("owner-of-{}", handle.id())));
    }

    /// Subscriber object goes away; the handle no longer resolves.
    pub fn unregister(
        &self,
        handle: SubscriberHandle,
    ) {
        self.state.lock().services.remove(&handle);
    }

    /// Owning unit is torn down while the object still resolves.
    pub fn remove_owner(
        &self,
        handle: SubscriberHandle,
    ) {
        self.state.lock().owners.remove(&handle);
    }

    pub fn resolve_count(
        &self,
        handle: SubscriberHandle,
    ) -> usize {
        self.state.lock().resolved.get(&handle).copied().unwrap_or(0)
    }

    pub fn release_count(
        &self,
        handle: SubscriberHandle,
    ) -> usize {
        self.state.lock().released.get(&handle).copied().unwrap_or(0)
    }

    /// Successful resolves not yet released, over all handles
    pub fn outstanding(&self) -> usize {
        let state = self.state.lock();
        let resolved: usize = state.resolved.values().sum();
        let released: usize = state.released.values().sum();
        resolved - released
    }
}

impl SubscriberResolver for TestResolver {
    fn resolve(
        &self,
        handle: SubscriberHandle,
    ) -> Option<Arc<dyn SubscriberService>> {
        let mut state = self.state.lock();
        let service = state.services.get(&handle).cloned();
        if service.is_some() {
            *state.resolved.entry(handle).or_default() += 1;
        }
        service
    }

    fn owner(
        &self,
        handle: SubscriberHandle,
    ) -> Option<SubscriberOwner> {
        self.state.lock().owners.get(&handle).cloned()
    }

    fn release(
        &self,
        handle: SubscriberHandle,
    ) {
        *self.state.lock().released.entry(handle).or_default() += 1;
    }
}
