use std::sync::Arc;

use arc_swap::ArcSwap;

use super::SubscriberHandle;

/// Copy-on-write set of subscriber handles for one scope.
///
/// Writers (always under the registry lock) publish a new vector; readers
/// take a snapshot that stays valid while the set keeps changing, so fan-out
/// can iterate it without holding any registry lock.
#[derive(Debug)]
pub struct SubscriberSet {
    members: ArcSwap<Vec<SubscriberHandle>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self {
            members: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Returns `false` if the handle was already a member.
    pub fn insert(
        &self,
        handle: SubscriberHandle,
    ) -> bool {
        let mut inserted = false;
        self.members.rcu(|current| {
            if current.contains(&handle) {
                inserted = false;
                Arc::clone(current)
            } else {
                inserted = true;
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend_from_slice(current);
                next.push(handle);
                Arc::new(next)
            }
        });
        inserted
    }

    /// Returns `false` if the handle was not a member.
    pub fn remove(
        &self,
        handle: SubscriberHandle,
    ) -> bool {
        let mut removed = false;
        self.members.rcu(|current| {
            removed = current.contains(&handle);
            if removed {
                Arc::new(current.iter().copied().filter(|h| *h != handle).collect())
            } else {
                Arc::clone(current)
            }
        });
        removed
    }

    pub fn contains(
        &self,
        handle: SubscriberHandle,
    ) -> bool {
        self.members.load().contains(&handle)
    }

    pub fn is_empty(&self) -> bool {
        self.members.load().is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.load().len()
    }

    /// Point-in-time view of the members
    pub fn snapshot(&self) -> Arc<Vec<SubscriberHandle>> {
        self.members.load_full()
    }
}

impl Default for SubscriberSet {
    fn default() -> Self {
        Self::new()
    }
}
