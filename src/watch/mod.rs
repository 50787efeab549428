//! Scope watch contract
//!
//! A scope watch observes one coordination-store path (derived from an
//! interface name) on behalf of one scope and reports endpoints appearing
//! and disappearing under it. The registry owns every watch it creates:
//!
//! ```text
//! InterestRegistry::add_interest()
//!        │ ScopeWatchFactory::create(object_class, scope, listener)
//!        ▼
//! ┌─────────────────┐   on_endpoint_added / on_endpoint_removed
//! │   ScopeWatch    │ ──────────────────────────────────────────▶ ScopeNotifier
//! │ (own threads)   │                                            (fan-out, no
//! └─────────────────┘                                             registry lock)
//!        ▲
//!        │ start() once after create, close() once at teardown
//! InterestRegistry
//! ```
//!
//! Callbacks for one watch are expected to arrive serialized; callbacks of
//! different watches may run concurrently.

mod memory;
pub use memory::*;


use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::EndpointDescription;
use crate::Result;
use crate::Scope;

/// Callback capability handed to a scope watch
pub trait ScopeWatchListener: Send + Sync {
    fn on_endpoint_added(
        &self,
        endpoint: &EndpointDescription,
        scope: &Scope,
    );

    fn on_endpoint_removed(
        &self,
        endpoint: &EndpointDescription,
        scope: &Scope,
    );
}

#[cfg_attr(test, automock)]
pub trait ScopeWatch: Send + Sync {
    /// Begin watching. Fails when the coordination store cannot be reached.
    fn start(&mut self) -> Result<()>;

    /// Stop watching and release coordination-store resources.
    fn close(&mut self);
}

#[cfg_attr(test, automock)]
pub trait ScopeWatchFactory: Send + Sync + 'static {
    fn create(
        &self,
        object_class: &str,
        scope: &Scope,
        listener: Arc<dyn ScopeWatchListener>,
    ) -> Box<dyn ScopeWatch>;
}

/// Coordination-store path under which endpoints of `object_class` live.
///
/// `coordination_path("/discovery/service_registry", "org.example.Greeter")`
/// yields `/discovery/service_registry/org/example/Greeter`.
pub fn coordination_path(
    root: &str,
    object_class: &str,
) -> String {
    let root = root.trim_end_matches('/');
    let relative = object_class.trim_matches('.').replace('.', "/");
    if relative.is_empty() {
        root.to_string()
    } else {
        format!("{}/{}", root, relative)
    }
}
