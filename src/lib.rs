//! Subscription and fan-out core of a service discovery layer.
//!
//! Subscribers express interest in scopes (filter expressions over remote
//! endpoint properties). The [`InterestRegistry`] keeps exactly one
//! [`ScopeWatch`] per scope against the coordination store and forwards every
//! endpoint added/removed event to the subscribers whose scope matches.
//!
//! ```ignore
//! use std::sync::Arc;
//! use d_engine_discovery::*;
//!
//! let store = Arc::new(MemoryCoordinationStore::new("/discovery/service_registry"));
//! let registry = Arc::new(InterestRegistry::new(
//!     Arc::new(MemoryWatchFactory::new(store.clone())),
//!     resolver,          // Arc<dyn SubscriberResolver>
//!     Arc::new(matcher), // Arc<dyn FilterMatcher>
//! ));
//!
//! let tracker = SubscriptionTracker::new(registry.clone());
//! tracker.subscriber_added(
//!     SubscriberHandle::new(1),
//!     &[Scope::new("(&(objectClass=org.example.Greeter)(lang=en))")],
//! )?;
//!
//! store.publish(EndpointDescription::new("http://host:9000/greeter", vec!["org.example.Greeter".into()]));
//! ```

mod config;
mod discovery;
mod errors;
pub mod metrics;
mod watch;

pub use config::*;
pub use discovery::*;
pub use errors::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils
