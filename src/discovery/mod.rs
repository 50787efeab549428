//! Interest registry and notification fan-out
//!
//! Subscribers register interest in scopes; the registry keeps one shared
//! scope watch per scope and fans every endpoint event reported by a watch
//! out to the subscribers whose scope filter matches the endpoint.
//!
//! ```text
//! SubscriptionTracker ──add/remove──▶ InterestRegistry ──create/start/close──▶ ScopeWatch
//!                                                                               │
//!        EndpointListener ◀──resolve/match/notify/release── ScopeNotifier ◀─────┘
//! ```

mod endpoint;
mod fanout;
mod interest_registry;
mod matcher;
mod scope;
mod subscriber;
mod subscriber_set;
mod tracker;

pub use endpoint::*;
pub use fanout::*;
pub use interest_registry::*;
pub use matcher::*;
pub use scope::*;
pub use subscriber::*;
pub use subscriber_set::*;
pub use tracker::*;
