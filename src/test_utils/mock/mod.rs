//! Hand-written test doubles for the discovery collaborators.
//!
//! [mockall] automocks (`MockScopeWatch`, `MockScopeWatchFactory`,
//! `MockSubscriberResolver`, `MockFilterMatcher`) cover strict call
//! expectations. The doubles here are for scenarios that need state across
//! threads:
//!
//! - [`RecordingWatchFactory`] counts `start`/`close` per watch and lets a test
//!   fire watch callbacks for a scope, like a coordination store would
//! - [`TestResolver`] resolves handles to registered services and counts every
//!   resolve and release
//! - [`RecordingListener`] records delivered events, or fails/panics on demand
//!
//! [mockall]: https://docs.rs/mockall/latest/mockall/

mod recording_listener;
mod recording_watch;
mod test_resolver;

pub use recording_listener::*;
pub use recording_watch::*;
pub use test_resolver::*;
