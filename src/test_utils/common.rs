use std::time::Duration;
use std::time::Instant;

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

use crate::EndpointDescription;

/// Route this thread's `tracing` output to the test writer.
///
/// Thread-scoped: `traced_test` owns the global subscriber.
pub fn enable_logger() -> DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    tracing::subscriber::set_default(subscriber)
}

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

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

pub fn endpoint(
    id: &str,
    interface: &str,
) -> EndpointDescription {
    EndpointDescription::new(id, vec![interface.to_string()])
}
