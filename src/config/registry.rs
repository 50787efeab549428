use serde::Deserialize;
use serde::Serialize;

/// Interest registry and fan-out settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Contain panics raised by subscriber callbacks instead of letting them
    /// unwind into the watch's callback thread
    #[serde(default = "default_isolate_listener_panics")]
    pub isolate_listener_panics: bool,

    /// Bound of each in-memory watch's event queue (0 = unbounded)
    ///
    /// When the queue is full new events are dropped with a warning.
    #[serde(default = "default_dispatch_queue_size")]
    pub dispatch_queue_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            isolate_listener_panics: default_isolate_listener_panics(),
            dispatch_queue_size: default_dispatch_queue_size(),
        }
    }
}

fn default_isolate_listener_panics() -> bool {
    true
}

fn default_dispatch_queue_size() -> usize {
    1000
}
