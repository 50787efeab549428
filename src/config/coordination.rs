use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Coordination store the scope watches connect to.
///
/// `root_path` applies to every store. `connect_string` and
/// `session_timeout_ms` are connection settings for a networked store client;
/// the in-process [`MemoryCoordinationStore`](crate::MemoryCoordinationStore)
/// has no connection and ignores them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CoordinationConfig {
    /// Comma separated `host:port` list of coordination servers
    #[serde(default = "default_connect_string")]
    pub connect_string: String,

    /// Path under which endpoints are published, one child per interface
    #[serde(default = "default_root_path")]
    pub root_path: String,

    /// Session timeout negotiated with the coordination servers
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            connect_string: default_connect_string(),
            root_path: default_root_path(),
            session_timeout_ms: default_session_timeout_ms(),
        }
    }
}

impl CoordinationConfig {
    /// Validates coordination configuration
    /// # Errors
    /// Returns `Error::InvalidConfig` when:
    /// - No coordination server is configured
    /// - `root_path` is relative or ends with `/`
    /// - `session_timeout_ms` is zero
    pub fn validate(&self) -> Result<()> {
        if self.connect_string.split(',').all(|s| s.trim().is_empty()) {
            return Err(Error::InvalidConfig("connect_string cannot be empty".into()));
        }

        if !self.root_path.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "root_path {} must be absolute",
                self.root_path
            )));
        }

        if self.root_path.len() > 1 && self.root_path.ends_with('/') {
            return Err(Error::InvalidConfig(format!(
                "root_path {} must not end with '/'",
                self.root_path
            )));
        }

        if self.session_timeout_ms == 0 {
            return Err(Error::InvalidConfig("session_timeout_ms must be greater than 0".into()));
        }

        Ok(())
    }
}

fn default_connect_string() -> String {
    "localhost:2181".to_string()
}

fn default_root_path() -> String {
    "/discovery/service_registry".to_string()
}

fn default_session_timeout_ms() -> u64 {
    3000
}
