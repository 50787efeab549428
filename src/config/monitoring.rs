use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

lazy_static! {
    static ref METRIC_PREFIX: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("prefix pattern is valid");
}

/// Prometheus collectors of the registry and fan-out.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    /// Register the discovery collectors at startup
    #[serde(default = "default_prometheus_enabled")]
    pub prometheus_enabled: bool,

    /// Prefix prepended to every collector name, e.g. `dengine` gives
    /// `dengine_discovery_active_scope_watches`
    #[serde(default)]
    pub metric_prefix: Option<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: default_prometheus_enabled(),
            metric_prefix: None,
        }
    }
}

impl MonitoringConfig {
    /// Validates monitoring configuration
    /// # Errors
    /// Returns `Error::InvalidConfig` when `metric_prefix` is not a valid
    /// Prometheus name
    pub fn validate(&self) -> Result<()> {
        if let Some(prefix) = &self.metric_prefix {
            if !METRIC_PREFIX.is_match(prefix) {
                return Err(Error::InvalidConfig(format!(
                    "metric_prefix {:?} is not a valid metric name prefix",
                    prefix
                )));
            }

            if !self.prometheus_enabled {
                tracing::warn!(%prefix, "metric_prefix configured but monitoring is disabled");
            }
        }

        Ok(())
    }
}

fn default_prometheus_enabled() -> bool {
    false
}
