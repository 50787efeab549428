use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Once;
use tracing::info;

use crate::Error;
use crate::MonitoringConfig;
use crate::Result;

lazy_static! {
    pub static ref ACTIVE_SCOPE_WATCHES_METRIC: IntGauge = IntGauge::new(
        "discovery_active_scope_watches",
        "Number of scope watches currently started"
    )
    .expect("metric can not be created");

    pub static ref WATCH_START_FAILURES_METRIC: IntCounter = IntCounter::new(
        "discovery_watch_start_failures",
        "Scope watches that failed to start"
    )
    .expect("metric can not be created");

    pub static ref NOTIFICATIONS_DELIVERED_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "discovery_notifications_delivered",
            "Endpoint notifications delivered to subscribers"
        ),
        &["event"]
    )
    .expect("metric can not be created");

    pub static ref NOTIFICATIONS_SKIPPED_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "discovery_notifications_skipped",
            "Subscribers skipped during fan-out"
        ),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref LISTENER_FAILURES_METRIC: IntCounter = IntCounter::new(
        "discovery_listener_failures",
        "Endpoint listener callbacks that returned an error or panicked"
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

/// Registers the discovery collectors into `registry`.
///
/// Panics if any of them is already registered there.
pub fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(ACTIVE_SCOPE_WATCHES_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WATCH_START_FAILURES_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(NOTIFICATIONS_DELIVERED_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(NOTIFICATIONS_SKIPPED_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(LISTENER_FAILURES_METRIC.clone()))
        .expect("collector can be registered");
}

/// Registers the collectors into the crate-wide [`REGISTRY`] once.
pub fn init_metrics() {
    REGISTER.call_once(|| register_custom_metrics(&REGISTRY));
}

/// Builds a registry holding the discovery collectors, named after
/// `config.metric_prefix`.
///
/// Returns `None` when Prometheus export is disabled.
pub fn registry_from_config(config: &MonitoringConfig) -> Result<Option<Registry>> {
    if !config.prometheus_enabled {
        return Ok(None);
    }

    let registry = Registry::new_custom(config.metric_prefix.clone(), None)
        .map_err(|e| Error::InvalidConfig(format!("metric registry: {}", e)))?;
    register_custom_metrics(&registry);

    info!(prefix = ?config.metric_prefix, "Discovery metrics registered");
    Ok(Some(registry))
}
