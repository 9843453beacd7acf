//! Telemetry sink
//!
//! A string-keyed registry of metric thunks. Components register closures
//! at construction time; each poll of a metric re-evaluates its closure.
//! The registry is an injected dependency, never a process-wide singleton,
//! and a disabled registry accepts registrations but drops them so callers
//! never have to branch on whether telemetry is on.
//!
//! The endpoint string identifies the external collector a deployment
//! scrapes the registry into; the registry itself only stores and dumps.

use parking_lot::Mutex;

type MetricFn = Box<dyn Fn() -> f64 + Send + Sync>;

/// String-keyed registry of polled metrics
///
/// # Example
///
/// ```
/// use omnicache_core::MetricRegistry;
///
/// let registry = MetricRegistry::new(true, "localhost:50051");
/// registry.register_metric("/oc/skiplist/length_", || 42.0);
/// let snapshot = registry.snapshot("/oc/");
/// assert_eq!(snapshot, vec![("/oc/skiplist/length_".to_string(), 42.0)]);
/// ```
pub struct MetricRegistry {
    enabled: bool,
    endpoint: String,
    metrics: Mutex<Vec<(String, MetricFn)>>,
}

impl MetricRegistry {
    /// Creates a registry; `endpoint` names the external collector
    pub fn new(enabled: bool, endpoint: impl Into<String>) -> Self {
        Self {
            enabled,
            endpoint: endpoint.into(),
            metrics: Mutex::new(Vec::new()),
        }
    }

    /// A registry that drops all registrations
    pub fn disabled() -> Self {
        Self::new(false, "")
    }

    /// True when registrations are retained
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The collector endpoint this registry was configured with
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Registers a metric under `name`; the thunk is re-evaluated per poll
    pub fn register_metric(
        &self,
        name: impl Into<String>,
        thunk: impl Fn() -> f64 + Send + Sync + 'static,
    ) {
        if !self.enabled {
            return;
        }
        self.metrics.lock().push((name.into(), Box::new(thunk)));
    }

    /// Polls every metric whose name starts with `prefix`
    pub fn snapshot(&self, prefix: &str) -> Vec<(String, f64)> {
        let metrics = self.metrics.lock();
        metrics
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, thunk)| (name.clone(), thunk()))
            .collect()
    }

    /// Logs every metric whose name starts with `prefix`
    pub fn dump_metric(&self, prefix: &str) {
        for (name, value) in self.snapshot(prefix) {
            log::info!("{}: {}", name, value);
        }
    }
}
