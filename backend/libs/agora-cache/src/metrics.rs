//! Cache metrics for observability

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<CacheMetricsInner> = OnceLock::new();

struct CacheMetricsInner {
    hits: CounterVec,
    misses: CounterVec,
    writes: CounterVec,
    deletes: CounterVec,
    errors: CounterVec,
}

impl CacheMetricsInner {
    fn new() -> Self {
        Self {
            hits: CounterVec::new(
                Opts::new("agora_cache_hits_total", "Total cache hits"),
                &["store"],
            )
            .expect("valid metric definition"),
            misses: CounterVec::new(
                Opts::new("agora_cache_misses_total", "Total cache misses"),
                &["store"],
            )
            .expect("valid metric definition"),
            writes: CounterVec::new(
                Opts::new("agora_cache_writes_total", "Total cache writes"),
                &["store"],
            )
            .expect("valid metric definition"),
            deletes: CounterVec::new(
                Opts::new("agora_cache_deletes_total", "Total cache deletes"),
                &["store"],
            )
            .expect("valid metric definition"),
            errors: CounterVec::new(
                Opts::new(
                    "agora_cache_errors_total",
                    "Backend errors degraded to a miss or no-op",
                ),
                &["store", "op", "error_type"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.hits.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.deletes.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static CacheMetricsInner {
    METRICS.get_or_init(CacheMetricsInner::new)
}

/// Cache metrics wrapper, labelled by store (`cache`, `verifycode`, ...).
#[derive(Clone, Debug)]
pub struct CacheMetrics {
    store: &'static str,
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new("cache")
    }
}

impl CacheMetrics {
    pub fn new(store: &'static str) -> Self {
        Self { store }
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_hit(&self) {
        get_metrics().hits.with_label_values(&[self.store]).inc();
    }

    pub fn record_miss(&self) {
        get_metrics().misses.with_label_values(&[self.store]).inc();
    }

    pub fn record_write(&self) {
        get_metrics().writes.with_label_values(&[self.store]).inc();
    }

    pub fn record_delete(&self) {
        get_metrics().deletes.with_label_values(&[self.store]).inc();
    }

    pub fn record_error(&self, op: &str, error_type: &str) {
        get_metrics()
            .errors
            .with_label_values(&[self.store, op, error_type])
            .inc();
    }
}
