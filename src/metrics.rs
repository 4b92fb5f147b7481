#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use opentelemetry::{
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics::SdkMeterProvider;
#[cfg(feature = "metrics")]
use prometheus::{proto::MetricFamily, Registry, TextEncoder};

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<SearchMetrics> = Lazy::new(SearchMetrics::init);

#[cfg(feature = "metrics")]
pub struct SearchMetrics {
    pub registry: Registry,
    pub provider: SdkMeterProvider,
    pub queries_total: Counter<u64>,
    pub query_duration: Histogram<f64>,
    pub failures_total: Counter<u64>,
    pub fetches_total: Counter<u64>,
}

#[cfg(feature = "metrics")]
impl SearchMetrics {
    pub fn init() -> Self {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .expect("failed to build prometheus exporter");
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("lifeguard_search");

        let queries_total = meter.u64_counter("lifeguard_search_queries_total")
            .with_description("Total backend searches issued").build();

        let query_duration = meter.f64_histogram("lifeguard_search_query_duration_seconds")
            .with_description("Duration of backend searches").build();

        let failures_total = meter.u64_counter("lifeguard_search_failures_total")
            .with_description("Searches that failed and cleared the criteria cache").build();

        let fetches_total = meter.u64_counter("lifeguard_search_fetches_total")
            .with_description("Records materialised from the document store").build();

        Self {
            registry,
            provider,
            queries_total,
            query_duration,
            failures_total,
            fetches_total,
        }
    }

    /// Current metric families, for a `/metrics` handler
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Current metrics in the Prometheus text format
    ///
    /// # Errors
    ///
    /// Propagates encoder failures from `prometheus`.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.gather())
    }

    pub fn record_search(&self, collection: &str, elapsed: std::time::Duration, ok: bool) {
        let labels = [
            KeyValue::new("collection", collection.to_string()),
            KeyValue::new("status", if ok { "ok" } else { "error" }),
        ];
        self.queries_total.add(1, &labels);
        self.query_duration.record(elapsed.as_secs_f64(), &labels);
    }

    pub fn record_failure(&self, collection: &str) {
        self.failures_total
            .add(1, &[KeyValue::new("collection", collection.to_string())]);
    }

    pub fn record_fetch(&self, collection: &str, count: usize) {
        self.fetches_total
            .add(count as u64, &[KeyValue::new("collection", collection.to_string())]);
    }
}

/// Span builders for backend round-trips
#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    /// Span around one backend search
    pub fn search_span(collection: &str, selector: &str) -> Span {
        tracing::info_span!("lifeguard_search.search", collection = %collection, selector = %selector)
    }

    /// Span around one bulk record fetch
    pub fn fetch_span(collection: &str, ids: usize) -> Span {
        tracing::info_span!("lifeguard_search.fetch", collection = %collection, ids = ids as u64)
    }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;
    use crate::test_helpers::{MemoryStore, MockBackend};
    use crate::Searchable;
    use std::sync::Arc;

    #[test]
    fn test_searches_are_exported() {
        let store = Arc::new(MemoryStore::from_records([("1", "Joe".to_string())]));
        let people: Searchable<String> =
            Searchable::new("metrics_people", Arc::new(MockBackend::returning_ids(&["1"])), store);
        people.filter(("name", "Joe")).documents().unwrap();

        assert!(!METRICS.gather().is_empty());
        let text = METRICS.encode().unwrap();
        assert!(text.contains("lifeguard_search_queries_total"), "exported {text}");
        assert!(text.contains("metrics_people"));
        assert!(text.contains("lifeguard_search_fetches_total"));
    }
}
