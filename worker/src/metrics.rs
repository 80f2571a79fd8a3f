use std::time::Duration;

use log::info;

/// A single measurement recorded by a model service during one predict call.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub unit: &'static str,
}

/// Per-call metrics accumulator owned by a model service.
///
/// It is reset by `ModelService::metrics_init` before every inference and
/// flushed through `emit_metrics` afterwards.
#[derive(Debug, Default, Clone)]
pub struct MetricsStore {
    model_name: String,
    request_ids: Vec<String>,
    metrics: Vec<Metric>,
}

impl MetricsStore {
    /// Drops previously recorded metrics and rescopes the store.
    pub fn reset<'a>(&mut self, model_name: &str, request_ids: impl IntoIterator<Item = &'a String>) {
        self.model_name.clear();
        self.model_name.push_str(model_name);
        self.request_ids = request_ids.into_iter().cloned().collect();
        self.metrics.clear();
    }

    #[inline]
    pub fn add_time(&mut self, name: impl Into<String>, elapsed: Duration) {
        self.push(name, elapsed.as_secs_f64() * 1_000.0, "ms");
    }

    #[inline]
    pub fn add_counter(&mut self, name: impl Into<String>, count: usize) {
        self.push(name, count as f64, "count");
    }

    fn push(&mut self, name: impl Into<String>, value: f64, unit: &'static str) {
        self.metrics.push(Metric {
            name: name.into(),
            value,
            unit,
        });
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Metrics sink: writes every recorded metric as a log line.
///
/// Emission never fails and never affects the predict response.
pub fn emit_metrics(store: &MetricsStore) {
    let request_ids = store.request_ids.join(",");

    for metric in store.metrics() {
        info!(
            "[METRICS]{}.{}:{}|#ModelName:{},RequestIds:{}",
            metric.name,
            metric.unit,
            metric.value,
            store.model_name(),
            request_ids,
        );
    }
}
