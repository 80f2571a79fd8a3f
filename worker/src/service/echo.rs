use std::time::Instant;

use serde_json::Value;

use crate::{
    error::ServiceError,
    inference::InputBatch,
    metrics::MetricsStore,
    service_manager::{ModelRegistration, ServiceFactory},
};

use super::ModelService;

/// A model service that answers every request with its own decoded inputs.
///
/// Used by the worker binary when no real backend is linked in, and handy to
/// smoke test a frontend against a live worker.
#[derive(Debug, Default)]
pub struct EchoService {
    metrics: MetricsStore,
}

impl ModelService for EchoService {
    fn inference(&mut self, batch: &InputBatch) -> Result<Value, ServiceError> {
        let start = Instant::now();
        let predictions = serde_json::to_value(batch).map_err(anyhow::Error::from)?;

        self.metrics.add_counter("Requests", batch.len());
        self.metrics.add_time("PredictionTime", start.elapsed());
        Ok(predictions)
    }

    fn metrics_store(&self) -> &MetricsStore {
        &self.metrics
    }

    fn metrics_store_mut(&mut self) -> &mut MetricsStore {
        &mut self.metrics
    }
}

/// Builds an `EchoService` for every registration.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoFactory;

impl ServiceFactory for EchoFactory {
    fn create(&self, _registration: &ModelRegistration) -> Result<Box<dyn ModelService>, ServiceError> {
        Ok(Box::new(EchoService::default()))
    }
}
