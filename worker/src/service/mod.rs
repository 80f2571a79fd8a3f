//! The seam between the worker and the models it serves.

mod echo;

use serde_json::Value;

use crate::{
    error::ServiceError,
    inference::{InputBatch, RequestIdMap},
    metrics::MetricsStore,
};

pub use echo::{EchoFactory, EchoService};

/// A loaded model, owned by the service registry.
pub trait ModelService {
    /// Runs inference over a batch of already decoded inputs.
    ///
    /// # Returns
    /// The predictions, in batch order.
    fn inference(&mut self, batch: &InputBatch) -> Result<Value, ServiceError>;

    fn metrics_store(&self) -> &MetricsStore;

    fn metrics_store_mut(&mut self) -> &mut MetricsStore;

    /// Scopes the metrics store to the upcoming inference call.
    fn metrics_init(&mut self, model_name: &str, request_ids: &RequestIdMap) {
        self.metrics_store_mut().reset(model_name, request_ids.keys());
    }
}
