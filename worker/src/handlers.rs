//! The predict, load and unload command handlers.
//!
//! Handlers never let a collaborator failure escape unmapped: every error
//! leaving this module is a `WorkerError` carrying a taxonomy code.

use std::{num::NonZeroUsize, path::PathBuf};

use log::{debug, info};
use serde_json::{Value, json};

use crate::{
    error::{ErrorCode, Result, ServiceError, WorkerError},
    inference,
    loader::ModelLoader,
    metrics,
    service_manager::{ModelRegistration, ServiceRegistry},
    validate,
};

/// Status reported for every successful command.
pub const STATUS_OK: u32 = 200;

/// Bounds on the number of requests a single predict call may carry.
///
/// The default only accepts single-request batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSizePolicy {
    min: NonZeroUsize,
    max: NonZeroUsize,
}

impl BatchSizePolicy {
    pub const SINGLE: Self = Self {
        min: NonZeroUsize::MIN,
        max: NonZeroUsize::MIN,
    };

    /// Returns `None` if `min > max`.
    pub fn new(min: NonZeroUsize, max: NonZeroUsize) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    /// # Errors
    /// Returns `UnsupportedPredictOperation` if `size` is outside the bounds.
    pub fn check(&self, size: usize) -> Result<()> {
        if size < self.min.get() || size > self.max.get() {
            return Err(WorkerError::new(
                ErrorCode::UnsupportedPredictOperation,
                format!("Invalid batch size {size}"),
            ));
        }

        Ok(())
    }
}

impl Default for BatchSizePolicy {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Executes decoded commands against the registry and the loader.
pub struct CommandHandlers<G, L> {
    registry: G,
    loader: L,
    batch_policy: BatchSizePolicy,
}

impl<G, L> CommandHandlers<G, L>
where
    G: ServiceRegistry,
    L: ModelLoader,
{
    pub fn new(registry: G, loader: L) -> Self {
        Self {
            registry,
            loader,
            batch_policy: BatchSizePolicy::default(),
        }
    }

    pub fn with_batch_policy(mut self, batch_policy: BatchSizePolicy) -> Self {
        self.batch_policy = batch_policy;
        self
    }

    pub fn registry(&self) -> &G {
        &self.registry
    }

    /// Runs inference for a `predict` payload.
    ///
    /// # Returns
    /// The encoded predictions together with the success message and status.
    ///
    /// # Errors
    /// * `InvalidPredictMessage` if the payload is malformed.
    /// * `ModelServiceNotLoaded` if the model is not registered.
    /// * `UnsupportedPredictOperation` if the batch size breaks the policy.
    /// * Registry and model service errors, mapped.
    pub fn predict(&mut self, payload: &Value) -> Result<(Value, String, u32)> {
        let spec = validate::predict_msg(payload)
            .map_err(|e| WorkerError::new(ErrorCode::InvalidPredictMessage, e.to_string()))?;
        let model_name = spec.model_name.as_str();

        let not_loaded = || {
            WorkerError::new(
                ErrorCode::ModelServiceNotLoaded,
                format!("Model {model_name} is currently not loaded"),
            )
        };

        let service = match self.registry.get(model_name) {
            Ok(Some(service)) => service,
            Ok(None) | Err(ServiceError::Missing(_)) => return Err(not_loaded()),
            Err(e) => return Err(unknown(e)),
        };

        self.batch_policy.check(spec.request_batch.len())?;

        let prepared = inference::retrieve_data_for_inference(Some(spec.request_batch.as_slice()))
            .map_err(unknown)?;
        debug!(
            model = model_name,
            valid = prepared.batch.len(),
            invalid = prepared.invalid_requests.len();
            "running inference"
        );

        service.metrics_init(model_name, &prepared.request_ids);
        let predictions = service.inference(&prepared.batch).map_err(unknown)?;
        metrics::emit_metrics(service.metrics_store());

        let response = json!({
            "predictions": predictions,
            "requestIds": prepared.request_ids,
            "invalidRequests": prepared.invalid_requests,
        });

        Ok((response, "Prediction success".to_string(), STATUS_OK))
    }

    /// Loads and registers a model for a `load` payload.
    ///
    /// # Errors
    /// * `InvalidLoadMessage` if the payload is malformed.
    /// * `ValueErrorWhileLoading` if the loader or registry rejects a value.
    /// * `UnknownExceptionWhileLoading` for any other loading failure.
    pub fn load_model(&mut self, payload: &Value) -> Result<(String, u32)> {
        let spec = validate::load_msg(payload)
            .map_err(|e| WorkerError::new(ErrorCode::InvalidLoadMessage, e.to_string()))?;

        let model_path = PathBuf::from(&spec.model_path);
        let (manifest, entry_point) = self
            .loader
            .load(&model_path, &spec.handler)
            .map_err(loading_error)?;

        let message = format!("loaded model {entry_point}");
        let registration = ModelRegistration {
            name: spec.model_name,
            model_path,
            manifest,
            entry_point,
            gpu: spec.gpu,
            batch_size: spec.batch_size,
        };

        self.registry
            .register_and_load(registration)
            .map_err(loading_error)?;

        info!("{message}");
        Ok((message, STATUS_OK))
    }

    /// Unregisters the model named by an `unload` payload.
    ///
    /// # Errors
    /// * `InvalidUnloadMessage` if the payload is malformed.
    /// * `ModelCurrentlyNotLoaded` if the model is not registered.
    /// * `UnknownException` for any other registry failure.
    pub fn unload_model(&mut self, payload: &Value) -> Result<(String, u32)> {
        let spec = validate::unload_msg(payload)
            .map_err(|e| WorkerError::new(ErrorCode::InvalidUnloadMessage, e.to_string()))?;

        match self.registry.unload(&spec.model_name) {
            Ok(()) => Ok((format!("Unloaded model {}", spec.model_name), STATUS_OK)),
            Err(ServiceError::Missing(_)) => Err(WorkerError::new(
                ErrorCode::ModelCurrentlyNotLoaded,
                "Model is not being served on model server",
            )),
            Err(e) => Err(unknown(e)),
        }
    }
}

fn unknown(err: ServiceError) -> WorkerError {
    match err {
        ServiceError::Worker(e) => e,
        other => WorkerError::new(ErrorCode::UnknownException, format!("Unknown error {other}")),
    }
}

fn loading_error(err: ServiceError) -> WorkerError {
    match err {
        ServiceError::Worker(e) => e,
        ServiceError::Invalid(msg) => WorkerError::new(ErrorCode::ValueErrorWhileLoading, msg),
        other => WorkerError::new(ErrorCode::UnknownExceptionWhileLoading, other.to_string()),
    }
}
