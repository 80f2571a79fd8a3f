//! Structural checks for incoming payloads.
//!
//! Validators only report what is wrong; choosing the error code is the
//! caller's job.

use std::fmt;

use comms::specs::{LoadSpec, ModelInputSpec, PredictSpec, RequestSpec, UnloadSpec};
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(String);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValidationError {}

type Result<T> = std::result::Result<T, ValidationError>;

fn parse<T: DeserializeOwned>(what: &str, payload: &Value) -> Result<T> {
    T::deserialize(payload).map_err(|e| ValidationError(format!("Invalid {what}: {e}")))
}

fn non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError(format!("Field {field} must not be empty")));
    }

    Ok(())
}

pub fn predict_msg(payload: &Value) -> Result<PredictSpec> {
    let spec: PredictSpec = parse("predict message", payload)?;
    non_empty("modelName", &spec.model_name)?;
    Ok(spec)
}

pub fn load_msg(payload: &Value) -> Result<LoadSpec> {
    let spec: LoadSpec = parse("load message", payload)?;
    non_empty("modelPath", &spec.model_path)?;
    non_empty("modelName", &spec.model_name)?;
    non_empty("handler", &spec.handler)?;
    Ok(spec)
}

pub fn unload_msg(payload: &Value) -> Result<UnloadSpec> {
    let spec: UnloadSpec = parse("unload message", payload)?;
    non_empty("model-name", &spec.model_name)?;
    Ok(spec)
}

/// Validates one request of a predict batch.
pub fn predict_data(request: &Value) -> Result<RequestSpec> {
    let spec: RequestSpec = parse("request", request)?;
    non_empty("requestId", &spec.request_id)?;

    if spec.model_inputs.is_empty() {
        return Err(ValidationError(format!(
            "Request {} has no model inputs",
            spec.request_id
        )));
    }

    Ok(spec)
}

/// Validates one named input of a request.
pub fn predict_input(input: &Value) -> Result<ModelInputSpec> {
    let spec: ModelInputSpec = parse("model input", input)?;
    non_empty("name", &spec.name)?;

    if spec.value.is_null() {
        return Err(ValidationError(format!("Input {} has no value", spec.name)));
    }

    Ok(spec)
}
