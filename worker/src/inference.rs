//! Extraction of typed model inputs from raw predict requests.
//!
//! Every request is extracted on its own: one bad request ends up in the
//! invalid set and never aborts the rest of the batch.

use std::collections::{BTreeMap, HashSet};

use base64::{Engine as _, engine::general_purpose};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{ErrorCode, ServiceError, WorkerError},
    validate,
};

/// A decoded model input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InputValue {
    Text(String),
    Json(Value),
    Bytes(Vec<u8>),
}

/// The named inputs of one request.
pub type ModelInputs = BTreeMap<String, InputValue>;

/// Inputs of every request that was extracted successfully, in batch order.
pub type InputBatch = Vec<ModelInputs>;

/// Request id to position in the `InputBatch`.
pub type RequestIdMap = BTreeMap<String, usize>;

/// Request id to the code of the error that rejected it.
pub type InvalidRequestSet = BTreeMap<String, ErrorCode>;

/// The outcome of extracting a raw batch.
///
/// Every request of the raw batch is either in `request_ids` or in
/// `invalid_requests`, never both.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PreparedBatch {
    pub batch: InputBatch,
    pub request_ids: RequestIdMap,
    pub invalid_requests: InvalidRequestSet,
}

impl PreparedBatch {
    /// Number of raw requests this batch accounts for.
    pub fn len(&self) -> usize {
        self.batch.len() + self.invalid_requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Verbatim,
    Base64,
}

impl Encoding {
    fn parse(hint: Option<&str>) -> Result<Self, WorkerError> {
        match hint.map(str::trim) {
            None => Ok(Self::Verbatim),
            Some(h) if h.is_empty() || h.eq_ignore_ascii_case("none") => Ok(Self::Verbatim),
            Some(h) if h.eq_ignore_ascii_case("utf-8") || h.eq_ignore_ascii_case("utf8") => {
                Ok(Self::Verbatim)
            }
            Some(h) if h.eq_ignore_ascii_case("base64") => Ok(Self::Base64),
            Some(h) => Err(invalid_input(format!("Unsupported encoding {h}"))),
        }
    }
}

fn invalid_input(message: impl Into<String>) -> WorkerError {
    WorkerError::new(ErrorCode::InvalidPredictInput, message)
}

/// Splits a raw predict batch into the inputs to run and the requests to reject.
///
/// # Args
/// * `requests` - The raw `requestBatch` items.
///
/// # Returns
/// The prepared batch, see `PreparedBatch`.
///
/// # Errors
/// Returns `ServiceError::Invalid` if `requests` is `None`.
pub fn retrieve_data_for_inference(requests: Option<&[Value]>) -> Result<PreparedBatch, ServiceError> {
    let requests =
        requests.ok_or_else(|| ServiceError::Invalid("Received invalid inputs".to_string()))?;

    let mut prepared = PreparedBatch::default();
    // Every key handed out to either map, real ids and positional ones alike.
    let mut used = HashSet::new();

    for (index, raw) in requests.iter().enumerate() {
        let extracted = retrieve_request(raw).and_then(|(id, inputs)| {
            if used.contains(&id) {
                Err(invalid_input(format!("Duplicate request id {id}")))
            } else {
                Ok((id, inputs))
            }
        });

        match extracted {
            Ok((request_id, inputs)) => {
                debug!(request_id = request_id.as_str(), position = prepared.batch.len(); "request extracted");
                used.insert(request_id.clone());
                prepared.request_ids.insert(request_id, prepared.batch.len());
                prepared.batch.push(inputs);
            }
            Err(e) => {
                let key = match raw_request_id(raw) {
                    Some(id) if !used.contains(id) => id.to_string(),
                    _ => positional_key(index, &used),
                };
                warn!("rejecting request {key}: {e}");
                used.insert(key.clone());
                prepared.invalid_requests.insert(key, e.code());
            }
        }
    }

    Ok(prepared)
}

/// `#<index>`, suffixed until it collides with no key already in use.
fn positional_key(index: usize, used: &HashSet<String>) -> String {
    let base = format!("#{index}");
    if !used.contains(&base) {
        return base;
    }

    let mut n = 1;
    loop {
        let key = format!("{base}~{n}");
        if !used.contains(&key) {
            return key;
        }
        n += 1;
    }
}

fn raw_request_id(raw: &Value) -> Option<&str> {
    raw.get("requestId")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
}

fn retrieve_request(raw: &Value) -> Result<(String, ModelInputs), WorkerError> {
    let request = validate::predict_data(raw).map_err(|e| invalid_input(e.to_string()))?;
    let encoding = Encoding::parse(request.encoding.as_deref())?;
    let inputs = retrieve_model_input(&request.model_inputs, encoding)?;

    Ok((request.request_id, inputs))
}

fn retrieve_model_input(raw_inputs: &[Value], encoding: Encoding) -> Result<ModelInputs, WorkerError> {
    let mut inputs = ModelInputs::new();

    for raw in raw_inputs {
        let input = validate::predict_input(raw).map_err(|e| invalid_input(e.to_string()))?;
        let value = decode_value(input.content_type.as_deref(), encoding, input.value)
            .map_err(|e| invalid_input(format!("Input {}: {e}", input.name)))?;

        if inputs.insert(input.name.clone(), value).is_some() {
            return Err(invalid_input(format!("Duplicate input name {}", input.name)));
        }
    }

    Ok(inputs)
}

fn decode_value(content_type: Option<&str>, encoding: Encoding, value: Value) -> Result<InputValue, String> {
    let raw = match value {
        Value::String(s) => s,
        // Already structured, nothing to decode.
        other => return Ok(InputValue::Json(other)),
    };

    let bytes = match encoding {
        Encoding::Verbatim => raw.into_bytes(),
        Encoding::Base64 => general_purpose::STANDARD
            .decode(raw.trim())
            .map_err(|e| format!("invalid base64 value: {e}"))?,
    };

    let content_type = content_type.map(str::trim).unwrap_or_default().to_ascii_lowercase();

    if content_type == "application/json" {
        serde_json::from_slice(&bytes)
            .map(InputValue::Json)
            .map_err(|e| format!("invalid json value: {e}"))
    } else if content_type.is_empty() || content_type.starts_with("text/") || content_type == "application/text" {
        String::from_utf8(bytes)
            .map(InputValue::Text)
            .map_err(|e| format!("invalid utf-8 value: {e}"))
    } else {
        Ok(InputValue::Bytes(bytes))
    }
}
