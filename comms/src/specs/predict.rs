use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of the `predict` command.
///
/// Batch items are kept raw so a malformed request can be isolated without
/// failing the whole envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictSpec {
    pub model_name: String,
    pub request_batch: Vec<Value>,
}

/// A single inference request inside a predict batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    pub request_id: String,
    #[serde(default)]
    pub encoding: Option<String>,
    pub model_inputs: Vec<Value>,
}

/// A single named input of a `RequestSpec`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInputSpec {
    #[serde(default)]
    pub content_type: Option<String>,
    pub name: String,
    pub value: Value,
}
