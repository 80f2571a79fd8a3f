use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

/// Payload of the `load` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSpec {
    pub model_path: String,
    pub model_name: String,
    pub handler: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub batch_size: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub gpu: Option<u32>,
}

/// Payload of the `unload` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnloadSpec {
    #[serde(rename = "model-name")]
    pub model_name: String,
}

/// Frontends send optional numeric fields either as numbers or as decimal strings.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a non-negative integer, got {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a non-negative integer, got {s:?}"))),
        Some(other) => Err(de::Error::custom(format!(
            "expected a non-negative integer, got {other}"
        ))),
    }
}
