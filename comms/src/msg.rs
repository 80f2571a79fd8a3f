use std::io;

use serde_json::Value;

use crate::{Deserialize, Serialize};

/// A command sent by the frontend.
///
/// The command name is kept as received; dispatch is the worker's concern.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Request {
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

impl Request {
    pub fn new(command: impl Into<String>, payload: Value) -> Self {
        Self {
            command: command.into(),
            payload,
        }
    }
}

/// The reply to a single `Request`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Response {
    pub code: u32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Value>,
}

impl Response {
    pub fn new(code: u32, message: impl Into<String>, predictions: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            predictions,
        }
    }
}

fn invalid_data(err: serde_json::Error) -> io::Error {
    // `From<serde_json::Error>` maps truncated bodies to `UnexpectedEof`, which
    // receivers read as a closed stream. A bad body is always `InvalidData`.
    io::Error::new(io::ErrorKind::InvalidData, err)
}

impl Serialize for Request {
    fn serialize(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        serde_json::to_writer(buf, self).map_err(invalid_data)
    }
}

impl Deserialize for Request {
    fn deserialize(buf: &[u8]) -> io::Result<Self> {
        serde_json::from_slice(buf).map_err(invalid_data)
    }
}

impl Serialize for Response {
    fn serialize(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        serde_json::to_writer(buf, self).map_err(invalid_data)
    }
}

impl Deserialize for Response {
    fn deserialize(buf: &[u8]) -> io::Result<Self> {
        serde_json::from_slice(buf).map_err(invalid_data)
    }
}
