use std::{error::Error, fmt};

use serde::{Serialize, Serializer};

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Stable error codes reported to the frontend.
///
/// The numeric values are part of the wire protocol, never renumber them.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidPredictInput = 1000,
    InvalidPredictMessage = 1001,
    InvalidLoadMessage = 1002,
    InvalidUnloadMessage = 1003,
    UnsupportedPredictOperation = 1004,
    UnknownCommand = 1005,

    ModelServiceNotLoaded = 2000,
    ModelCurrentlyNotLoaded = 2001,
    ValueErrorWhileLoading = 2002,
    UnknownExceptionWhileLoading = 2003,

    SocketError = 3000,
    SocketBindError = 3001,
    SocketInUse = 3002,
    SendMsgFail = 3003,
    SendFailsExceedsLimits = 3004,
    ConnectionClosed = 3005,

    IncompleteData = 4000,

    UnknownException = 5000,
}

impl ErrorCode {
    /// Returns the wire value of the code.
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::InvalidPredictInput => "InvalidPredictInput",
            Self::InvalidPredictMessage => "InvalidPredictMessage",
            Self::InvalidLoadMessage => "InvalidLoadMessage",
            Self::InvalidUnloadMessage => "InvalidUnloadMessage",
            Self::UnsupportedPredictOperation => "UnsupportedPredictOperation",
            Self::UnknownCommand => "UnknownCommand",
            Self::ModelServiceNotLoaded => "ModelServiceNotLoaded",
            Self::ModelCurrentlyNotLoaded => "ModelCurrentlyNotLoaded",
            Self::ValueErrorWhileLoading => "ValueErrorWhileLoading",
            Self::UnknownExceptionWhileLoading => "UnknownExceptionWhileLoading",
            Self::SocketError => "SocketError",
            Self::SocketBindError => "SocketBindError",
            Self::SocketInUse => "SocketInUse",
            Self::SendMsgFail => "SendMsgFail",
            Self::SendFailsExceedsLimits => "SendFailsExceedsLimits",
            Self::ConnectionClosed => "ConnectionClosed",
            Self::IncompleteData => "IncompleteData",
            Self::UnknownException => "UnknownException",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_u32())
    }
}

/// A structured worker failure: always convertible into a wire response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerError {
    code: ErrorCode,
    message: String,
}

impl WorkerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Error for WorkerError {}

/// Failures raised by the worker's collaborators (loader, registry, model services).
///
/// Command handlers map each variant onto the nearest `ErrorCode`.
#[derive(Debug)]
pub enum ServiceError {
    /// The collaborator rejected a value (bad manifest, bad handler, bad input).
    Invalid(String),
    /// A lookup missed.
    Missing(String),
    /// Already structured, passed through as is.
    Worker(WorkerError),
    /// Anything else.
    Other(anyhow::Error),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid value: {msg}"),
            Self::Missing(what) => write!(f, "not found: {what}"),
            Self::Worker(e) => write!(f, "{e}"),
            Self::Other(e) => write!(f, "{e:#}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Worker(e) => Some(e),
            Self::Other(e) => Some(&**e),
            _ => None,
        }
    }
}

impl From<WorkerError> for ServiceError {
    fn from(value: WorkerError) -> Self {
        Self::Worker(value)
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value)
    }
}
