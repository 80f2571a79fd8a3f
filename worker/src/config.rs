use std::{env, fmt, str::FromStr, time::Duration};

use crate::error::{ErrorCode, Result, WorkerError};

/// How long the worker waits for the frontend's first connection.
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_HOST: &str = "127.0.0.1";

/// Transport the worker listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    Unix,
    Tcp,
}

impl FromStr for SocketKind {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("unix") {
            Ok(Self::Unix)
        } else if s.eq_ignore_ascii_case("tcp") {
            Ok(Self::Tcp)
        } else {
            Err(WorkerError::new(
                ErrorCode::IncompleteData,
                format!("Unsupported socket type: {s}"),
            ))
        }
    }
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => f.write_str("unix"),
            Self::Tcp => f.write_str("tcp"),
        }
    }
}

/// Immutable listening configuration for a worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    kind: SocketKind,
    address: String,
    host: Option<String>,
    port: Option<u16>,
    debug: bool,
    accept_timeout: Duration,
}

impl WorkerConfig {
    /// Creates a new worker configuration.
    ///
    /// # Args
    /// * `kind` - Transport to listen on.
    /// * `address` - Socket path for `Unix`, port (unless `port` is given) for `Tcp`.
    ///
    /// # Returns
    /// A `WorkerConfig` with no host/port override, debug disabled and the default accept timeout.
    pub fn new(kind: SocketKind, address: impl Into<String>) -> Self {
        Self {
            kind,
            address: address.into(),
            host: None,
            port: None,
            debug: false,
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// In debug mode the worker keeps accepting connections instead of exiting after one.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Reads the configuration from the process environment.
    ///
    /// * `SOCK_TYPE` - `unix` (default) or `tcp`.
    /// * `SOCK_NAME` - required, the socket path or port.
    /// * `HOST`, `PORT` - optional TCP overrides.
    /// * `WORKER_DEBUG` - `1`/`true` enables debug mode.
    /// * `ACCEPT_TIMEOUT_SECS` - first accept timeout.
    ///
    /// # Errors
    /// Returns `IncompleteData` if a variable is missing or unparsable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let kind = match lookup("SOCK_TYPE") {
            Some(raw) => raw.parse()?,
            None => SocketKind::Unix,
        };

        let address = lookup("SOCK_NAME").ok_or_else(incomplete)?;
        let mut cfg = Self::new(kind, address);

        if let Some(host) = lookup("HOST") {
            cfg = cfg.with_host(host);
        }

        if let Some(port) = lookup("PORT") {
            cfg = cfg.with_port(parse_var("PORT", &port)?);
        }

        if let Some(debug) = lookup("WORKER_DEBUG") {
            cfg = cfg.with_debug(matches!(debug.trim(), "1" | "true" | "TRUE" | "yes"));
        }

        if let Some(secs) = lookup("ACCEPT_TIMEOUT_SECS") {
            let secs: u64 = parse_var("ACCEPT_TIMEOUT_SECS", &secs)?;
            cfg = cfg.with_accept_timeout(Duration::from_secs(secs));
        }

        Ok(cfg)
    }

    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the TCP host, falling back to the loopback address.
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn accept_timeout(&self) -> Duration {
        self.accept_timeout
    }
}

fn incomplete() -> WorkerError {
    WorkerError::new(ErrorCode::IncompleteData, "Incomplete data provided")
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        WorkerError::new(
            ErrorCode::IncompleteData,
            format!("Invalid value for {key}: {raw}"),
        )
    })
}
