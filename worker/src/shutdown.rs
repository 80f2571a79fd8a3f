use std::fmt;

/// Exit status for failures that escape the server loop.
pub const UNCAUGHT_ERROR_EXIT_CODE: u8 = 1;

/// Terminal state of a worker process.
///
/// The supervising frontend tells these apart by exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The connection was served and ended; the worker exits cleanly.
    Served,
    /// No frontend connected before the accept timeout.
    NoFrontend,
    /// The connection stopped taking writes.
    SendFailsExceedsLimits,
}

impl Shutdown {
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Served => 0,
            Self::NoFrontend => 2,
            Self::SendFailsExceedsLimits => 3,
        }
    }
}

impl fmt::Display for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Served => f.write_str("connection served"),
            Self::NoFrontend => f.write_str("no frontend connected"),
            Self::SendFailsExceedsLimits => f.write_str("send failures exceeded the limit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            UNCAUGHT_ERROR_EXIT_CODE,
            Shutdown::Served.exit_code(),
            Shutdown::NoFrontend.exit_code(),
            Shutdown::SendFailsExceedsLimits.exit_code(),
        ];

        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
