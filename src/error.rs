//! The uniform error type returned by every fallible operation in this crate.

use std::fmt;

/// Fixed status-code enumeration shared by the Rust API and the C ABI.
///
/// Numeric values are part of the stable wire/ABI contract: never renumber
/// an existing variant, only append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    Success = 0,
    InvalidInput = 1,
    NotSupported = 2,
    ConnectIo = 3,
    BadAuth = 4,
    PeerProtocolViolation = 5,
    Shutdown = 6,
    Internal = 7,
    RequestFailed = 8,
    RequestCompleted = 9,
    ProxyIo = 10,
    ProxyStreamFailed = 11,
    NotAuthenticated = 12,
    AllConnectAttemptsFailed = 13,
    ConnectPointNotUsable = 14,
    BadConnectPointPath = 15,
}

impl Status {
    /// A stable, non-empty description for every status, including ones this
    /// version of the crate doesn't otherwise produce.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::InvalidInput => "invalid input",
            Status::NotSupported => "not supported",
            Status::ConnectIo => "error during connect (IO error)",
            Status::BadAuth => "authentication failed",
            Status::PeerProtocolViolation => "peer violated the protocol",
            Status::Shutdown => "connection is shut down",
            Status::Internal => "internal error",
            Status::RequestFailed => "request failed",
            Status::RequestCompleted => "request already completed",
            Status::ProxyIo => "error communicating with proxy (IO error)",
            Status::ProxyStreamFailed => "proxy refused to open the stream",
            Status::NotAuthenticated => "not authenticated",
            Status::AllConnectAttemptsFailed => "all connect attempts failed",
            Status::ConnectPointNotUsable => "connect point was not usable",
            Status::BadConnectPointPath => "could not read or parse a connect point",
        }
    }

    pub fn from_i32(code: i32) -> Option<Status> {
        use Status::*;
        Some(match code {
            0 => Success,
            1 => InvalidInput,
            2 => NotSupported,
            3 => ConnectIo,
            4 => BadAuth,
            5 => PeerProtocolViolation,
            6 => Shutdown,
            7 => Internal,
            8 => RequestFailed,
            9 => RequestCompleted,
            10 => ProxyIo,
            11 => ProxyStreamFailed,
            12 => NotAuthenticated,
            13 => AllConnectAttemptsFailed,
            14 => ConnectPointNotUsable,
            15 => BadConnectPointPath,
            _ => return None,
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform error carrier: a status code, a human message, an optional OS
/// error code, and an optional raw JSON peer response.
///
/// Cheap to clone (the message and response bodies are reference-counted).
#[derive(Debug, Clone)]
pub struct Error {
    status: Status,
    message: std::sync::Arc<str>,
    os_error: Option<i32>,
    response: Option<std::sync::Arc<str>>,
}

impl Error {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Error {
            status,
            message: message.into().into(),
            os_error: None,
            response: None,
        }
    }

    #[must_use]
    pub fn with_os_error(mut self, code: i32) -> Self {
        self.os_error = Some(code);
        self
    }

    #[must_use]
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into().into());
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// 0 if this error was not caused by an OS-level call failing.
    pub fn os_error_code(&self) -> i32 {
        self.os_error.unwrap_or(0)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The peer's raw JSON error response, if this error arrived as one.
    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        let os_error = e.raw_os_error();
        let err = Error::new(Status::ConnectIo, e.to_string());
        match os_error {
            Some(code) => err.with_os_error(code),
            None => err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        // {:#} chains every `.context()` layer into the message.
        Error::new(Status::Internal, format!("{e:#}"))
    }
}
