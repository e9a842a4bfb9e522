//! Error types for endpoint resolution and public IP lookups

use reqwest::StatusCode;
use std::fmt;
use std::io;
use thiserror::Error;

/// Classification attached to failures that callers are expected to branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotEnoughServers,
    BadHttpStatus,
    TooManyRequests,
    TokenNotValid,
    ProviderNotValid,
    DecodeFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotEnoughServers => write!(f, "not enough servers"),
            ErrorKind::BadHttpStatus => write!(f, "bad HTTP status"),
            ErrorKind::TooManyRequests => write!(f, "too many requests"),
            ErrorKind::TokenNotValid => write!(f, "token not valid"),
            ErrorKind::ProviderNotValid => write!(f, "provider not valid"),
            ErrorKind::DecodeFailure => write!(f, "decode failure"),
        }
    }
}

/// Crate error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("not enough servers found: {found} and expected at least {min}")]
    NotEnoughServers { found: usize, min: usize },

    #[error("bad HTTP status from {url}: {status}")]
    BadHttpStatus { url: String, status: StatusCode },

    #[error("too many requests sent from {url}: {status}")]
    TooManyRequests { url: String, status: StatusCode },

    #[error("token is not valid: {0}")]
    TokenNotValid(StatusCode),

    #[error("provider not valid: {0}")]
    ProviderNotValid(String),

    #[error("decoding {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no server found: {0}")]
    NoServerFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("DNS error: {0}")]
    Dns(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn dns<S: Into<String>>(msg: S) -> Self {
        Error::Dns(msg.into())
    }

    pub fn archive<S: Into<String>>(msg: S) -> Self {
        Error::Archive(msg.into())
    }

    pub fn provider_not_valid<S: Into<String>>(msg: S) -> Self {
        Error::ProviderNotValid(msg.into())
    }

    pub fn decode<S: Into<String>>(what: S, source: serde_json::Error) -> Self {
        Error::Decode {
            what: what.into(),
            source,
        }
    }

    /// Wrap this error with a context message, keeping it as the source
    pub fn context<S: Into<String>>(self, context: S) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classification of this error, looking through context wrappers
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::NotEnoughServers { .. } => Some(ErrorKind::NotEnoughServers),
            Error::BadHttpStatus { .. } => Some(ErrorKind::BadHttpStatus),
            Error::TooManyRequests { .. } => Some(ErrorKind::TooManyRequests),
            Error::TokenNotValid(_) => Some(ErrorKind::TokenNotValid),
            Error::ProviderNotValid(_) => Some(ErrorKind::ProviderNotValid),
            Error::Decode { .. } => Some(ErrorKind::DecodeFailure),
            Error::Context { source, .. } => source.kind(),
            _ => None,
        }
    }

    /// Innermost error below any context wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Error::Cancelled)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Archive(e.to_string())
    }
}

/// Adds context to the error side of a `Result`
pub trait ResultExt<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T> {
        self.map_err(|e| e.context(context))
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;
