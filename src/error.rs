//! Provisioning error types.
//!
//! [`ProvisionError`] covers every failure of the workflow. [`ErrorKind`] is
//! the payload-free tag used when reporting which class of failure ended a run.

use std::fmt;
use std::process::ExitCode;
use std::time::Duration;

use thiserror::Error;

/// Errors from provisioning operations.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A required setting is missing or unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The configured secret key could not be decoded into a keypair.
    #[error("malformed secret key: {0}")]
    Decode(String),

    /// An RPC call failed before reaching the runtime.
    #[error("network error: {0}")]
    Network(String),

    /// Signing, submission or confirmation of a transaction failed.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// The token account could not be looked up, created or decoded.
    #[error("token account error: {0}")]
    Account(String),

    /// A network call did not complete within the configured bound.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl ProvisionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Network(_) => ErrorKind::Network,
            Self::Transaction(_) => ErrorKind::Transaction,
            Self::Account(_) => ErrorKind::Account,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Process exit status for a run that ended with this error.
    ///
    /// Only configuration errors exit non-zero; every other failure has
    /// already been logged and the process terminates normally.
    pub fn exit_code(&self) -> ExitCode {
        match self.kind() {
            ErrorKind::Config => ExitCode::FAILURE,
            _ => ExitCode::SUCCESS,
        }
    }
}

/// Class of a [`ProvisionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Decode,
    Network,
    Transaction,
    Account,
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "ConfigError"),
            Self::Decode => write!(f, "DecodeError"),
            Self::Network => write!(f, "NetworkError"),
            Self::Transaction => write!(f, "TransactionError"),
            Self::Account => write!(f, "AccountError"),
            Self::Timeout => write!(f, "TimeoutError"),
        }
    }
}
