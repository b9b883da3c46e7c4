//! Error types callers may want to match on.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DsError {
    #[error("command '{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("command '{program}' could not be started: {source}")]
    CommandNotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no private /tmp certificate directory matches {pattern}")]
    NoPrivateCertDir { pattern: String },

    #[error("invalid version string: {0:?}")]
    InvalidVersion(String),
}
