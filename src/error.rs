// error.rs — Error types for the pipe channels, frame decoding, config and logging.
//
// Only ChannelError, ConfigError and LoggerError ever reach the worker thread
// (and turn into a failing exit code). FrameError is swallowed by the listeners.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The two synchronous exchanges performed right after the primary pipe opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    DisableNosmall,
    AutoLogin,
}

impl HandshakeStep {
    /// Token sent after the process id.
    pub fn token(self) -> &'static str {
        match self {
            HandshakeStep::DisableNosmall => "DisableNosmall",
            HandshakeStep::AutoLogin => "AutoLogin",
        }
    }
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("pipe {name} not available after {waited:?}")]
    Unavailable { name: String, waited: Duration },

    #[error("pipe {name} could not be opened: {source}")]
    Open {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("pipe {name} read mode could not be set: {source}")]
    Configure {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("handshake {step} write failed: {source}")]
    HandshakeWrite {
        step: HandshakeStep,
        #[source]
        source: io::Error,
    },

    #[error("handshake {step} read failed: {source}")]
    HandshakeRead {
        step: HandshakeStep,
        #[source]
        source: io::Error,
    },

    #[error("handshake {step}: peer closed the pipe before replying")]
    HandshakeClosed { step: HandshakeStep },

    #[error("handshake {step}: reply {reply:?} is not an integer")]
    HandshakeDecode { step: HandshakeStep, reply: String },
}

/// Why a command frame was dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("field {field} is not an integer: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config read error: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config parse error: {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("config validation error: {reason}")]
    Invalid { reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("pattern has only wildcards")]
    OnlyWildcards,

    #[error("invalid pattern byte {0:?}")]
    InvalidByte(String),
}

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("failed to create log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install logger: {0}")]
    Install(#[from] log::SetLoggerError),
}

/// Anything that stops the worker before or during the primary handshake.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}
