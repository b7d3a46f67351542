//! Application error types.
//!
//! Facade-level failures (`Error`) are kept apart from tool-level failures
//! (`ToolError`, `DeliveryError`): the former are returned to callers, the
//! latter never leave the dispatch boundary and go to the error handler.

use std::fmt;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the Houston facade.
#[derive(Error, Debug)]
pub enum Error {
    /// Validation errors (empty event names, out-of-range config values).
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Error returned by a tracking tool from `initialize` or `send`.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool failed with a plain message.
    #[error("{0}")]
    Failed(String),

    /// The tool failed with an underlying error.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ToolError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Why a single delivery to a single tool did not complete.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The tool returned an error.
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    /// The tool did not finish within the configured send timeout.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// The tool panicked while handling the call.
    #[error("tool panicked: {0}")]
    Panicked(String),

    /// The delivery task was cancelled before completing.
    #[error("delivery aborted")]
    Aborted,
}

/// The tool operation during which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Initialize,
    Send,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Initialize => write!(f, "initialize"),
            FailureStage::Send => write!(f, "send"),
        }
    }
}

/// A tool-level failure as reported to the error handler.
#[derive(Debug)]
pub struct ToolFailure {
    /// Name of the tool that failed.
    pub tool: String,
    pub stage: FailureStage,
    /// Name of the message being delivered, if the failure happened during dispatch.
    pub message_name: Option<String>,
    pub error: DeliveryError,
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message_name {
            Some(name) => write!(
                f,
                "tool '{}' failed to {} message '{}': {}",
                self.tool, self.stage, name, self.error
            ),
            None => write!(f, "tool '{}' failed to {}: {}", self.tool, self.stage, self.error),
        }
    }
}
