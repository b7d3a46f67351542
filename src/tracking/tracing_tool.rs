//! Built-in tracking tool that records messages as `tracing` events.

use super::tool::{InitFlag, TrackingTool};
use crate::message::Message;
use crate::types::ToolError;
use async_trait::async_trait;
use tracing::Level;

/// Emits every message as a structured log event on the
/// `houston::tracking` target.
#[derive(Debug)]
pub struct TracingTool {
    name: String,
    level: Level,
    initialized: InitFlag,
}

impl TracingTool {
    pub fn new() -> Self {
        Self::with_level(Level::INFO)
    }

    pub fn with_level(level: Level) -> Self {
        Self {
            name: "tracing".to_string(),
            level,
            initialized: InitFlag::new(),
        }
    }

    /// Override the name shown in failure reports.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for TracingTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackingTool for TracingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    fn set_initialized(&self, initialized: bool) {
        self.initialized.set(initialized);
    }

    async fn send(&self, message: &Message) -> Result<(), ToolError> {
        let name = message.name();
        let id = message.id().as_str();
        let parameters = message.parameters();
        let timestamp_ms = message.timestamp_ms();

        // event! needs a constant level
        if self.level == Level::ERROR {
            tracing::error!(target: "houston::tracking", tool = %self.name, %id, timestamp_ms, ?parameters, "{}", name);
        } else if self.level == Level::WARN {
            tracing::warn!(target: "houston::tracking", tool = %self.name, %id, timestamp_ms, ?parameters, "{}", name);
        } else if self.level == Level::INFO {
            tracing::info!(target: "houston::tracking", tool = %self.name, %id, timestamp_ms, ?parameters, "{}", name);
        } else if self.level == Level::DEBUG {
            tracing::debug!(target: "houston::tracking", tool = %self.name, %id, timestamp_ms, ?parameters, "{}", name);
        } else {
            tracing::trace!(target: "houston::tracking", tool = %self.name, %id, timestamp_ms, ?parameters, "{}", name);
        }
        Ok(())
    }
}
