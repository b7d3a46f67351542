//! The capability every tracking tool implements.

use crate::message::Message;
use crate::types::ToolError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

/// A sink that receives every message dispatched through Houston.
///
/// Implementations own their `initialized` flag (usually through an embedded
/// [`InitFlag`]); the dispatcher reads it before each delivery and sets it
/// after a successful [`TrackingTool::initialize`]. The dispatcher never
/// calls `initialize` concurrently or after it has succeeded once.
///
/// Errors returned from `initialize` or `send` stay inside the dispatcher:
/// they are logged, counted and passed to the configured error handler.
#[async_trait]
pub trait TrackingTool: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn is_initialized(&self) -> bool;

    fn set_initialized(&self, initialized: bool);

    /// One-time setup (SDK bootstrap, credentials, connections).
    async fn initialize(&self) -> Result<(), ToolError> {
        Ok(())
    }

    /// Deliver one message.
    async fn send(&self, message: &Message) -> Result<(), ToolError>;
}

/// Thread-safe initialization flag for [`TrackingTool`] implementations.
#[derive(Debug, Default)]
pub struct InitFlag(AtomicBool);

impl InitFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, initialized: bool) {
        self.0.store(initialized, Ordering::Release);
    }
}
