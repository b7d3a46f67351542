//! A registered tool plus the lock that serializes its initialization.

use crate::message::Message;
use crate::tracking::TrackingTool;
use crate::types::{DeliveryError, FailureStage, ToolError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub(crate) struct Registration {
    tool: Arc<dyn TrackingTool>,
    init_lock: Mutex<()>,
}

impl Registration {
    pub(crate) fn new(tool: Arc<dyn TrackingTool>) -> Self {
        Self {
            tool,
            init_lock: Mutex::new(()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.tool.name()
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.tool.is_initialized()
    }

    /// Run `initialize` unless the tool already reports itself initialized.
    ///
    /// The flag is re-checked under the lock so concurrent deliveries never
    /// initialize the same tool twice. A failed attempt leaves the flag
    /// unset and is retried on the next delivery.
    pub(crate) async fn ensure_initialized(&self, limit: Duration) -> Result<(), DeliveryError> {
        if self.tool.is_initialized() {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        if self.tool.is_initialized() {
            return Ok(());
        }

        bounded(limit, self.tool.initialize()).await?;
        self.tool.set_initialized(true);
        tracing::debug!("Initialized tracking tool {}", self.tool.name());
        Ok(())
    }

    /// Initialize if needed, then hand the message to the tool.
    pub(crate) async fn deliver(
        &self,
        message: &Message,
        limit: Duration,
    ) -> Result<(), (FailureStage, DeliveryError)> {
        self.ensure_initialized(limit)
            .await
            .map_err(|e| (FailureStage::Initialize, e))?;

        bounded(limit, self.tool.send(message))
            .await
            .map_err(|e| (FailureStage::Send, e))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("tool", &self.tool.name())
            .field("initialized", &self.tool.is_initialized())
            .finish()
    }
}

async fn bounded<F>(limit: Duration, call: F) -> Result<(), DeliveryError>
where
    F: Future<Output = Result<(), ToolError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(DeliveryError::from),
        Err(_) => Err(DeliveryError::Timeout(limit.as_millis() as u64)),
    }
}

/// Extract a readable message from a task panic payload.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
