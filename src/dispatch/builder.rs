//! Registration session: collect tools, then `launch`.

use super::registration::{panic_message, Registration};
use super::{log_failure, ErrorHandler, Houston};
use crate::tracking::TrackingTool;
use crate::types::{DeliveryError, DispatchConfig, FailureStage, Result, ToolFailure};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Collects tracking tools and dispatch settings until [`Builder::launch`].
#[must_use = "tools are only registered once `launch()` is awaited"]
pub struct Builder {
    tools: Vec<Arc<dyn TrackingTool>>,
    config: DispatchConfig,
    error_handler: Option<ErrorHandler>,
}

impl Builder {
    pub(crate) fn new() -> Self {
        Self {
            tools: Vec::new(),
            config: DispatchConfig::default(),
            error_handler: None,
        }
    }

    /// Register a tracking tool.
    pub fn add<T: TrackingTool + 'static>(self, tool: T) -> Self {
        self.add_arc(Arc::new(tool))
    }

    /// Register a shared tracking tool. Adding the same `Arc` twice is a no-op.
    pub fn add_arc(mut self, tool: Arc<dyn TrackingTool>) -> Self {
        if self.tools.iter().any(|t| Arc::ptr_eq(t, &tool)) {
            tracing::debug!("Tracking tool {} already registered", tool.name());
            return self;
        }
        self.tools.push(tool);
        self
    }

    /// Replace all dispatch settings at once.
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether tracking is enabled right after launch (default: `true`).
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.tracking_enabled = enabled;
        self
    }

    /// Buffer messages while disabled and flush them on re-enable.
    pub fn message_buffer(mut self, enabled: bool) -> Self {
        self.config.message_buffer = enabled;
        self
    }

    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config.send_timeout = timeout;
        self
    }

    /// Receive every tool failure (default: [`log_failure`]).
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ToolFailure) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Initialize every registered tool (in registration order) and return
    /// the active dispatcher.
    ///
    /// A tool whose initialization fails is reported to the error handler
    /// and retried lazily on its next delivery. Only an invalid
    /// configuration makes launch fail.
    pub async fn launch(self) -> Result<Houston> {
        self.config.validate()?;

        let error_handler = self
            .error_handler
            .unwrap_or_else(|| Arc::new(log_failure) as ErrorHandler);
        let limit = self.config.send_timeout;

        let registrations: Vec<Arc<Registration>> = self
            .tools
            .into_iter()
            .map(|tool| Arc::new(Registration::new(tool)))
            .collect();

        let mut initialization_failures = 0;
        for registration in &registrations {
            if registration.is_initialized() {
                continue;
            }

            let task_registration = registration.clone();
            let result =
                tokio::spawn(async move { task_registration.ensure_initialized(limit).await })
                    .await;

            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error,
                Err(join_error) if join_error.is_panic() => {
                    DeliveryError::Panicked(panic_message(join_error.into_panic()))
                }
                Err(_) => DeliveryError::Aborted,
            };

            initialization_failures += 1;
            error_handler(&ToolFailure {
                tool: registration.name().to_string(),
                stage: FailureStage::Initialize,
                message_name: None,
                error,
            });
        }

        let houston = Houston::from_parts(registrations, self.config, error_handler);
        houston.inner.stats.write().await.initialization_failures = initialization_failures;

        tracing::info!(
            tools = ?houston.tool_names(),
            enabled = houston.is_enabled(),
            "Houston launched"
        );

        Ok(houston)
    }

    /// Launch and install the result as the process-wide instance,
    /// replacing any previously launched one.
    pub async fn launch_global(self) -> Result<Houston> {
        let houston = self.launch().await?;
        if crate::global::install(houston.clone()).is_some() {
            tracing::debug!("Replaced previously launched Houston instance");
        }
        Ok(houston)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .field("custom_error_handler", &self.error_handler.is_some())
            .finish()
    }
}
