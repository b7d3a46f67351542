//! The dispatcher: owns the active tool set and the enabled switch, and fans
//! every message out to all registered tools.
//!
//! Each delivery runs in its own tokio task, so a tool that errors, times
//! out or panics never keeps the message from reaching the other tools.
//! Those failures are reported to the error handler, never to the sender.

mod builder;
mod registration;

pub use builder::Builder;

use crate::message::{Message, MessageBuilder};
use crate::types::{DeliveryError, DispatchConfig, FailureStage, ToolFailure};
use registration::{panic_message, Registration};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Callback receiving every tool-level failure.
pub type ErrorHandler = Arc<dyn Fn(&ToolFailure) + Send + Sync>;

/// What happened to a message handed to [`MessageBuilder::over`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Fanned out to every registered tool.
    Delivered { delivered: usize, failed: usize },
    /// Tracking is disabled; the message was dropped.
    Disabled,
    /// Tracking is disabled; the message waits in the buffer.
    Buffered,
    /// No Houston instance was launched; the message was dropped.
    NotLaunched,
}

/// Statistics about dispatcher usage.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub messages_dispatched: u64,
    pub messages_suppressed: u64,
    pub messages_buffered: u64,
    /// Buffered messages evicted because the buffer was full.
    pub messages_dropped: u64,
    pub deliveries_succeeded: u64,
    pub deliveries_failed: u64,
    pub initialization_failures: u64,
    pub registered_tools: usize,
}

struct Inner {
    tools: Vec<Arc<Registration>>,
    enabled: AtomicBool,
    config: DispatchConfig,
    /// Guards `enabled` transitions as well as the queue: the flag is only
    /// stored, and read for buffering decisions, while this lock is held.
    buffer: Mutex<VecDeque<Message>>,
    /// Held for writing by a flush; direct deliveries take it for reading so
    /// they never overtake older buffered messages.
    flush: RwLock<()>,
    stats: RwLock<DispatchStats>,
    error_handler: ErrorHandler,
}

/// Handle to a launched dispatcher. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Houston {
    inner: Arc<Inner>,
}

impl Houston {
    /// Begin a registration session.
    pub fn init() -> Builder {
        Builder::new()
    }

    /// Start building a message that will be dispatched to this instance.
    pub fn send(&self, name: impl Into<String>) -> MessageBuilder {
        MessageBuilder::new(name.into(), Some(self.clone()))
    }

    /// Enable or disable dispatch for all subsequent messages.
    ///
    /// When message buffering is configured, enabling flushes the buffered
    /// messages in the order they were sent. Disabling again stops the flush
    /// after the in-flight message; the rest stay buffered.
    pub async fn set_enabled(&self, enabled: bool) {
        {
            let _buffer = self.inner.buffer.lock().await;
            self.inner.enabled.store(enabled, Ordering::Release);
        }
        tracing::debug!("Tracking {}", if enabled { "enabled" } else { "disabled" });

        if enabled && self.inner.config.message_buffer {
            self.flush().await;
        }
    }

    /// Deliver buffered messages one at a time while tracking stays enabled.
    async fn flush(&self) {
        let _flush = self.inner.flush.write().await;

        let mut flushed = 0usize;
        loop {
            let next = {
                let mut buffer = self.inner.buffer.lock().await;
                if !self.is_enabled() {
                    break;
                }
                buffer.pop_front()
            };
            let Some(message) = next else {
                break;
            };
            self.deliver(Arc::new(message)).await;
            flushed += 1;
        }

        if flushed > 0 {
            tracing::debug!("Flushed {} buffered messages", flushed);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    pub fn tool_count(&self) -> usize {
        self.inner.tools.len()
    }

    /// Names of the registered tools, in registration order.
    pub fn tool_names(&self) -> Vec<String> {
        self.inner
            .tools
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// Number of messages waiting for tracking to be re-enabled.
    pub async fn buffered(&self) -> usize {
        self.inner.buffer.lock().await.len()
    }

    /// Get current dispatch statistics.
    pub async fn get_stats(&self) -> DispatchStats {
        self.inner.stats.read().await.clone()
    }

    /// Reset statistics counters.
    pub async fn reset_stats(&self) {
        let mut stats = self.inner.stats.write().await;
        *stats = DispatchStats {
            registered_tools: self.inner.tools.len(),
            ..DispatchStats::default()
        };
    }

    fn from_parts(
        tools: Vec<Arc<Registration>>,
        config: DispatchConfig,
        error_handler: ErrorHandler,
    ) -> Self {
        let stats = DispatchStats {
            registered_tools: tools.len(),
            ..DispatchStats::default()
        };
        Self {
            inner: Arc::new(Inner {
                enabled: AtomicBool::new(config.tracking_enabled),
                buffer: Mutex::new(VecDeque::new()),
                flush: RwLock::new(()),
                stats: RwLock::new(stats),
                tools,
                config,
                error_handler,
            }),
        }
    }

    pub(crate) async fn dispatch(&self, message: Message) -> DispatchOutcome {
        if !self.inner.config.message_buffer {
            if self.is_enabled() {
                return self.deliver(Arc::new(message)).await;
            }
            self.inner.stats.write().await.messages_suppressed += 1;
            tracing::debug!("Tracking disabled, dropping message {}", message.name());
            return DispatchOutcome::Disabled;
        }

        // Waits for a running flush to finish.
        let _order = self.inner.flush.read().await;

        let dropped = {
            let mut buffer = self.inner.buffer.lock().await;
            if self.is_enabled() {
                drop(buffer);
                return self.deliver(Arc::new(message)).await;
            }
            let dropped = if buffer.len() >= self.inner.config.buffer_capacity {
                buffer.pop_front()
            } else {
                None
            };
            buffer.push_back(message);
            dropped
        };

        let mut stats = self.inner.stats.write().await;
        stats.messages_buffered += 1;
        if let Some(dropped) = dropped {
            stats.messages_dropped += 1;
            tracing::warn!("Message buffer full, dropped oldest message {}", dropped.name());
        }
        DispatchOutcome::Buffered
    }

    /// Fan one message out to every tool and wait for all deliveries.
    async fn deliver(&self, message: Arc<Message>) -> DispatchOutcome {
        let limit = self.inner.config.send_timeout;

        let handles: Vec<_> = self
            .inner
            .tools
            .iter()
            .map(|registration| {
                let task_registration = registration.clone();
                let message = message.clone();
                let handle = tokio::spawn(async move {
                    task_registration.deliver(&message, limit).await
                });
                (registration.clone(), handle)
            })
            .collect();

        let mut delivered = 0;
        let mut failures = Vec::new();
        for (registration, handle) in handles {
            let (stage, error) = match handle.await {
                Ok(Ok(())) => {
                    delivered += 1;
                    continue;
                }
                Ok(Err(failure)) => failure,
                Err(join_error) => {
                    // The flag is only set once initialize returned, so it
                    // tells which of the two calls panicked.
                    let stage = if registration.is_initialized() {
                        FailureStage::Send
                    } else {
                        FailureStage::Initialize
                    };
                    let error = if join_error.is_panic() {
                        DeliveryError::Panicked(panic_message(join_error.into_panic()))
                    } else {
                        DeliveryError::Aborted
                    };
                    (stage, error)
                }
            };
            failures.push(ToolFailure {
                tool: registration.name().to_string(),
                stage,
                message_name: Some(message.name().to_string()),
                error,
            });
        }

        let failed = failures.len();
        {
            let mut stats = self.inner.stats.write().await;
            stats.messages_dispatched += 1;
            stats.deliveries_succeeded += delivered as u64;
            stats.deliveries_failed += failed as u64;
            stats.initialization_failures += failures
                .iter()
                .filter(|f| f.stage == FailureStage::Initialize)
                .count() as u64;
        }

        for failure in &failures {
            self.report(failure);
        }

        tracing::debug!(
            "Dispatched message {} ({}) to {} tools, {} failed",
            message.name(),
            message.id(),
            delivered,
            failed
        );

        DispatchOutcome::Delivered { delivered, failed }
    }

    fn report(&self, failure: &ToolFailure) {
        (self.inner.error_handler)(failure);
    }
}

impl fmt::Debug for Houston {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Houston")
            .field("tools", &self.inner.tools)
            .field("enabled", &self.is_enabled())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Default error handler: log the failure and carry on.
pub fn log_failure(failure: &ToolFailure) {
    tracing::warn!(
        tool = %failure.tool,
        stage = %failure.stage,
        "{}",
        failure
    );
}
