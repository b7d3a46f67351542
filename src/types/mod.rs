//! Core types for Houston.
//!
//! This module provides foundational types used throughout the crate:
//! - **IDs**: Strongly-typed identifiers (MessageId, EventName)
//! - **Errors**: Facade and tool error types with thiserror derives
//! - **Config**: Configuration structures for dispatch and observability

mod config;
mod errors;
mod ids;

pub use config::{Config, DispatchConfig, ObservabilityConfig};
pub use errors::{DeliveryError, Error, FailureStage, Result, ToolError, ToolFailure};
pub use ids::{EventName, MessageId};
