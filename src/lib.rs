//! # Houston - Analytics Dispatch Facade
//!
//! Register any number of tracking tools, then send named events with
//! string parameters to all of them at once:
//! - Fluent registration (`init().add(..).launch()`) and message building
//!   (`send(..).with(..).over()`)
//! - Lazy, at-most-once tool initialization
//! - Global enable/disable switch with an optional message buffer
//! - Failure isolation: a tool that errors, hangs or panics never affects
//!   the others; failures go to a pluggable error handler
//!
//! ## Architecture
//!
//! ```text
//!   send("event")          ┌───────────────────────────┐
//!     .with(k, v)   ─────→ │         Houston           │
//!     .over()              │  enabled? ──no──→ buffer  │
//!                          │     │yes                  │
//!                          │     ▼                     │
//!                          │  one task per tool        │
//!                          └──┬─────────┬─────────┬────┘
//!                             ▼         ▼         ▼
//!                          Tool A    Tool B    Tool C
//! ```
//!
//! ```no_run
//! use houston::{Houston, TracingTool};
//!
//! # async fn demo() -> houston::Result<()> {
//! let houston = Houston::init().add(TracingTool::new()).launch().await?;
//!
//! houston.send("app_start").with("version", "1.2.0").over().await?;
//! houston.set_enabled(false).await;
//! # Ok(())
//! # }
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod dispatch;
pub mod global;
pub mod message;
pub mod tracking;
pub mod types;

// Internal utilities
pub mod observability;

pub use dispatch::{log_failure, Builder, DispatchOutcome, DispatchStats, ErrorHandler, Houston};
pub use message::{Message, MessageBuilder};
pub use tracking::{InitFlag, TrackingTool, TracingTool};
pub use types::{
    Config, DeliveryError, DispatchConfig, Error, FailureStage, Result, ToolError, ToolFailure,
};
