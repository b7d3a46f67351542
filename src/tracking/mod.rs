//! Tracking tools: the capability contract plus a built-in log sink.

pub mod tool;
pub mod tracing_tool;

pub use tool::{InitFlag, TrackingTool};
pub use tracing_tool::TracingTool;
