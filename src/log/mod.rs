//! Diagnostic logging for detectors.
//!
//! Detectors never write to stdout/stderr directly. Soft failures (a missing
//! sysfs attribute, an unparsable value) go through the `Logger` held by the
//! [`Context`](crate::Context), so callers decide where they end up:
//!
//! - `TracingLogger`: forwards to the `tracing` crate (CLI default)
//! - `NoOpLogger`: discards everything
//! - `MemoryLogger`: keeps messages in memory so tests can assert on them

mod logger;
mod memory;
mod noop;
mod tracing_adapter;

pub use logger::{LogLevel, Logger};
pub use memory::MemoryLogger;
pub use noop::NoOpLogger;
pub use tracing_adapter::TracingLogger;
