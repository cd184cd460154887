//! Tracing library adapter implementation.

use crate::log::{LogLevel, Logger};
use std::fmt::Arguments;

/// Logger implementation that delegates to the `tracing` crate.
///
/// Messages land wherever the installed subscriber sends them; without a
/// subscriber they are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        match level {
            LogLevel::Trace => tracing::trace!("{}", args),
            LogLevel::Debug => tracing::debug!("{}", args),
            LogLevel::Info => tracing::info!("{}", args),
            LogLevel::Warn => tracing::warn!("{}", args),
            LogLevel::Error => tracing::error!("{}", args),
        }
    }
}
