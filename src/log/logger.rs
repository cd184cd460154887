//! Logger trait definition.

use std::fmt::Arguments;

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Logging interface injected into hardware detectors.
///
/// Implementations must be `Send + Sync` so one `Context` can be shared by
/// callers that discover different nodes from different threads.
pub trait Logger: Send + Sync {
    /// Log a message at the specified level.
    fn log(&self, level: LogLevel, args: Arguments<'_>);

    fn trace(&self, args: Arguments<'_>) {
        self.log(LogLevel::Trace, args);
    }

    fn debug(&self, args: Arguments<'_>) {
        self.log(LogLevel::Debug, args);
    }

    fn info(&self, args: Arguments<'_>) {
        self.log(LogLevel::Info, args);
    }

    fn warn(&self, args: Arguments<'_>) {
        self.log(LogLevel::Warn, args);
    }

    fn error(&self, args: Arguments<'_>) {
        self.log(LogLevel::Error, args);
    }
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log::Logger::debug(&*$logger, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log::Logger::info(&*$logger, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log::Logger::warn(&*$logger, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }
}
