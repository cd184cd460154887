//! In-memory logger, mostly for tests and embedding callers that want to
//! report diagnostics alongside the result.

use crate::log::{LogLevel, Logger};
use std::fmt::Arguments;
use std::sync::Mutex;

/// Records every message with its level.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages logged at `level` or above
    pub fn messages_at_least(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l >= level)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        let message = args.to_string();
        match self.entries.lock() {
            Ok(mut entries) => entries.push((level, message)),
            Err(poisoned) => poisoned.into_inner().push((level, message)),
        }
    }
}
