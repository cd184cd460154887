//! Detection context shared by every detector

use std::path::Path;
use std::sync::Arc;

use crate::linuxpath::LinuxPaths;
use crate::log::{Logger, TracingLogger};

/// Resolved paths plus the logger that receives soft-failure diagnostics.
///
/// Cheap to clone; the logger is reference counted.
#[derive(Clone)]
pub struct Context {
    paths: LinuxPaths,
    logger: Arc<dyn Logger>,
}

impl Context {
    /// Live system, diagnostics through `tracing`
    pub fn new() -> Self {
        Self::with_chroot("/")
    }

    /// Read sysfs below `chroot` instead of `/`
    pub fn with_chroot(chroot: impl AsRef<Path>) -> Self {
        Self {
            paths: LinuxPaths::new(chroot),
            logger: Arc::new(TracingLogger),
        }
    }

    /// Replace the diagnostics sink
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn paths(&self) -> &LinuxPaths {
        &self.paths
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{LogLevel, MemoryLogger};
    use std::path::PathBuf;

    #[test]
    fn test_with_chroot_resolves_paths() {
        let ctx = Context::with_chroot("/srv/capture");
        assert_eq!(ctx.paths().chroot, PathBuf::from("/srv/capture"));
    }

    #[test]
    fn test_injected_logger_receives_messages() {
        let logger = Arc::new(MemoryLogger::new());
        let ctx = Context::new().with_logger(logger.clone());

        crate::log_warn!(ctx.logger(), "Unable to read {}", "level");

        assert_eq!(
            logger.messages_at_least(LogLevel::Warn),
            vec!["Unable to read level".to_string()]
        );
    }
}
