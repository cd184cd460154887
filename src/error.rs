//! Library error type

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Structural failures. Attribute-level read problems never surface here;
/// they are logged and degraded by the detectors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unable to list directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("NUMA node {0} not found")]
    NodeNotFound(u32),
}

impl Error {
    pub(crate) fn read_dir(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::ReadDir {
            path: path.into(),
            source,
        }
    }

    /// Kind of the underlying I/O failure, if any
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::ReadDir { source, .. } => Some(source.kind()),
            Error::NodeNotFound(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_dir_message_includes_path() {
        let err = Error::read_dir(
            "/sys/devices/system/node/node7",
            io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        );
        let message = err.to_string();
        assert!(message.contains("/sys/devices/system/node/node7"));
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn test_node_not_found_has_no_io_kind() {
        let err = Error::NodeNotFound(3);
        assert_eq!(err.to_string(), "NUMA node 3 not found");
        assert_eq!(err.io_kind(), None);
    }
}
