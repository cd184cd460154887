//! hw-inventory - static hardware inventory
//!
//! Reads what the operating system already exposes about the machine and
//! normalizes it into typed records:
//! - Memory cache hierarchy per NUMA node (Linux sysfs)
//! - DMI/SMBIOS identifiers (Linux sysfs)
//! - Network interfaces (Linux sysfs + ethtool, Windows WMI)
//!
//! Every detector takes a [`Context`], which carries the resolved sysfs roots
//! and the logger used for non-fatal diagnostics.

pub mod config;
pub mod context;
pub mod error;
pub mod hardware;
pub mod linuxpath;
pub mod log;

pub use context::Context;
pub use error::{Error, Result};
