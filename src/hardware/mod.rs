//! Hardware detection module
//!
//! Reads cache topology and DMI identifiers from Linux sysfs, and network
//! interfaces from sysfs/ethtool (Linux) or WMI (Windows).

pub mod dmi;
pub mod memory_cache;
pub mod net;
mod system;
pub mod topology;

pub use memory_cache::{caches_for_node, MemoryCache, MemoryCacheType};
pub use system::SystemInfo;
pub use topology::{Node, TopologyInfo};
