//! Path resolution for the Linux virtual filesystems we read.
//!
//! Every root is derived from a chroot so the same detectors can run against
//! the live `/sys` or against a copied tree (tests, offline snapshots).

use std::path::{Path, PathBuf};

/// Resolved sysfs locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxPaths {
    /// Directory all other paths are derived from ("/" on a live system)
    pub chroot: PathBuf,
    /// `/sys/devices/system/node`
    pub sys_devices_system_node: PathBuf,
    /// `/sys/class/dmi`
    pub sys_class_dmi: PathBuf,
    /// `/sys/class/net`
    pub sys_class_net: PathBuf,
}

impl LinuxPaths {
    pub fn new(chroot: impl AsRef<Path>) -> Self {
        let chroot = chroot.as_ref().to_path_buf();
        Self {
            sys_devices_system_node: chroot.join("sys/devices/system/node"),
            sys_class_dmi: chroot.join("sys/class/dmi"),
            sys_class_net: chroot.join("sys/class/net"),
            chroot,
        }
    }

    /// `{node_root}/node{N}`
    pub fn node(&self, node_id: u32) -> PathBuf {
        self.sys_devices_system_node.join(format!("node{}", node_id))
    }

    /// `{node_root}/node{N}/cpu{P}`
    pub fn node_cpu(&self, node_id: u32, lp_id: u32) -> PathBuf {
        self.node(node_id).join(format!("cpu{}", lp_id))
    }

    /// `{node_root}/node{N}/cpu{P}/cache`
    pub fn node_cpu_cache(&self, node_id: u32, lp_id: u32) -> PathBuf {
        self.node_cpu(node_id, lp_id).join("cache")
    }

    /// `{node_root}/node{N}/cpu{P}/cache/index{I}`
    pub fn node_cpu_cache_index(&self, node_id: u32, lp_id: u32, index: u32) -> PathBuf {
        self.node_cpu_cache(node_id, lp_id)
            .join(format!("index{}", index))
    }

    /// `{dmi_root}/id/{item}`
    pub fn dmi_item(&self, item: &str) -> PathBuf {
        self.sys_class_dmi.join("id").join(item)
    }
}

impl Default for LinuxPaths {
    fn default() -> Self {
        Self::new("/")
    }
}
