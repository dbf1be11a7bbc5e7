//! Locations of the pseudo-filesystems the collectors read.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Roots of the `/proc`, `/sys` and `/dev` trees.
///
/// Every source path a collector reads is derived from one of these roots,
/// so a captured tree (or a mock) can stand in for the live host.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ScanPaths {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
    pub dev_root: PathBuf,
}

impl Default for ScanPaths {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
            dev_root: PathBuf::from("/dev"),
        }
    }
}

impl ScanPaths {
    /// Creates paths rooted at the given directories.
    pub fn new(
        proc_root: impl Into<PathBuf>,
        sys_root: impl Into<PathBuf>,
        dev_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
            dev_root: dev_root.into(),
        }
    }

    /// `/proc/cpuinfo`
    pub fn cpuinfo(&self) -> PathBuf {
        self.proc_root.join("cpuinfo")
    }

    /// `/proc/meminfo`
    pub fn meminfo(&self) -> PathBuf {
        self.proc_root.join("meminfo")
    }

    /// `/sys/devices/system/node`
    pub fn node_dir(&self) -> PathBuf {
        self.sys_root.join("devices/system/node")
    }

    /// `/sys/devices/system/memory`
    pub fn memory_block_dir(&self) -> PathBuf {
        self.sys_root.join("devices/system/memory")
    }

    /// `/sys/kernel/mm/hugepages`
    pub fn hugepages_dir(&self) -> PathBuf {
        self.sys_root.join("kernel/mm/hugepages")
    }

    /// `/sys/block`
    pub fn block_dir(&self) -> PathBuf {
        self.sys_root.join("block")
    }

    /// `/sys/class/net`
    pub fn net_dir(&self) -> PathBuf {
        self.sys_root.join("class/net")
    }

    /// `/dev/disk/by-id`
    pub fn disk_by_id_dir(&self) -> PathBuf {
        self.dev_root.join("disk/by-id")
    }

    /// Device node path handed to external tools, e.g. `/dev/sda1`.
    pub fn device_node(&self, name: &str) -> PathBuf {
        self.dev_root.join(name)
    }
}

/// Returns the final component of `path` as UTF-8, if any.
pub(crate) fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = ScanPaths::default();
        assert_eq!(paths.cpuinfo(), PathBuf::from("/proc/cpuinfo"));
        assert_eq!(paths.node_dir(), PathBuf::from("/sys/devices/system/node"));
        assert_eq!(paths.disk_by_id_dir(), PathBuf::from("/dev/disk/by-id"));
        assert_eq!(paths.device_node("sda1"), PathBuf::from("/dev/sda1"));
    }

    #[test]
    fn test_custom_roots() {
        let paths = ScanPaths::new("/snap/proc", "/snap/sys", "/snap/dev");
        assert_eq!(paths.block_dir(), PathBuf::from("/snap/sys/block"));
        assert_eq!(paths.meminfo(), PathBuf::from("/snap/proc/meminfo"));
    }
}
