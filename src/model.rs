//! Hardware inventory records.
//!
//! Plain value types produced by the collectors. They are never mutated after
//! a collector returns them; scans hand them out behind `Arc`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

const MB: u64 = 1024 * 1024;

/// One physical CPU package (socket).
///
/// Source: `/proc/cpuinfo`, first block with a given `physical id`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Cpu {
    /// Physical package id.
    /// Source: `physical id`
    pub id: u32,

    /// Physical cores in the package.
    /// Source: `cpu cores`
    pub cores: u32,

    /// Hardware threads in the package.
    /// Source: `siblings`
    pub threads: u32,

    /// Source: `vendor_id`
    pub vendor: String,

    /// Source: `model name`
    pub model: String,

    /// CPU feature flags.
    /// Source: `flags` (x86) or `Features` (ARM); empty if neither is present.
    pub features: BTreeSet<String>,
}

/// Host-wide CPU summary.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct CpuInfo {
    /// Sum of `cores` over all packages.
    pub total_cores: u32,
    /// Sum of `threads` over all packages.
    pub total_threads: u32,
    pub cpus: Vec<Cpu>,
}

/// A physical core and the logical processors (hardware threads) it runs.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Core {
    /// Source: `node<N>/cpu<M>/topology/core_id`
    pub id: u32,
    /// Logical processor ids. Never empty.
    pub processor_set: BTreeSet<usize>,
}

impl Core {
    /// Number of hardware threads on this core.
    pub fn threads(&self) -> usize {
        self.processor_set.len()
    }
}

/// A NUMA node.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Node {
    /// Source: `node<N>` directory suffix
    pub id: u32,
    /// Logical processors with affinity to this node.
    /// Source: `node<N>/cpumap`
    pub processor_set: BTreeSet<usize>,
    /// Cores sorted by id.
    pub cores: Vec<Core>,
}

/// Overall system architecture, derived from the node count alone.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum Architecture {
    #[serde(rename = "NUMA")]
    Numa,
    #[default]
    #[serde(rename = "SMP")]
    Smp,
}

impl Architecture {
    /// `Numa` when more than one node exists, otherwise `Smp`.
    pub fn from_node_count(nodes: usize) -> Self {
        if nodes > 1 {
            Architecture::Numa
        } else {
            Architecture::Smp
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::Numa => write!(f, "NUMA"),
            Architecture::Smp => write!(f, "SMP"),
        }
    }
}

/// Physical topology of the host.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct TopologyInfo {
    pub architecture: Architecture,
    /// Nodes sorted by id.
    pub nodes: Vec<Node>,
}

/// Disk bus, inferred from the kernel device name.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BusType {
    /// `hd*` devices.
    #[serde(rename = "IDE")]
    Ide,
    /// `sd*` devices.
    #[serde(rename = "SCSI")]
    Scsi,
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusType::Ide => write!(f, "IDE"),
            BusType::Scsi => write!(f, "SCSI"),
        }
    }
}

/// A partition of a disk block device.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Partition {
    /// Name of the owning disk (e.g. `sda`).
    pub disk: String,
    /// Kernel name (e.g. `sda1`).
    pub name: String,
    /// Sector count × 512; 0 when the size source is missing.
    pub size_bytes: u64,
    /// Filesystem type reported by `findmnt`; `None` when not mounted.
    pub fs_type: Option<String>,
    /// Mount target reported by `findmnt`; `None` when not mounted.
    pub mount_point: Option<String>,
    /// Source: `/sys/block/<disk>/<part>/ro`
    pub read_only: bool,
}

/// A disk block device.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Disk {
    pub name: String,
    /// Sector count × 512; 0 when the size source is missing.
    pub size_bytes: u64,
    pub bus_type: BusType,
    /// `"unknown"` when the vendor source is missing.
    pub vendor: String,
    /// `"unknown"` when no `/dev/disk/by-id` link resolves to this disk.
    pub serial_number: String,
    pub partitions: Vec<Partition>,
}

/// Block storage summary.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct BlockInfo {
    /// Sum of `size_bytes` over `disks`, taken from the same enumeration.
    pub total_size_bytes: u64,
    /// Disks sorted by name.
    pub disks: Vec<Disk>,
}

/// Offload features reported by `ethtool -k`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct NicFeatures {
    /// Every feature name the driver reports.
    pub all: BTreeSet<String>,
    /// Subset of `all` currently switched on.
    pub enabled: BTreeSet<String>,
}

/// A network interface controller.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct NetworkInterface {
    /// Kernel interface name. Never empty, never `lo`.
    pub name: String,
    /// Burned-in MAC address. `None` when the kernel reports a random or
    /// otherwise non-permanent address.
    pub mac: Option<String>,
    /// Source: udev `ID_BUS`
    pub bus_type: Option<String>,
    /// Source: udev `ID_NET_DRIVER`
    pub driver: Option<String>,
    /// Source: udev `ID_VENDOR_FROM_DATABASE`
    pub vendor: Option<String>,
    /// Source: udev `ID_VENDOR_ID`
    pub vendor_id: Option<String>,
    /// Source: udev `ID_MODEL_FROM_DATABASE`
    pub model: Option<String>,
    /// `None` when `ethtool` is unavailable or fails for this interface.
    pub features: Option<NicFeatures>,
}

/// Network summary.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct NetInfo {
    /// Interfaces sorted by name.
    pub nics: Vec<NetworkInterface>,
}

/// Host memory summary.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct MemoryInfo {
    /// Online memory blocks × block size; `None` when the memory block tree
    /// is not exposed.
    pub total_physical_bytes: Option<u64>,
    /// Source: `/proc/meminfo` `MemTotal`
    pub total_usable_bytes: u64,
    /// Huge page sizes in bytes.
    pub supported_page_sizes: BTreeSet<u64>,
}

impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processor {} ({} cores, {} threads)",
            self.id, self.cores, self.threads
        )?;
        if !self.model.is_empty() {
            write!(f, " [{}]", self.model)?;
        }
        Ok(())
    }
}

impl fmt::Display for CpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cpu ({} cores, {} threads)",
            self.total_cores, self.total_threads
        )
    }
}

impl fmt::Display for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Core {} ({} hardware threads)", self.id, self.threads())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node {} ({} cores)", self.id, self.cores.len())
    }
}

impl fmt::Display for TopologyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "topology {} ({} nodes)",
            self.architecture,
            self.nodes.len()
        )
    }
}

impl fmt::Display for Disk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/dev/{} ({} MB) [{}] {} - SN #{}",
            self.name,
            self.size_bytes / MB,
            self.bus_type,
            self.vendor,
            self.serial_number
        )
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/dev/{} ({} MB)", self.name, self.size_bytes / MB)?;
        if let Some(fs_type) = &self.fs_type {
            write!(f, " [{}]", fs_type)?;
        }
        if let Some(mount_point) = &self.mount_point {
            write!(f, " mounted@{}", mount_point)?;
        }
        if self.read_only {
            write!(f, " (ro)")?;
        }
        Ok(())
    }
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block ({} disk block devices, {} MB total size)",
            self.disks.len(),
            self.total_size_bytes / MB
        )
    }
}

impl fmt::Display for NetworkInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NIC {}", self.name)?;
        if let Some(mac) = &self.mac {
            write!(f, " ({})", mac)?;
        }
        if let Some(vendor) = &self.vendor {
            write!(f, " [{}]", vendor)?;
        }
        if let Some(model) = &self.model {
            write!(f, " - {}", model)?;
        }
        Ok(())
    }
}

impl fmt::Display for NetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net ({} NICs)", self.nics.len())
    }
}

impl fmt::Display for MemoryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "memory ({} MB usable", self.total_usable_bytes / MB)?;
        if let Some(physical) = self.total_physical_bytes {
            write!(f, ", {} MB physical", physical / MB)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_architecture_from_node_count() {
        assert_eq!(Architecture::from_node_count(0), Architecture::Smp);
        assert_eq!(Architecture::from_node_count(1), Architecture::Smp);
        assert_eq!(Architecture::from_node_count(2), Architecture::Numa);
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&Architecture::Numa).unwrap(), "\"NUMA\"");
        assert_eq!(serde_json::to_string(&BusType::Ide).unwrap(), "\"IDE\"");
    }

    #[test]
    fn test_core_threads() {
        let core = Core {
            id: 3,
            processor_set: BTreeSet::from([3, 7]),
        };
        assert_eq!(core.threads(), 2);
        assert_eq!(core.to_string(), "Core 3 (2 hardware threads)");
    }

    #[test]
    fn test_partition_display() {
        let partition = Partition {
            disk: "sda".to_string(),
            name: "sda1".to_string(),
            size_bytes: 512 * MB,
            fs_type: Some("ext4".to_string()),
            mount_point: Some("/boot".to_string()),
            read_only: false,
        };
        assert_eq!(partition.to_string(), "/dev/sda1 (512 MB) [ext4] mounted@/boot");
    }
}
