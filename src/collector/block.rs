//! Block device collector backed by `/sys/block` and `/dev/disk/by-id`.
//!
//! Only SCSI (`sd*`) and IDE (`hd*`) disks are reported. Partition mount
//! state comes from `findmnt`, since sysfs does not know about mounts.

use crate::collector::error::{CollectError, ParseError};
use crate::collector::parser::{parse_decimal, serial_from_link_name};
use crate::collector::traits::{CommandRunner, FileSystem};
use crate::collector::{read_dir_source, read_source, run_command};
use crate::config::{ScanPaths, file_name};
use crate::model::{BlockInfo, BusType, Disk, Partition};
use std::path::Path;
use tracing::{debug, trace};

/// Size in bytes of the sector unit used by sysfs `size` files.
pub const SECTOR_SIZE: u64 = 512;

const UNKNOWN: &str = "unknown";

/// Classifies a `/sys/block` entry name as a disk, by its `sd`/`hd` prefix.
pub fn bus_type_for(name: &str) -> Option<BusType> {
    match name.as_bytes() {
        [b's', b'd', ..] => Some(BusType::Scsi),
        [b'h', b'd', ..] => Some(BusType::Ide),
        _ => None,
    }
}

/// Collects disks and their partitions.
pub struct BlockCollector<F: FileSystem, R: CommandRunner> {
    fs: F,
    runner: R,
    paths: ScanPaths,
}

impl<F: FileSystem, R: CommandRunner> BlockCollector<F, R> {
    /// Creates a new block collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `runner` - Runs `findmnt` for partition mount state
    /// * `paths` - Pseudo-filesystem roots
    pub fn new(fs: F, runner: R, paths: ScanPaths) -> Self {
        Self { fs, runner, paths }
    }

    /// Enumerates disks once and derives the total size from that same pass.
    pub fn collect(&self) -> Result<BlockInfo, CollectError> {
        let disks = self.disks()?;
        let total_size_bytes = self.sum_sizes(disks.iter().map(|d| d.size_bytes))?;

        debug!(disks = disks.len(), total_size_bytes, "collected block devices");
        Ok(BlockInfo {
            total_size_bytes,
            disks,
        })
    }

    /// Enumerates every disk with vendor, serial number and partitions.
    pub fn disks(&self) -> Result<Vec<Disk>, CollectError> {
        let serial_links = self.serial_links();

        let mut disks = Vec::new();
        for (name, bus_type) in self.disk_names() {
            disks.push(Disk {
                size_bytes: self.disk_size_bytes(&name)?,
                bus_type,
                vendor: self.vendor(&name),
                serial_number: serial_for(&name, &serial_links),
                partitions: self.partitions(&name)?,
                name,
            });
        }
        Ok(disks)
    }

    /// Sums disk sizes over a fresh enumeration.
    ///
    /// This does not consult partitions or external tools, and it is not
    /// guaranteed to agree with an earlier [`disks`](Self::disks) call.
    pub fn total_size_bytes(&self) -> Result<u64, CollectError> {
        let mut sizes = Vec::new();
        for (name, _) in self.disk_names() {
            sizes.push(self.disk_size_bytes(&name)?);
        }
        self.sum_sizes(sizes)
    }

    /// Returns the capacity of the named disk, or 0 when it has no `size` source.
    pub fn disk_size_bytes(&self, disk: &str) -> Result<u64, CollectError> {
        self.read_size(&self.paths.block_dir().join(disk).join("size"))
    }

    fn disk_names(&self) -> Vec<(String, BusType)> {
        let Some(entries) = read_dir_source(&self.fs, &self.paths.block_dir()) else {
            return Vec::new();
        };

        let mut names: Vec<(String, BusType)> = entries
            .iter()
            .filter_map(|entry| file_name(entry))
            .filter_map(|name| {
                let bus_type = bus_type_for(name);
                if bus_type.is_none() {
                    trace!(device = name, "skipping non-disk block device");
                }
                bus_type.map(|bus| (name.to_string(), bus))
            })
            .collect();
        names.sort();
        names
    }

    fn vendor(&self, disk: &str) -> String {
        let path = self.paths.block_dir().join(disk).join("device/vendor");
        read_source(&self.fs, &path)
            .map(|vendor| vendor.trim().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// Pairs each `/dev/disk/by-id` link name with the base name of its target.
    fn serial_links(&self) -> Vec<(String, String)> {
        let Some(entries) = read_dir_source(&self.fs, &self.paths.disk_by_id_dir()) else {
            return Vec::new();
        };

        let mut links = Vec::new();
        for entry in entries {
            let Some(link_name) = file_name(&entry) else {
                continue;
            };
            match self.fs.read_link(&entry) {
                Ok(target) => {
                    if let Some(device) = file_name(&target) {
                        links.push((link_name.to_string(), device.to_string()));
                    }
                }
                Err(e) => trace!(path = ?entry, error = %e, "unreadable by-id link"),
            }
        }
        links.sort();
        links
    }

    fn partitions(&self, disk: &str) -> Result<Vec<Partition>, CollectError> {
        let disk_dir = self.paths.block_dir().join(disk);
        let Some(entries) = read_dir_source(&self.fs, &disk_dir) else {
            return Ok(Vec::new());
        };

        let mut names: Vec<&str> = entries
            .iter()
            .filter_map(|entry| file_name(entry))
            .filter(|name| name.starts_with(disk))
            .collect();
        names.sort_unstable();

        let mut partitions = Vec::with_capacity(names.len());
        for name in names {
            partitions.push(Partition {
                disk: disk.to_string(),
                name: name.to_string(),
                size_bytes: self.partition_size_bytes(name)?,
                fs_type: self.findmnt(name, "FSTYPE"),
                mount_point: self.findmnt(name, "TARGET"),
                read_only: self.read_only(&disk_dir.join(name)),
            });
        }
        Ok(partitions)
    }

    /// Locates the partition's `size` under the directory named by the first
    /// three characters of the partition name (`sda1` -> `sda/sda1/size`).
    fn partition_size_bytes(&self, partition: &str) -> Result<u64, CollectError> {
        let Some(disk) = partition.get(..3) else {
            return Ok(0);
        };
        self.read_size(&self.paths.block_dir().join(disk).join(partition).join("size"))
    }

    fn read_only(&self, partition_dir: &Path) -> bool {
        read_source(&self.fs, &partition_dir.join("ro")).is_some_and(|ro| ro.trim() == "1")
    }

    fn read_size(&self, path: &Path) -> Result<u64, CollectError> {
        let Some(content) = read_source(&self.fs, path) else {
            return Ok(0);
        };
        let sectors: u64 = parse_decimal(&content).map_err(|e| CollectError::parse(path, e))?;
        sectors.checked_mul(SECTOR_SIZE).ok_or_else(|| {
            CollectError::parse(
                path,
                ParseError::new(format!("{} sectors overflow a byte count", sectors)),
            )
        })
    }

    fn sum_sizes(&self, sizes: impl IntoIterator<Item = u64>) -> Result<u64, CollectError> {
        sizes
            .into_iter()
            .try_fold(0u64, |total, size| total.checked_add(size))
            .ok_or_else(|| {
                CollectError::parse(
                    self.paths.block_dir(),
                    ParseError::new("total disk size overflows u64"),
                )
            })
    }

    /// Asks `findmnt` for one output column; `None` means not mounted.
    fn findmnt(&self, partition: &str, column: &str) -> Option<String> {
        let device = self.paths.device_node(partition);
        let device = device.to_string_lossy();
        let output = run_command(
            &self.runner,
            "findmnt",
            &[&*device, "--noheadings", "--output", column],
        )?;
        let value = output.stdout.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// Finds the serial in the first link (by name) whose target is `disk`.
fn serial_for(disk: &str, links: &[(String, String)]) -> String {
    links
        .iter()
        .filter(|(_, target)| target == disk)
        .find_map(|(link, _)| serial_from_link_name(link))
        .unwrap_or(UNKNOWN)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, MockRunner};
    use std::path::PathBuf;

    fn findmnt(part: &str, column: &str) -> String {
        format!("findmnt /dev/{part} --noheadings --output {column}")
    }

    fn fixture() -> (MockFs, MockRunner) {
        let mut fs = MockFs::new();
        fs.add_file("/sys/block/sda/size", "1953525168\n");
        fs.add_file("/sys/block/sda/device/vendor", "ATA     \n");
        fs.add_file("/sys/block/sda/sda1/size", "1048576\n");
        fs.add_file("/sys/block/sda/sda1/ro", "0\n");
        fs.add_file("/sys/block/sda/sda2/size", "1952474549\n");
        fs.add_file("/sys/block/sda/sda2/ro", "1\n");
        fs.add_file("/sys/block/sda/queue/rotational", "1\n");
        fs.add_file("/sys/block/hdb/size", "2048\n");
        fs.add_dir("/sys/block/loop0");
        fs.add_dir("/sys/block/nvme0n1");
        fs.add_symlink("/dev/disk/by-id/ata-WDC_WD10EZEX", "../../sda");
        fs.add_symlink("/dev/disk/by-id/ata-WDC_WD10EZEX-part1", "../../sda1");

        let mut runner = MockRunner::new();
        runner.add_success(findmnt("sda1", "FSTYPE"), "vfat\n");
        runner.add_success(findmnt("sda1", "TARGET"), "/boot/efi\n");
        runner.add_failure(findmnt("sda2", "FSTYPE"), 1);
        runner.add_failure(findmnt("sda2", "TARGET"), 1);

        (fs, runner)
    }

    fn collector(fs: MockFs, runner: MockRunner) -> BlockCollector<MockFs, MockRunner> {
        BlockCollector::new(fs, runner, ScanPaths::default())
    }

    #[test]
    fn test_bus_type_for() {
        assert_eq!(bus_type_for("sda"), Some(BusType::Scsi));
        assert_eq!(bus_type_for("hdc"), Some(BusType::Ide));
        assert_eq!(bus_type_for("sr0"), None);
        assert_eq!(bus_type_for("nvme0n1"), None);
        assert_eq!(bus_type_for("s"), None);
    }

    #[test]
    fn test_collect_disks() {
        let (fs, runner) = fixture();
        let info = collector(fs, runner).collect().unwrap();

        assert_eq!(info.disks.len(), 2);
        let hdb = &info.disks[0];
        let sda = &info.disks[1];

        assert_eq!(hdb.name, "hdb");
        assert_eq!(hdb.bus_type, BusType::Ide);
        assert_eq!(hdb.vendor, "unknown");
        assert_eq!(hdb.serial_number, "unknown");

        assert_eq!(sda.bus_type, BusType::Scsi);
        assert_eq!(sda.size_bytes, 1953525168 * 512);
        assert_eq!(sda.vendor, "ATA");
        assert_eq!(sda.serial_number, "WDC_WD10EZEX");
        assert_eq!(info.total_size_bytes, sda.size_bytes + hdb.size_bytes);
    }

    #[test]
    fn test_partitions() {
        let (fs, runner) = fixture();
        let disks = collector(fs, runner).disks().unwrap();
        let sda = disks.iter().find(|d| d.name == "sda").unwrap();

        assert_eq!(sda.partitions.len(), 2);
        let boot = &sda.partitions[0];
        assert_eq!(boot.disk, "sda");
        assert_eq!(boot.name, "sda1");
        assert_eq!(boot.size_bytes, 1048576 * 512);
        assert_eq!(boot.fs_type.as_deref(), Some("vfat"));
        assert_eq!(boot.mount_point.as_deref(), Some("/boot/efi"));
        assert!(!boot.read_only);

        let data = &sda.partitions[1];
        assert_eq!(data.fs_type, None);
        assert_eq!(data.mount_point, None);
        assert!(data.read_only);
    }

    #[test]
    fn test_sizes_are_sector_multiples() {
        let (fs, runner) = fixture();
        let disks = collector(fs, runner).disks().unwrap();
        for disk in &disks {
            assert_eq!(disk.size_bytes % SECTOR_SIZE, 0);
            for partition in &disk.partitions {
                assert_eq!(partition.size_bytes % SECTOR_SIZE, 0);
            }
        }
    }

    #[test]
    fn test_missing_size_is_zero() {
        let mut fs = MockFs::new();
        fs.add_dir("/sys/block/sdz");
        let collector = collector(fs, MockRunner::new());

        assert_eq!(collector.disk_size_bytes("sdz").unwrap(), 0);
        assert_eq!(collector.disk_size_bytes("sdy").unwrap(), 0);
        let disks = collector.disks().unwrap();
        assert_eq!(disks[0].size_bytes, 0);
    }

    #[test]
    fn test_sector_count_overflow_is_parse_failure() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/block/sda/size", "36028797018963968\n");
        let collector = collector(fs, MockRunner::new());

        let err = collector.disk_size_bytes("sda").unwrap_err();
        let CollectError::Parse { path, source } = err;
        assert_eq!(path, PathBuf::from("/sys/block/sda/size"));
        assert!(source.message.contains("overflow"));
    }

    #[test]
    fn test_total_size_overflow_is_parse_failure() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/block/sda/size", "18014398509481984\n");
        fs.add_file("/sys/block/sdb/size", "18014398509481984\n");
        let collector = collector(fs, MockRunner::new());

        assert!(collector.disk_size_bytes("sda").is_ok());
        assert!(collector.total_size_bytes().is_err());
        assert!(collector.collect().is_err());
    }

    #[test]
    fn test_malformed_size_is_parse_failure() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/block/sda/size", "many\n");
        assert!(collector(fs, MockRunner::new()).collect().is_err());
    }

    #[test]
    fn test_missing_findmnt_means_not_mounted() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/block/sdb/size", "100\n");
        fs.add_file("/sys/block/sdb/sdb1/size", "50\n");
        let disks = collector(fs, MockRunner::new()).disks().unwrap();

        let partition = &disks[0].partitions[0];
        assert_eq!(partition.fs_type, None);
        assert_eq!(partition.mount_point, None);
    }

    #[test]
    fn test_total_size_re_enumerates() {
        let (fs, runner) = fixture();
        let collector = collector(fs, runner.clone());
        let total = collector.total_size_bytes().unwrap();

        assert_eq!(total, (1953525168 + 2048) * 512);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_unsupported_device_names_have_no_partition_size() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/block/sd/size", "8\n");
        fs.add_file("/sys/block/sd/sd1/size", "4\n");
        let disks = collector(fs, MockRunner::new()).disks().unwrap();

        // partition size lookup uses a three character disk prefix
        assert_eq!(disks[0].partitions[0].size_bytes, 0);
    }

    #[test]
    fn test_missing_block_dir_yields_empty() {
        let info = collector(MockFs::new(), MockRunner::new()).collect().unwrap();
        assert!(info.disks.is_empty());
        assert_eq!(info.total_size_bytes, 0);
    }
}
