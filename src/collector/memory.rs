//! Memory collector backed by `/proc/meminfo` and the sysfs memory trees.

use crate::collector::error::{CollectError, ParseError};
use crate::collector::parser::{
    parse_hex_u64, parse_hugepage_size, parse_indexed_name, parse_meminfo_total,
};
use crate::collector::traits::FileSystem;
use crate::collector::{read_dir_source, read_source};
use crate::config::{ScanPaths, file_name};
use crate::model::MemoryInfo;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Collects memory totals and supported page sizes.
pub struct MemoryCollector<F: FileSystem> {
    fs: F,
    paths: ScanPaths,
}

impl<F: FileSystem> MemoryCollector<F> {
    /// Creates a new memory collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `paths` - Pseudo-filesystem roots
    pub fn new(fs: F, paths: ScanPaths) -> Self {
        Self { fs, paths }
    }

    /// Reads usable and physical totals and the huge page sizes.
    ///
    /// Missing sources yield sentinels; malformed content fails the scan.
    pub fn collect(&self) -> Result<MemoryInfo, CollectError> {
        let info = MemoryInfo {
            total_physical_bytes: self.total_physical_bytes()?,
            total_usable_bytes: self.total_usable_bytes()?,
            supported_page_sizes: self.supported_page_sizes()?,
        };
        debug!(
            physical = ?info.total_physical_bytes,
            usable = info.total_usable_bytes,
            page_sizes = info.supported_page_sizes.len(),
            "collected memory info"
        );
        Ok(info)
    }

    /// `MemTotal` in bytes; 0 when `/proc/meminfo` is missing.
    pub fn total_usable_bytes(&self) -> Result<u64, CollectError> {
        let path = self.paths.meminfo();
        match read_source(&self.fs, &path) {
            Some(content) => {
                parse_meminfo_total(&content).map_err(|e| CollectError::parse(&path, e))
            }
            None => Ok(0),
        }
    }

    /// Block size times the number of online memory blocks.
    ///
    /// `None` when the memory-block tree is not exposed.
    pub fn total_physical_bytes(&self) -> Result<Option<u64>, CollectError> {
        let dir = self.paths.memory_block_dir();
        let path = dir.join("block_size_bytes");
        let Some(content) = read_source(&self.fs, &path) else {
            return Ok(None);
        };
        let block_size = parse_hex_u64(&content).map_err(|e| CollectError::parse(&path, e))?;

        let Some(entries) = read_dir_source(&self.fs, &dir) else {
            return Ok(None);
        };
        let online = entries
            .iter()
            .filter(|entry| {
                file_name(entry).and_then(|name| parse_indexed_name(name, "memory")).is_some()
            })
            .filter(|entry| {
                read_source(&self.fs, &entry.join("state")).is_some_and(|s| s.trim() == "online")
            })
            .count() as u64;

        let total = block_size.checked_mul(online).ok_or_else(|| {
            CollectError::parse(
                &path,
                ParseError::new(format!("{} online blocks overflow a byte count", online)),
            )
        })?;
        Ok(Some(total))
    }

    /// Page sizes in bytes, decoded from the `hugepages-<n>kB` directories.
    pub fn supported_page_sizes(&self) -> Result<BTreeSet<u64>, CollectError> {
        let Some(entries) = read_dir_source(&self.fs, &self.paths.hugepages_dir()) else {
            return Ok(BTreeSet::new());
        };

        let mut sizes = BTreeSet::new();
        for entry in entries {
            if !self.fs.is_dir(&entry) {
                trace!(path = ?entry, "skipping non-directory hugepage entry");
                continue;
            }
            let Some(name) = file_name(&entry) else {
                continue;
            };
            sizes.insert(parse_hugepage_size(name).map_err(|e| CollectError::parse(&entry, e))?);
        }
        Ok(sizes)
    }
}
