//! NUMA topology collector backed by `/sys/devices/system/node`.
//!
//! ```text
//! /sys/devices/system/node/
//! ├── node0/
//! │   ├── cpumap            hex mask of logical processors
//! │   ├── cpulist           (ignored, shares the `cpu` prefix)
//! │   ├── cpu0/topology/core_id
//! │   └── cpu1/topology/core_id
//! └── node1/ ...
//! ```

use crate::collector::error::CollectError;
use crate::collector::parser::{parse_decimal, parse_hex_bitmask, parse_indexed_name};
use crate::collector::traits::FileSystem;
use crate::collector::{read_dir_source, read_source};
use crate::config::{ScanPaths, file_name};
use crate::model::{Architecture, Core, Node, TopologyInfo};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, trace};

/// Collects NUMA nodes and the cores inside them.
///
/// The collector needs the host's logical processor count, which comes from
/// the CPU collector; it is passed in explicitly.
pub struct TopologyCollector<F: FileSystem> {
    fs: F,
    paths: ScanPaths,
}

impl<F: FileSystem> TopologyCollector<F> {
    /// Creates a new topology collector.
    pub fn new(fs: F, paths: ScanPaths) -> Self {
        Self { fs, paths }
    }

    /// Enumerates every `node<N>` directory.
    ///
    /// # Arguments
    /// * `total_threads` - host logical processor count; bits of a node mask
    ///   at or above it are ignored
    ///
    /// A host without the node directory yields an empty node list.
    pub fn collect(&self, total_threads: usize) -> Result<TopologyInfo, CollectError> {
        let dir = self.paths.node_dir();
        let Some(entries) = read_dir_source(&self.fs, &dir) else {
            return Ok(TopologyInfo::default());
        };

        let mut ids: Vec<u32> = entries
            .iter()
            .filter_map(|entry| file_name(entry))
            .filter_map(|name| parse_indexed_name(name, "node"))
            .collect();
        ids.sort_unstable();

        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            nodes.push(Node {
                id,
                processor_set: self.node_processor_set(id, total_threads)?,
                cores: self.node_cores(id)?,
            });
        }

        debug!(nodes = nodes.len(), "collected topology");
        Ok(TopologyInfo {
            architecture: Architecture::from_node_count(nodes.len()),
            nodes,
        })
    }

    /// Returns the logical processors associated with `node_id`.
    ///
    /// A missing `cpumap` yields an empty set; a malformed one is an error.
    pub fn node_processor_set(
        &self,
        node_id: u32,
        total_threads: usize,
    ) -> Result<BTreeSet<usize>, CollectError> {
        let path = self.node_path(node_id).join("cpumap");
        let Some(content) = read_source(&self.fs, &path) else {
            return Ok(BTreeSet::new());
        };
        let mask = parse_hex_bitmask(&content).map_err(|e| CollectError::parse(&path, e))?;
        Ok(mask.positions(total_threads))
    }

    /// Returns the physical cores of `node_id`, sorted by core id.
    ///
    /// Logical processors are the `cpu<N>` subdirectories of the node; the
    /// `cpumap` and `cpulist` files share the prefix and are skipped.
    pub fn node_cores(&self, node_id: u32) -> Result<Vec<Core>, CollectError> {
        let dir = self.node_path(node_id);
        let Some(entries) = read_dir_source(&self.fs, &dir) else {
            return Ok(Vec::new());
        };

        let mut cores: BTreeMap<u32, BTreeSet<usize>> = BTreeMap::new();
        for entry in entries {
            let Some(processor) = file_name(&entry).and_then(|name| parse_indexed_name(name, "cpu"))
            else {
                continue;
            };
            if !self.fs.is_dir(&entry) {
                trace!(path = ?entry, "skipping non-directory cpu entry");
                continue;
            }

            let path = entry.join("topology/core_id");
            let Some(content) = read_source(&self.fs, &path) else {
                continue;
            };
            let core_id: u32 = parse_decimal(&content).map_err(|e| CollectError::parse(&path, e))?;
            cores.entry(core_id).or_default().insert(processor as usize);
        }

        Ok(cores
            .into_iter()
            .map(|(id, processor_set)| Core { id, processor_set })
            .collect())
    }

    fn node_path(&self, node_id: u32) -> PathBuf {
        self.paths.node_dir().join(format!("node{}", node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    const NODE: &str = "/sys/devices/system/node";

    fn add_cpu(fs: &mut MockFs, node: u32, cpu: u32, core: u32) {
        fs.add_file(
            format!("{NODE}/node{node}/cpu{cpu}/topology/core_id"),
            format!("{core}\n"),
        );
    }

    fn collector(fs: MockFs) -> TopologyCollector<MockFs> {
        TopologyCollector::new(fs, ScanPaths::default())
    }

    #[test]
    fn test_single_node_is_smp() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{NODE}/node0/cpumap"), "f\n");
        fs.add_file(format!("{NODE}/node0/cpulist"), "0-3\n");
        fs.add_file(format!("{NODE}/online"), "0\n");
        fs.add_file(format!("{NODE}/has_cpu"), "0\n");
        add_cpu(&mut fs, 0, 0, 0);
        add_cpu(&mut fs, 0, 1, 1);
        add_cpu(&mut fs, 0, 2, 0);
        add_cpu(&mut fs, 0, 3, 1);

        let info = collector(fs).collect(4).unwrap();

        assert_eq!(info.architecture, Architecture::Smp);
        assert_eq!(info.nodes.len(), 1);
        let node = &info.nodes[0];
        assert_eq!(node.processor_set, BTreeSet::from([0, 1, 2, 3]));
        assert_eq!(node.cores.len(), 2);
        assert_eq!(node.cores[0].processor_set, BTreeSet::from([0, 2]));
        assert_eq!(node.cores[1].processor_set, BTreeSet::from([1, 3]));
    }

    #[test]
    fn test_two_nodes_partition_processors() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{NODE}/node0/cpumap"), "00000000,00000033\n");
        fs.add_file(format!("{NODE}/node1/cpumap"), "00000000,000000cc\n");
        for (cpu, node, core) in [(0, 0, 0), (1, 0, 1), (4, 0, 0), (5, 0, 1)] {
            add_cpu(&mut fs, node, cpu, core);
        }
        for (cpu, node, core) in [(2, 1, 0), (3, 1, 1), (6, 1, 0), (7, 1, 1)] {
            add_cpu(&mut fs, node, cpu, core);
        }

        let info = collector(fs).collect(8).unwrap();

        assert_eq!(info.architecture, Architecture::Numa);
        assert_eq!(info.nodes.len(), 2);

        let union: BTreeSet<usize> = info
            .nodes
            .iter()
            .flat_map(|n| n.processor_set.iter().copied())
            .collect();
        assert_eq!(union, (0..8).collect());
        assert!(info.nodes[0].processor_set.is_disjoint(&info.nodes[1].processor_set));
        assert_eq!(info.nodes[1].cores[0].processor_set, BTreeSet::from([2, 6]));
    }

    #[test]
    fn test_mask_bits_beyond_thread_count_ignored() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{NODE}/node0/cpumap"), "3\n");

        let collector = collector(fs);
        assert_eq!(
            collector.node_processor_set(0, 4).unwrap(),
            BTreeSet::from([0, 1])
        );
        assert_eq!(
            collector.node_processor_set(0, 1).unwrap(),
            BTreeSet::from([0])
        );
    }

    #[test]
    fn test_missing_node_directory_yields_empty() {
        let info = collector(MockFs::new()).collect(4).unwrap();
        assert!(info.nodes.is_empty());
        assert_eq!(info.architecture, Architecture::Smp);
    }

    #[test]
    fn test_malformed_cpumap_is_parse_failure() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{NODE}/node0/cpumap"), "not-hex\n");
        assert!(collector(fs).collect(4).is_err());
    }

    #[test]
    fn test_malformed_core_id_is_parse_failure() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{NODE}/node0/cpumap"), "1\n");
        fs.add_file(format!("{NODE}/node0/cpu0/topology/core_id"), "zero\n");
        assert!(collector(fs).node_cores(0).is_err());
    }

    #[test]
    fn test_cpu_without_core_id_is_skipped() {
        let mut fs = MockFs::new();
        fs.add_dir(format!("{NODE}/node0/cpu0"));
        add_cpu(&mut fs, 0, 1, 0);

        let cores = collector(fs).node_cores(0).unwrap();
        assert_eq!(cores.len(), 1);
        assert_eq!(cores[0].processor_set, BTreeSet::from([1]));
    }
}
