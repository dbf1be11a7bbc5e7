//! Platform-dispatched facade over the collectors.
//!
//! Full subsystem scans go through a [`ScanCache`] and run at most once per
//! `Inventory`. Queries that take an argument, and the disk list and disk
//! totals, read their sources again on every call.

use crate::cache::ScanCache;
use crate::collector::{
    BlockCollector, CollectError, CommandRunner, CpuCollector, FileSystem, MemoryCollector,
    NetCollector, RealFs, RealRunner, TopologyCollector,
};
use crate::config::ScanPaths;
use crate::model::{
    BlockInfo, Core, CpuInfo, Disk, MemoryInfo, NetInfo, NicFeatures, TopologyInfo,
};
use crate::platform::{Discovery, Platform};
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

/// Result of a facade call: a parse failure, or a discovery outcome.
pub type DiscoveryResult<T> = Result<Discovery<T>, CollectError>;

static HOST: LazyLock<Inventory<RealFs, RealRunner>> = LazyLock::new(|| {
    Inventory::new(
        Platform::current(),
        RealFs::new(),
        RealRunner::new(),
        ScanPaths::default(),
    )
});

/// Returns the process-wide inventory of the running host.
///
/// Its caches live for the whole process, so hardware or mount changes after
/// the first scan are not observed.
pub fn host() -> &'static Inventory<RealFs, RealRunner> {
    &HOST
}

/// Hardware inventory of one host.
pub struct Inventory<F, R>
where
    F: FileSystem + Clone,
    R: CommandRunner + Clone,
{
    platform: Platform,
    fs: F,
    runner: R,
    paths: ScanPaths,
    cpu: ScanCache<CpuInfo>,
    topology: ScanCache<TopologyInfo>,
    block: ScanCache<BlockInfo>,
    net: ScanCache<NetInfo>,
    memory: ScanCache<MemoryInfo>,
}

impl<F, R> Inventory<F, R>
where
    F: FileSystem + Clone,
    R: CommandRunner + Clone,
{
    /// Creates an inventory with empty caches.
    ///
    /// # Arguments
    /// * `platform` - Selects the discovery backend
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `runner` - Command runner implementation (real or mock)
    /// * `paths` - Pseudo-filesystem roots
    pub fn new(platform: Platform, fs: F, runner: R, paths: ScanPaths) -> Self {
        if !platform.is_supported() {
            info!(platform = %platform, "no discovery backend for platform");
        }
        Self {
            platform,
            fs,
            runner,
            paths,
            cpu: ScanCache::new(),
            topology: ScanCache::new(),
            block: ScanCache::new(),
            net: ScanCache::new(),
            memory: ScanCache::new(),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn paths(&self) -> &ScanPaths {
        &self.paths
    }

    /// Runs `linux` on Linux; any other platform yields `Unsupported`.
    fn dispatch<T>(&self, linux: impl FnOnce() -> Result<T, CollectError>) -> DiscoveryResult<T> {
        match &self.platform {
            Platform::Linux => linux().map(Discovery::Found),
            Platform::Unsupported(_) => Ok(Discovery::Unsupported(self.platform.clone())),
        }
    }

    fn cpu_collector(&self) -> CpuCollector<F> {
        CpuCollector::new(self.fs.clone(), self.paths.clone())
    }

    fn topology_collector(&self) -> TopologyCollector<F> {
        TopologyCollector::new(self.fs.clone(), self.paths.clone())
    }

    fn block_collector(&self) -> BlockCollector<F, R> {
        BlockCollector::new(self.fs.clone(), self.runner.clone(), self.paths.clone())
    }

    fn net_collector(&self) -> NetCollector<F, R> {
        NetCollector::new(self.fs.clone(), self.runner.clone(), self.paths.clone())
    }

    fn memory_collector(&self) -> MemoryCollector<F> {
        MemoryCollector::new(self.fs.clone(), self.paths.clone())
    }

    // Cached full scans

    pub fn cpu(&self) -> DiscoveryResult<Arc<CpuInfo>> {
        self.dispatch(|| self.cpu.get_or_scan(|| self.cpu_collector().collect()))
    }

    /// NUMA layout; node masks are bounded by the cached CPU thread count.
    pub fn topology(&self) -> DiscoveryResult<Arc<TopologyInfo>> {
        self.dispatch(|| {
            self.topology.get_or_scan(|| {
                let threads = self.linux_total_threads()?;
                self.topology_collector().collect(threads)
            })
        })
    }

    pub fn block(&self) -> DiscoveryResult<Arc<BlockInfo>> {
        self.dispatch(|| self.block.get_or_scan(|| self.block_collector().collect()))
    }

    pub fn net(&self) -> DiscoveryResult<Arc<NetInfo>> {
        self.dispatch(|| {
            self.net
                .get_or_scan(|| Ok::<_, CollectError>(self.net_collector().collect()))
        })
    }

    pub fn memory(&self) -> DiscoveryResult<Arc<MemoryInfo>> {
        self.dispatch(|| self.memory.get_or_scan(|| self.memory_collector().collect()))
    }

    // Convenience values read from the cached scans

    pub fn total_cores(&self) -> DiscoveryResult<u32> {
        Ok(self.cpu()?.map(|cpu| cpu.total_cores))
    }

    pub fn total_threads(&self) -> DiscoveryResult<u32> {
        Ok(self.cpu()?.map(|cpu| cpu.total_threads))
    }

    pub fn total_usable_bytes(&self) -> DiscoveryResult<u64> {
        Ok(self.memory()?.map(|memory| memory.total_usable_bytes))
    }

    pub fn total_physical_bytes(&self) -> DiscoveryResult<Option<u64>> {
        Ok(self.memory()?.map(|memory| memory.total_physical_bytes))
    }

    pub fn supported_page_sizes(&self) -> DiscoveryResult<BTreeSet<u64>> {
        Ok(self.memory()?.map(|memory| memory.supported_page_sizes.clone()))
    }

    // Uncached queries

    /// Enumerates disks without touching the block cache.
    pub fn disks(&self) -> DiscoveryResult<Vec<Disk>> {
        self.dispatch(|| self.block_collector().disks())
    }

    /// Sums disk sizes over a fresh enumeration.
    ///
    /// Use [`block`](Self::block) when the total must agree with the disk list.
    pub fn total_disk_size_bytes(&self) -> DiscoveryResult<u64> {
        self.dispatch(|| self.block_collector().total_size_bytes())
    }

    pub fn disk_size_bytes(&self, disk: &str) -> DiscoveryResult<u64> {
        self.dispatch(|| self.block_collector().disk_size_bytes(disk))
    }

    /// Runs the feature report for one interface; `None` when it fails.
    pub fn nic_features(&self, name: &str) -> Discovery<Option<NicFeatures>> {
        match &self.platform {
            Platform::Linux => Discovery::Found(self.net_collector().nic_features(name)),
            Platform::Unsupported(_) => Discovery::Unsupported(self.platform.clone()),
        }
    }

    pub fn node_processor_set(&self, node_id: u32) -> DiscoveryResult<BTreeSet<usize>> {
        self.dispatch(|| {
            let threads = self.linux_total_threads()?;
            self.topology_collector().node_processor_set(node_id, threads)
        })
    }

    pub fn node_cores(&self, node_id: u32) -> DiscoveryResult<Vec<Core>> {
        self.dispatch(|| self.topology_collector().node_cores(node_id))
    }

    fn linux_total_threads(&self) -> Result<usize, CollectError> {
        let cpu = self.cpu.get_or_scan(|| self.cpu_collector().collect())?;
        debug!(threads = cpu.total_threads, "using cached thread count");
        Ok(cpu.total_threads as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::scenarios::{dual_socket_numa_host, single_socket_host};
    use crate::collector::mock::{MockFs, MockRunner};

    fn inventory(fs: MockFs, runner: MockRunner) -> Inventory<MockFs, MockRunner> {
        Inventory::new(Platform::Linux, fs, runner, ScanPaths::default())
    }

    #[test]
    fn test_cpu_scan_is_cached() {
        let (fs, runner) = single_socket_host();
        let inventory = inventory(fs.clone(), runner);

        let first = inventory.cpu().unwrap().found().unwrap();
        let reads = fs.read_count();
        let second = inventory.cpu().unwrap().found().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.read_count(), reads);
        assert_eq!(inventory.total_cores().unwrap(), Discovery::Found(4));
        assert_eq!(inventory.total_threads().unwrap(), Discovery::Found(8));
        assert_eq!(fs.read_count(), reads);
    }

    #[test]
    fn test_topology_uses_cpu_thread_count() {
        let (fs, runner) = dual_socket_numa_host();
        let inventory = inventory(fs, runner);

        let topology = inventory.topology().unwrap().found().unwrap();
        assert_eq!(topology.nodes.len(), 2);
        assert_eq!(inventory.cpu.scan_count(), 1);
        assert_eq!(
            inventory.node_processor_set(0).unwrap(),
            Discovery::Found(BTreeSet::from([0, 1, 4, 5]))
        );
        assert_eq!(inventory.cpu.scan_count(), 1);
    }

    #[test]
    fn test_uncached_queries_reread() {
        let (fs, runner) = single_socket_host();
        let inventory = inventory(fs.clone(), runner.clone());

        inventory.disks().unwrap();
        let reads = fs.read_count();
        let calls = runner.calls().len();
        inventory.disks().unwrap();

        assert!(fs.read_count() > reads);
        assert!(runner.calls().len() > calls);
        assert!(inventory.block.get().is_none());
    }

    #[test]
    fn test_unsupported_platform() {
        let (fs, runner) = single_socket_host();
        let inventory = Inventory::new(
            Platform::from_name("sunos"),
            fs.clone(),
            runner.clone(),
            ScanPaths::default(),
        );

        assert!(!inventory.cpu().unwrap().is_supported());
        assert!(!inventory.topology().unwrap().is_supported());
        assert!(!inventory.block().unwrap().is_supported());
        assert!(!inventory.net().unwrap().is_supported());
        assert!(!inventory.memory().unwrap().is_supported());
        assert!(!inventory.disk_size_bytes("sda").unwrap().is_supported());
        assert!(!inventory.nic_features("eth0").is_supported());
        assert_eq!(fs.read_count(), 0);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_parse_failure_is_not_cached() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/cpuinfo", "processor : 0\n\n");
        let inventory = inventory(fs, MockRunner::new());

        assert!(inventory.cpu().is_err());
        assert!(inventory.cpu().is_err());
        assert_eq!(inventory.cpu.scan_count(), 2);
    }
}
