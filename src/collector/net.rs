//! Network interface collector backed by `/sys/class/net`, `udevadm` and `ethtool`.

use crate::collector::parser::{parse_decimal, parse_feature_report, parse_udev_properties};
use crate::collector::traits::{CommandRunner, FileSystem};
use crate::collector::{read_dir_source, read_source, run_command};
use crate::config::{ScanPaths, file_name};
use crate::model::{NetInfo, NetworkInterface, NicFeatures};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, trace};

const LOOPBACK: &str = "lo";

/// `addr_assign_type` value of a permanent, burned-in address.
const ADDR_ASSIGN_PERMANENT: u32 = 0;

/// Collects network interface controllers.
pub struct NetCollector<F: FileSystem, R: CommandRunner> {
    fs: F,
    runner: R,
    paths: ScanPaths,
}

impl<F: FileSystem, R: CommandRunner> NetCollector<F, R> {
    /// Creates a new network collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `runner` - Runs `udevadm` and `ethtool`
    /// * `paths` - Pseudo-filesystem roots
    pub fn new(fs: F, runner: R, paths: ScanPaths) -> Self {
        Self { fs, runner, paths }
    }

    /// Enumerates every interface except loopback, sorted by name.
    ///
    /// Nothing in this scan is fatal: missing attributes and failed tools
    /// leave the corresponding fields empty.
    pub fn collect(&self) -> NetInfo {
        let dir = self.paths.net_dir();
        let Some(entries) = read_dir_source(&self.fs, &dir) else {
            return NetInfo::default();
        };

        let mut names: Vec<&str> = entries
            .iter()
            .filter_map(|entry| file_name(entry))
            .filter(|name| *name != LOOPBACK)
            .collect();
        names.sort_unstable();

        let nics: Vec<NetworkInterface> = names
            .into_iter()
            .map(|name| self.interface(name))
            .collect();
        debug!(nics = nics.len(), "collected network interfaces");
        NetInfo { nics }
    }

    /// Runs the feature report for one interface; `None` when it fails.
    pub fn nic_features(&self, name: &str) -> Option<NicFeatures> {
        run_command(&self.runner, "ethtool", &["-k", name])
            .map(|output| parse_feature_report(&output.stdout))
    }

    fn interface(&self, name: &str) -> NetworkInterface {
        let dir = self.paths.net_dir().join(name);
        let mut properties = self.device_properties(name, &dir);

        NetworkInterface {
            name: name.to_string(),
            mac: self.mac_address(&dir),
            bus_type: properties.remove("ID_BUS"),
            driver: properties.remove("ID_NET_DRIVER"),
            vendor: properties.remove("ID_VENDOR_FROM_DATABASE"),
            vendor_id: properties.remove("ID_VENDOR_ID"),
            model: properties.remove("ID_MODEL_FROM_DATABASE"),
            features: self.nic_features(name),
        }
    }

    /// Queries the udev property database unless the interface is virtual.
    fn device_properties(&self, name: &str, dir: &Path) -> BTreeMap<String, String> {
        if self.is_virtual(dir) {
            trace!(iface = name, "virtual interface, skipping udev query");
            return BTreeMap::new();
        }

        let path_arg = format!("--path={}", dir.display());
        let args = ["info", "--query=property", path_arg.as_str()];
        run_command(&self.runner, "udevadm", &args)
            .map(|output| parse_udev_properties(&output.stdout))
            .unwrap_or_default()
    }

    fn is_virtual(&self, dir: &Path) -> bool {
        match self.fs.read_link(dir) {
            Ok(target) => target.components().any(|c| c.as_os_str() == "virtual"),
            Err(e) => {
                trace!(path = ?dir, error = %e, "interface is not a link");
                false
            }
        }
    }

    /// Reads `address` only when `addr_assign_type` marks it as permanent.
    fn mac_address(&self, dir: &Path) -> Option<String> {
        let assign_type: u32 = read_source(&self.fs, &dir.join("addr_assign_type"))
            .and_then(|content| parse_decimal(&content).ok())?;
        if assign_type != ADDR_ASSIGN_PERMANENT {
            trace!(path = ?dir, assign_type, "ignoring non-permanent address");
            return None;
        }

        read_source(&self.fs, &dir.join("address"))
            .map(|address| address.trim().to_string())
            .filter(|address| !address.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, MockRunner};

    const NET: &str = "/sys/class/net";

    const ETHTOOL_ETH0: &str = "Features for eth0:\n\
                                rx-checksumming: on\n\
                                tx-checksumming: on\n\
                                \ttx-checksum-ipv4: off [fixed]\n\
                                loopback: off [fixed]\n";

    fn fixture() -> (MockFs, MockRunner) {
        let mut fs = MockFs::new();
        fs.add_symlink(format!("{NET}/lo"), "../../devices/virtual/net/lo");
        fs.add_symlink(
            format!("{NET}/eth0"),
            "../../devices/pci0000:00/0000:00:19.0/net/eth0",
        );
        fs.add_file(format!("{NET}/eth0/address"), "e0:69:95:03:48:37\n");
        fs.add_file(format!("{NET}/eth0/addr_assign_type"), "0\n");
        fs.add_symlink(format!("{NET}/docker0"), "../../devices/virtual/net/docker0");
        fs.add_file(format!("{NET}/docker0/address"), "02:42:ac:11:00:01\n");
        fs.add_file(format!("{NET}/docker0/addr_assign_type"), "1\n");

        let mut runner = MockRunner::new();
        runner.add_success(
            format!("udevadm info --query=property --path={NET}/eth0"),
            "ID_BUS=pci\nID_NET_DRIVER=e1000e\nID_VENDOR_ID=0x8086\n\
             ID_VENDOR_FROM_DATABASE=Intel Corporation\n\
             ID_MODEL_FROM_DATABASE=82579LM Gigabit Network Connection\n",
        );
        runner.add_success("ethtool -k eth0", ETHTOOL_ETH0);
        runner.add_failure("ethtool -k docker0", 1);

        (fs, runner)
    }

    #[test]
    fn test_collect_skips_loopback() {
        let (fs, runner) = fixture();
        let info = NetCollector::new(fs, runner, ScanPaths::default()).collect();

        let names: Vec<&str> = info.nics.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["docker0", "eth0"]);
    }

    #[test]
    fn test_physical_interface_properties() {
        let (fs, runner) = fixture();
        let info = NetCollector::new(fs, runner, ScanPaths::default()).collect();
        let eth0 = &info.nics[1];

        assert_eq!(eth0.mac.as_deref(), Some("e0:69:95:03:48:37"));
        assert_eq!(eth0.bus_type.as_deref(), Some("pci"));
        assert_eq!(eth0.driver.as_deref(), Some("e1000e"));
        assert_eq!(eth0.vendor.as_deref(), Some("Intel Corporation"));
        assert_eq!(eth0.vendor_id.as_deref(), Some("0x8086"));
        assert!(eth0.model.as_deref().unwrap().starts_with("82579LM"));

        let features = eth0.features.as_ref().unwrap();
        assert!(features.all.contains("loopback"));
        assert!(features.enabled.contains("tx-checksumming"));
        assert!(!features.enabled.contains("tx-checksum-ipv4"));
    }

    #[test]
    fn test_virtual_interface_skips_udev() {
        let (fs, runner) = fixture();
        let info = NetCollector::new(fs, runner.clone(), ScanPaths::default()).collect();
        let docker0 = &info.nics[0];

        assert_eq!(docker0.vendor, None);
        assert_eq!(docker0.driver, None);
        assert_eq!(docker0.features, None);
        assert!(!runner.calls().iter().any(|c| c.contains("udevadm") && c.contains("docker0")));
    }

    #[test]
    fn test_random_address_yields_no_mac() {
        let (fs, runner) = fixture();
        let info = NetCollector::new(fs, runner, ScanPaths::default()).collect();
        assert_eq!(info.nics[0].mac, None);
    }

    #[test]
    fn test_missing_assign_type_yields_no_mac() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{NET}/eth1/address"), "00:11:22:33:44:55\n");
        let info = NetCollector::new(fs, MockRunner::new(), ScanPaths::default()).collect();

        assert_eq!(info.nics.len(), 1);
        assert_eq!(info.nics[0].mac, None);
        assert_eq!(info.nics[0].features, None);
    }

    #[test]
    fn test_nic_features_reruns_command() {
        let (fs, runner) = fixture();
        let collector = NetCollector::new(fs, runner.clone(), ScanPaths::default());

        assert!(collector.nic_features("eth0").is_some());
        assert!(collector.nic_features("eth0").is_some());
        assert!(collector.nic_features("wlan0").is_none());
        assert_eq!(runner.calls().len(), 3);
    }

    #[test]
    fn test_missing_net_dir_yields_empty() {
        let info = NetCollector::new(MockFs::new(), MockRunner::new(), ScanPaths::default()).collect();
        assert!(info.nics.is_empty());
    }
}
