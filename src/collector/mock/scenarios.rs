//! Pre-built host scenarios for testing.
//!
//! Each scenario returns a `MockFs` laid out like the default `ScanPaths`
//! roots together with a `MockRunner` answering the host's tool invocations.

use super::{MockFs, MockRunner};

const NODE: &str = "/sys/devices/system/node";
const MEMORY: &str = "/sys/devices/system/memory";
const HUGEPAGES: &str = "/sys/kernel/mm/hugepages";
const BLOCK: &str = "/sys/block";
const NET: &str = "/sys/class/net";

fn cpuinfo_block(processor: usize, physical_id: u32, cores: u32, siblings: u32) -> String {
    format!(
        "processor\t: {processor}\n\
         vendor_id\t: GenuineIntel\n\
         cpu family\t: 6\n\
         model name\t: Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz\n\
         physical id\t: {physical_id}\n\
         siblings\t: {siblings}\n\
         core id\t\t: {}\n\
         cpu cores\t: {cores}\n\
         flags\t\t: fpu vme de pse tsc msr pae mce sse sse2 ht avx2\n\n",
        processor as u32 % cores
    )
}

fn add_processor(fs: &mut MockFs, node: u32, processor: usize, core: u32) {
    fs.add_file(
        format!("{NODE}/node{node}/cpu{processor}/topology/core_id"),
        format!("{core}\n"),
    );
}

fn add_memory(fs: &mut MockFs, mem_total_kb: u64, online_blocks: usize) {
    fs.add_file(
        "/proc/meminfo",
        format!("MemTotal:       {mem_total_kb} kB\nMemFree:         1024 kB\n"),
    );
    // 128 MiB blocks
    fs.add_file(format!("{MEMORY}/block_size_bytes"), "8000000\n");
    for block in 0..online_blocks {
        fs.add_file(format!("{MEMORY}/memory{block}/state"), "online\n");
    }
    fs.add_dir(format!("{HUGEPAGES}/hugepages-2048kB"));
    fs.add_dir(format!("{HUGEPAGES}/hugepages-1048576kB"));
}

/// One package with 4 cores and 8 threads on a single NUMA node.
///
/// Block: `sda` (SCSI, two partitions, `sda1` mounted on `/boot`).
/// Network: `eth0` (physical, permanent MAC) and `wlan0` (random MAC,
/// `ethtool` fails).
pub fn single_socket_host() -> (MockFs, MockRunner) {
    let mut fs = MockFs::new();
    let mut runner = MockRunner::new();

    let cpuinfo: String = (0..8).map(|p| cpuinfo_block(p, 0, 4, 8)).collect();
    fs.add_file("/proc/cpuinfo", cpuinfo);

    fs.add_file(format!("{NODE}/node0/cpumap"), "ff\n");
    fs.add_file(format!("{NODE}/node0/cpulist"), "0-7\n");
    for processor in 0..8 {
        add_processor(&mut fs, 0, processor, processor as u32 % 4);
    }

    add_memory(&mut fs, 16_000_000, 128);

    fs.add_file(format!("{BLOCK}/sda/size"), "500118192\n");
    fs.add_file(format!("{BLOCK}/sda/device/vendor"), "ATA\n");
    fs.add_file(format!("{BLOCK}/sda/sda1/size"), "1048576\n");
    fs.add_file(format!("{BLOCK}/sda/sda1/ro"), "0\n");
    fs.add_file(format!("{BLOCK}/sda/sda2/size"), "499067904\n");
    fs.add_file(format!("{BLOCK}/sda/sda2/ro"), "0\n");
    fs.add_dir(format!("{BLOCK}/loop0"));
    fs.add_dir(format!("{BLOCK}/sr0"));
    fs.add_symlink("/dev/disk/by-id/ata-S3Z2NB0K123456A", "../../sda");
    fs.add_symlink("/dev/disk/by-id/ata-S3Z2NB0K123456A-part1", "../../sda1");
    fs.add_symlink("/dev/disk/by-id/wwn-0x5002538e40a1b2c3", "../../sda");

    runner.add_success("findmnt /dev/sda1 --noheadings --output FSTYPE", "ext4\n");
    runner.add_success("findmnt /dev/sda1 --noheadings --output TARGET", "/boot\n");
    runner.add_failure("findmnt /dev/sda2 --noheadings --output FSTYPE", 1);
    runner.add_failure("findmnt /dev/sda2 --noheadings --output TARGET", 1);

    fs.add_symlink(format!("{NET}/lo"), "../../devices/virtual/net/lo");
    fs.add_symlink(
        format!("{NET}/eth0"),
        "../../devices/pci0000:00/0000:00:1f.6/net/eth0",
    );
    fs.add_file(format!("{NET}/eth0/address"), "e0:69:95:03:48:37\n");
    fs.add_file(format!("{NET}/eth0/addr_assign_type"), "0\n");
    fs.add_symlink(
        format!("{NET}/wlan0"),
        "../../devices/pci0000:00/0000:00:14.3/net/wlan0",
    );
    fs.add_file(format!("{NET}/wlan0/address"), "1c:7e:e5:29:9a:06\n");
    fs.add_file(format!("{NET}/wlan0/addr_assign_type"), "3\n");

    runner.add_success(
        format!("udevadm info --query=property --path={NET}/eth0"),
        "ID_BUS=pci\n\
         ID_NET_DRIVER=e1000e\n\
         ID_VENDOR_ID=0x8086\n\
         ID_VENDOR_FROM_DATABASE=Intel Corporation\n\
         ID_MODEL_FROM_DATABASE=Ethernet Connection (2) I219-LM\n",
    );
    runner.add_success(
        format!("udevadm info --query=property --path={NET}/wlan0"),
        "ID_BUS=pci\nID_NET_DRIVER=iwlwifi\n",
    );
    runner.add_success(
        "ethtool -k eth0",
        "Features for eth0:\n\
         rx-checksumming: on\n\
         tx-checksumming: on\n\
         scatter-gather: on\n\
         tcp-segmentation-offload: off\n\
         loopback: off [fixed]\n",
    );
    runner.add_failure("ethtool -k wlan0", 1);

    (fs, runner)
}

/// Two packages with 2 cores and 4 threads each, one per NUMA node.
///
/// Processors are interleaved across nodes (`node0` holds 0, 1, 4, 5).
/// Block: `hda` (IDE, no partitions, no serial link). Network: loopback only.
pub fn dual_socket_numa_host() -> (MockFs, MockRunner) {
    let mut fs = MockFs::new();
    let runner = MockRunner::new();

    let layout: [(usize, u32, u32); 8] = [
        (0, 0, 0),
        (1, 0, 1),
        (2, 1, 0),
        (3, 1, 1),
        (4, 0, 0),
        (5, 0, 1),
        (6, 1, 0),
        (7, 1, 1),
    ];

    let cpuinfo: String = layout
        .iter()
        .map(|&(processor, package, _)| cpuinfo_block(processor, package, 2, 4))
        .collect();
    fs.add_file("/proc/cpuinfo", cpuinfo);

    fs.add_file(format!("{NODE}/node0/cpumap"), "00000000,00000033\n");
    fs.add_file(format!("{NODE}/node1/cpumap"), "00000000,000000cc\n");
    fs.add_file(format!("{NODE}/online"), "0-1\n");
    for (processor, node, core) in layout {
        add_processor(&mut fs, node, processor, core);
    }

    add_memory(&mut fs, 60_000_000, 512);

    fs.add_file(format!("{BLOCK}/hda/size"), "156301488\n");
    fs.add_file(format!("{BLOCK}/hda/device/vendor"), "  WDC  \n");

    fs.add_symlink(format!("{NET}/lo"), "../../devices/virtual/net/lo");

    (fs, runner)
}
