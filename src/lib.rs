//! hwprobe - static hardware inventory of a Linux host.
//!
//! The library reads `/proc`, `/sys` and `/dev`, runs a few diagnostic tools
//! (`findmnt`, `udevadm`, `ethtool`) and normalizes what they report into the
//! records in [`model`]:
//! - CPU packages, cores and threads
//! - NUMA nodes and the cores inside them
//! - memory totals and supported huge page sizes
//! - disks with their partitions
//! - network interface controllers
//!
//! [`host()`] gives the process-wide [`Inventory`] for the running machine.
//! Tests and tools that inspect a captured tree build their own `Inventory`
//! with custom [`ScanPaths`] or mock readers.
//!
//! ```no_run
//! let inventory = hwprobe::host();
//! if let Ok(hwprobe::Discovery::Found(cpu)) = inventory.cpu() {
//!     println!("{} cores, {} threads", cpu.total_cores, cpu.total_threads);
//! }
//! ```

pub mod cache;
pub mod collector;
pub mod config;
pub mod inventory;
pub mod model;
pub mod platform;
pub mod report;

pub use cache::ScanCache;
pub use collector::{CollectError, ParseError};
pub use config::ScanPaths;
pub use inventory::{DiscoveryResult, Inventory, host};
pub use platform::{Discovery, Platform};
