//! Hardware collectors for Linux hosts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Inventory                           │
//! └──────┬──────────┬───────────┬─────────────┬──────────────┬───┘
//!        │          │           │             │              │
//!  CpuCollector  Topology   BlockCollector  NetCollector  MemoryCollector
//!        │       Collector      │   │         │   │           │
//!        ▼          ▼           ▼   ▼         ▼   ▼           ▼
//!   /proc/cpuinfo  /sys/...   /sys  findmnt  /sys udevadm   /proc/meminfo
//!                  /node      /dev           ethtool        /sys/.../memory
//! ```
//!
//! Every collector reads through the [`FileSystem`] trait and, where it
//! shells out, through the [`CommandRunner`] trait, so tests substitute
//! [`mock::MockFs`] and [`mock::MockRunner`].
//!
//! # Failure handling
//!
//! A source that is absent or unreadable, or a tool that cannot run, yields
//! the documented sentinel and a `debug!` line. Only content that is present
//! but malformed surfaces as a [`CollectError`].

pub mod block;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod mock;
pub mod net;
pub mod parser;
pub mod topology;
pub mod traits;

pub use block::BlockCollector;
pub use cpu::CpuCollector;
pub use error::{CollectError, ParseError};
pub use memory::MemoryCollector;
pub use net::NetCollector;
pub use topology::TopologyCollector;
pub use traits::{CommandOutput, CommandRunner, FileSystem, RealFs, RealRunner};

use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a source file, treating any I/O failure as absence.
pub(crate) fn read_source<F: FileSystem>(fs: &F, path: &Path) -> Option<String> {
    match fs.read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            debug!(path = ?path, error = %e, "source unavailable");
            None
        }
    }
}

/// Lists a source directory, treating any I/O failure as absence.
pub(crate) fn read_dir_source<F: FileSystem>(fs: &F, path: &Path) -> Option<Vec<PathBuf>> {
    match fs.read_dir(path) {
        Ok(entries) => Some(entries),
        Err(e) => {
            debug!(path = ?path, error = %e, "directory unavailable");
            None
        }
    }
}

/// Runs an external tool; `None` when it cannot start or exits non-zero.
pub(crate) fn run_command<R: CommandRunner>(
    runner: &R,
    program: &str,
    args: &[&str],
) -> Option<CommandOutput> {
    match runner.run(program, args) {
        Ok(output) if output.is_success() => Some(output),
        Ok(output) => {
            debug!(
                program,
                ?args,
                status = ?output.status,
                stderr = %output.stderr.trim(),
                "command failed"
            );
            None
        }
        Err(e) => {
            debug!(program, ?args, error = %e, "command could not run");
            None
        }
    }
}
