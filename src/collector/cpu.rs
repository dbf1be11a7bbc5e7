//! CPU package collector backed by `/proc/cpuinfo`.

use crate::collector::error::{CollectError, ParseError};
use crate::collector::parser::{AttributeBlock, parse_cpuinfo, parse_decimal, required};
use crate::collector::read_source;
use crate::collector::traits::FileSystem;
use crate::config::ScanPaths;
use crate::model::{Cpu, CpuInfo};
use std::collections::BTreeMap;
use tracing::debug;

/// Collects physical CPU packages from `/proc/cpuinfo`.
pub struct CpuCollector<F: FileSystem> {
    fs: F,
    paths: ScanPaths,
}

impl<F: FileSystem> CpuCollector<F> {
    /// Creates a new CPU collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `paths` - Pseudo-filesystem roots
    pub fn new(fs: F, paths: ScanPaths) -> Self {
        Self { fs, paths }
    }

    /// Reads and groups every logical processor block by physical package.
    ///
    /// A missing `/proc/cpuinfo` yields an empty summary. A block without
    /// one of the required keys fails the whole scan.
    pub fn collect(&self) -> Result<CpuInfo, CollectError> {
        let path = self.paths.cpuinfo();
        let Some(content) = read_source(&self.fs, &path) else {
            return Ok(CpuInfo::default());
        };

        let blocks = parse_cpuinfo(&content).map_err(|e| CollectError::parse(&path, e))?;
        let info = build_cpu_info(&blocks).map_err(|e| CollectError::parse(&path, e))?;

        debug!(
            packages = info.cpus.len(),
            cores = info.total_cores,
            threads = info.total_threads,
            "collected cpu info"
        );
        Ok(info)
    }
}

/// Groups logical processor blocks into packages and sums the totals.
///
/// Attributes of a package are taken from its first block; blocks of one
/// package are assumed to agree.
pub fn build_cpu_info(blocks: &[AttributeBlock]) -> Result<CpuInfo, ParseError> {
    let mut packages: BTreeMap<u32, &AttributeBlock> = BTreeMap::new();
    for block in blocks {
        let id: u32 = parse_decimal(required(block, "physical id")?)?;
        packages.entry(id).or_insert(block);
    }

    let mut cpus = Vec::with_capacity(packages.len());
    for (id, first) in packages {
        let cores: u32 = parse_decimal(required(first, "cpu cores")?)?;
        let threads: u32 = parse_decimal(required(first, "siblings")?)?;
        if cores > threads {
            return Err(ParseError::new(format!(
                "package {}: {} cores exceed {} siblings",
                id, cores, threads
            )));
        }

        let features = first
            .get("flags")
            .or_else(|| first.get("Features"))
            .map(|flags| flags.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        cpus.push(Cpu {
            id,
            cores,
            threads,
            vendor: required(first, "vendor_id")?.to_string(),
            model: required(first, "model name")?.to_string(),
            features,
        });
    }

    Ok(CpuInfo {
        total_cores: checked_total(cpus.iter().map(|c| c.cores), "cores")?,
        total_threads: checked_total(cpus.iter().map(|c| c.threads), "threads")?,
        cpus,
    })
}

fn checked_total(mut counts: impl Iterator<Item = u32>, what: &str) -> Result<u32, ParseError> {
    counts
        .try_fold(0u32, |total, count| total.checked_add(count))
        .ok_or_else(|| ParseError::new(format!("total {} overflows u32", what)))
}
