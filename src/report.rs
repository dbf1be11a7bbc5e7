//! Human-readable and JSON renderings of an inventory.

use crate::collector::{CollectError, CommandRunner, FileSystem};
use crate::inventory::Inventory;
use crate::model::{BlockInfo, CpuInfo, MemoryInfo, NetInfo, TopologyInfo};
use crate::platform::{Discovery, Platform};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;

const RULE_WIDTH: usize = 64;

/// Subsystems a report can cover, in report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum Section {
    Cpu,
    Memory,
    Topology,
    Block,
    Net,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Cpu,
        Section::Memory,
        Section::Topology,
        Section::Block,
        Section::Net,
    ];

    fn title(self) -> &'static str {
        match self {
            Section::Cpu => "CPU information",
            Section::Memory => "Memory information",
            Section::Topology => "Topology information",
            Section::Block => "Block information",
            Section::Net => "Network information",
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON form of a report. Sections not requested are omitted; sections the
/// platform does not support are `null`.
#[derive(Debug, Serialize)]
pub struct Document {
    pub generated_at: String,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Discovery<Arc<CpuInfo>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<Discovery<Arc<MemoryInfo>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<Discovery<Arc<TopologyInfo>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Discovery<Arc<BlockInfo>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net: Option<Discovery<Arc<NetInfo>>>,
}

impl Document {
    /// Scans the requested sections. A parse failure in any of them fails the
    /// whole document.
    pub fn collect<F, R>(
        inventory: &Inventory<F, R>,
        sections: &[Section],
    ) -> Result<Self, CollectError>
    where
        F: FileSystem + Clone,
        R: CommandRunner + Clone,
    {
        let wanted = |section| sections.contains(&section);
        Ok(Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            platform: inventory.platform().clone(),
            cpu: wanted(Section::Cpu).then(|| inventory.cpu()).transpose()?,
            memory: wanted(Section::Memory).then(|| inventory.memory()).transpose()?,
            topology: wanted(Section::Topology).then(|| inventory.topology()).transpose()?,
            block: wanted(Section::Block).then(|| inventory.block()).transpose()?,
            net: wanted(Section::Net).then(|| inventory.net()).transpose()?,
        })
    }
}

/// Writes the JSON or text report and flushes `out`.
///
/// A failed flush is reported like a failed write.
pub fn write_report<W, F, R>(
    out: &mut W,
    inventory: &Inventory<F, R>,
    sections: &[Section],
    json: bool,
) -> Result<(), ReportError>
where
    W: Write,
    F: FileSystem + Clone,
    R: CommandRunner + Clone,
{
    if json {
        write_json(out, inventory, sections)?;
    } else {
        write_text(out, inventory, sections)?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the JSON document for `sections`.
pub fn write_json<W, F, R>(
    out: &mut W,
    inventory: &Inventory<F, R>,
    sections: &[Section],
) -> Result<(), ReportError>
where
    W: Write,
    F: FileSystem + Clone,
    R: CommandRunner + Clone,
{
    let document = Document::collect(inventory, sections)?;
    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out)?;
    Ok(())
}

/// Writes the text report for `sections`, in [`Section::ALL`] order.
///
/// Stops at the first parse failure; sections already written stay written.
pub fn write_text<W, F, R>(
    out: &mut W,
    inventory: &Inventory<F, R>,
    sections: &[Section],
) -> Result<(), ReportError>
where
    W: Write,
    F: FileSystem + Clone,
    R: CommandRunner + Clone,
{
    write_header(out, "Inspecting host")?;
    writeln!(out, "  platform: {}", inventory.platform())?;

    for section in Section::ALL {
        if !sections.contains(&section) {
            continue;
        }
        writeln!(out)?;
        write_header(out, section.title())?;
        match section {
            Section::Cpu => write_found(out, inventory.cpu()?, write_cpu)?,
            Section::Memory => write_found(out, inventory.memory()?, write_memory)?,
            Section::Topology => write_found(out, inventory.topology()?, write_topology)?,
            Section::Block => write_found(out, inventory.block()?, write_block)?,
            Section::Net => write_found(out, inventory.net()?, write_net)?,
        }
    }
    Ok(())
}

fn write_header<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    let prefix = format!("== {} ", title);
    let fill = RULE_WIDTH.saturating_sub(prefix.len());
    writeln!(out, "{}{}", prefix, "=".repeat(fill))?;
    writeln!(out)
}

fn write_found<W: Write, T>(
    out: &mut W,
    discovery: Discovery<T>,
    render: impl FnOnce(&mut W, &T) -> io::Result<()>,
) -> io::Result<()> {
    match discovery {
        Discovery::Found(value) => render(out, &value),
        Discovery::Unsupported(platform) => writeln!(out, "  unsupported on {}", platform),
    }
}

fn write_list<W: Write, T: Display>(
    out: &mut W,
    label: &str,
    indent: &str,
    items: &[T],
) -> io::Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}{}:", indent, label)?;
    for item in items {
        writeln!(out, "{}  {}", indent, item)?;
    }
    Ok(())
}

fn write_cpu<W: Write>(out: &mut W, cpu: &Arc<CpuInfo>) -> io::Result<()> {
    writeln!(out, "  # cores:   {}", cpu.total_cores)?;
    writeln!(out, "  # threads: {}", cpu.total_threads)?;
    write_list(out, "processors", "  ", &cpu.cpus)
}

fn write_memory<W: Write>(out: &mut W, memory: &Arc<MemoryInfo>) -> io::Result<()> {
    match memory.total_physical_bytes {
        Some(physical) => writeln!(out, "  physical size bytes: {}", physical)?,
        None => writeln!(out, "  physical size bytes: unknown")?,
    }
    writeln!(out, "  usable size bytes:   {}", memory.total_usable_bytes)?;
    writeln!(out, "  supported page sizes:")?;
    for size in &memory.supported_page_sizes {
        writeln!(out, "    {} bytes", size)?;
    }
    Ok(())
}

fn write_topology<W: Write>(out: &mut W, topology: &Arc<TopologyInfo>) -> io::Result<()> {
    writeln!(out, "  architecture: {}", topology.architecture)?;
    for node in &topology.nodes {
        writeln!(out, "    {}", node)?;
        write_list(out, "cores", "    ", &node.cores)?;
    }
    Ok(())
}

fn write_block<W: Write>(out: &mut W, block: &Arc<BlockInfo>) -> io::Result<()> {
    writeln!(out, "  size bytes: {}", block.total_size_bytes)?;
    if !block.disks.is_empty() {
        writeln!(out, "  disks:")?;
    }
    for disk in &block.disks {
        writeln!(out, "    {}", disk)?;
        write_list(out, "partitions", "    ", &disk.partitions)?;
    }
    Ok(())
}

fn write_net<W: Write>(out: &mut W, net: &Arc<NetInfo>) -> io::Result<()> {
    write_list(out, "nics", "  ", &net.nics)
}
