//! hwprobe - prints the static hardware inventory of the host.

use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use hwprobe::collector::{RealFs, RealRunner};
use hwprobe::report::{self, ReportError, Section};
use hwprobe::{Inventory, Platform, ScanPaths};

/// Static hardware inventory: CPU, memory, NUMA topology, block devices and NICs.
#[derive(Parser)]
#[command(name = "hwprobe", about = "Static host hardware inventory", version)]
struct Args {
    /// Path to procfs.
    #[arg(long, env = "HWPROBE_PROC_PATH", default_value = "/proc")]
    proc_path: PathBuf,

    /// Path to sysfs.
    #[arg(long, env = "HWPROBE_SYS_PATH", default_value = "/sys")]
    sys_path: PathBuf,

    /// Path to the device tree (used for `/dev/disk/by-id` and device nodes).
    #[arg(long, env = "HWPROBE_DEV_PATH", default_value = "/dev")]
    dev_path: PathBuf,

    /// Platform name to use instead of the detected one.
    #[arg(long, value_name = "NAME")]
    platform: Option<String>,

    /// Restrict the report to these subsystems.
    #[arg(long, value_enum, value_delimiter = ',', num_args = 1..)]
    only: Vec<Section>,

    /// Print a JSON document instead of the text report.
    #[arg(long)]
    json: bool,

    /// Verbosity level (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let platform = args
        .platform
        .as_deref()
        .map(Platform::from_name)
        .unwrap_or_else(Platform::current);
    let paths = ScanPaths::new(args.proc_path, args.sys_path, args.dev_path);
    let inventory = Inventory::new(platform, RealFs::new(), RealRunner::new(), paths);

    let sections = if args.only.is_empty() {
        Section::ALL.to_vec()
    } else {
        args.only
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = report::write_report(&mut out, &inventory, &sections, args.json);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(ReportError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "inventory failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(LevelFilter::from_level(level).into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
