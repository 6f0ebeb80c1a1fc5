#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use memory::{MemoryBus, RegionInfo, RegionKind};
use s5l_machine::{FirmwareImage, Machine, MachineConfig, MachineRegistry, DEFAULT_MACHINE};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Build an S5L8950X machine, load firmware and inspect its address space")]
struct Args {
    /// Board to build (see `--list-machines`).
    #[arg(short = 'M', long, default_value = DEFAULT_MACHINE)]
    machine: String,

    /// Guest RAM size in MiB. The board only accepts its fixed size.
    #[arg(long, default_value_t = 1024)]
    ram: u64,

    /// Number of CPU cores.
    #[arg(long)]
    smp: Option<u8>,

    /// Firmware image (e.g. a boot ROM dump), loaded at SRAM base.
    #[arg(long, required_unless_present = "list_machines")]
    firmware: Option<PathBuf>,

    /// Print the available boards and exit.
    #[arg(long)]
    list_machines: bool,

    /// Print the composed memory map as JSON.
    #[arg(long)]
    dump_memmap: bool,

    /// Perform a 32-bit read at this physical address (hex with `0x`, or decimal). Repeatable.
    #[arg(long, value_parser = parse_addr)]
    probe: Vec<u64>,

    /// Log unimplemented register accesses.
    #[arg(long)]
    trace_unimp: bool,
}

fn parse_addr(s: &str) -> Result<u64, String> {
    let s = s.trim().replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address `{s}`: {e}"))
}

#[derive(Debug, Serialize)]
struct MemmapEntry {
    name: String,
    start: String,
    end: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias_of: Option<String>,
    background: bool,
}

fn memmap_entries(machine: &Machine) -> Vec<MemmapEntry> {
    let bus = machine.bus();
    let regions: Vec<RegionInfo> = bus.regions().collect();
    regions
        .iter()
        .map(|r| {
            let (kind, alias_of) = match r.kind {
                RegionKind::Ram => ("ram", None),
                RegionKind::Rom => ("rom", None),
                RegionKind::Mmio => ("mmio", None),
                RegionKind::Alias { target, .. } => {
                    ("alias", bus.region(target).map(|t| t.name))
                }
            };
            MemmapEntry {
                name: r.name.clone(),
                start: format!("0x{:08x}", r.start),
                end: format!("0x{:08x}", r.end()),
                kind,
                alias_of,
                background: r.is_background(),
            }
        })
        .collect()
}

fn init_tracing(trace_unimp: bool) -> Result<()> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if trace_unimp {
        filter = filter.add_directive("unimp=debug".parse().context("invalid unimp directive")?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.trace_unimp)?;

    let mut out = io::stdout().lock();

    if args.list_machines {
        for spec in MachineRegistry::builtin().iter() {
            writeln!(out, "{:<24} {}", spec.name, spec.description)?;
        }
        return Ok(());
    }

    let ram_size_bytes = args
        .ram
        .checked_mul(1024 * 1024)
        .context("RAM size overflow")?;
    let cfg = MachineConfig {
        machine: args.machine.clone(),
        ram_size_bytes,
        cpu_count: args.smp,
        firmware: args.firmware.clone().map(FirmwareImage::Path),
    };
    let machine = Machine::new(cfg).context("failed to build machine")?;

    let boot = machine.boot();
    writeln!(
        out,
        "{}: firmware {} ({} bytes) at 0x{:08x}, entry 0x{:08x}",
        machine.spec().name,
        boot.firmware,
        boot.firmware_len,
        boot.load_addr,
        boot.entry
    )?;
    for core in machine.cpus().iter() {
        writeln!(
            out,
            "cpu[{}] {} {:?} pc=0x{:08x}",
            core.index(),
            core.model(),
            core.power_state(),
            core.pc()
        )?;
    }

    if args.dump_memmap {
        serde_json::to_writer_pretty(&mut out, &memmap_entries(&machine))
            .context("failed to write memory map")?;
        writeln!(out)?;
    }

    let bus = machine.bus();
    for addr in &args.probe {
        let value = bus.read_u32(*addr);
        writeln!(out, "0x{addr:08x}: 0x{value:08x}")?;
    }

    Ok(())
}
