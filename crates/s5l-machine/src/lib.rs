#![forbid(unsafe_code)]

//! iPhone 5 (N42AP) machine: board selection, RAM size policy, firmware loading and reset.
//!
//! ```no_run
//! use s5l_machine::{FirmwareImage, Machine, MachineConfig};
//!
//! let cfg = MachineConfig {
//!     firmware: Some(FirmwareImage::Path("bootrom.bin".into())),
//!     ..Default::default()
//! };
//! let machine = Machine::new(cfg)?;
//! assert_eq!(machine.boot().entry, 0x1000_0000);
//! # Ok::<(), s5l_machine::MachineError>(())
//! ```

pub mod boot;
pub mod registry;

use std::path::PathBuf;
use std::sync::Arc;

use memory::AddressSpace;
use s5l_devices::{SharedUnimpSink, TracingUnimpSink};
use s5l_soc::{ArmCpuFactory, CpuCoreSet, CpuFactory, DeviceId, Soc, SocConfig, SocError};
use thiserror::Error;

pub use boot::{
    BootDescriptor, FirmwareImage, FirmwareOrigin, FIRMWARE_LOAD_ADDR, FIRMWARE_MAX_SIZE,
};
pub use registry::{MachineRegistry, MachineSpec, GIB};

use boot::LoadedFirmware;

pub const DEFAULT_MACHINE: &str = "iphone-n42ap";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    /// Registry name of the board.
    pub machine: String,
    pub ram_size_bytes: u64,
    /// Number of cores; `None` selects the board default.
    pub cpu_count: Option<u8>,
    pub firmware: Option<FirmwareImage>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            machine: DEFAULT_MACHINE.to_string(),
            ram_size_bytes: GIB,
            cpu_count: None,
            firmware: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("unknown machine `{name}` (available: {})", available.join(", "))]
    UnknownMachine {
        name: String,
        available: Vec<&'static str>,
    },

    #[error("invalid RAM size {actual} bytes, should be {expected} bytes")]
    InvalidRamSize { expected: u64, actual: u64 },

    #[error("invalid CPU count {actual}: this machine supports {min}..={max} CPUs")]
    InvalidCpuCount { min: u8, max: u8, actual: u8 },

    #[error("firmware is required")]
    FirmwareRequired,

    #[error("failed to load firmware from {}: {source}", path.display())]
    FirmwareRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("firmware image is {len} bytes, the load window holds {max}")]
    FirmwareTooLarge { len: usize, max: usize },

    #[error(transparent)]
    Soc(#[from] SocError),
}

/// Everything validation resolves before any device or core is built.
struct Validated {
    spec: MachineSpec,
    cpu_count: u8,
    firmware: LoadedFirmware,
}

fn validate_cfg(registry: &MachineRegistry, cfg: &MachineConfig) -> Result<Validated, MachineError> {
    let spec = registry
        .get(&cfg.machine)
        .ok_or_else(|| MachineError::UnknownMachine {
            name: cfg.machine.clone(),
            available: registry.names(),
        })?;
    if cfg.ram_size_bytes != spec.ram_size {
        return Err(MachineError::InvalidRamSize {
            expected: spec.ram_size,
            actual: cfg.ram_size_bytes,
        });
    }
    let cpu_count = cfg.cpu_count.unwrap_or(spec.default_cpus);
    if !(spec.min_cpus..=spec.max_cpus).contains(&cpu_count) {
        return Err(MachineError::InvalidCpuCount {
            min: spec.min_cpus,
            max: spec.max_cpus,
            actual: cpu_count,
        });
    }
    let image = cfg.firmware.as_ref().ok_or(MachineError::FirmwareRequired)?;
    let firmware = boot::load_firmware(image)?;
    Ok(Validated {
        spec: spec.clone(),
        cpu_count,
        firmware,
    })
}

/// A built machine, reset and ready to run from the boot core.
#[derive(Debug)]
pub struct Machine {
    spec: MachineSpec,
    soc: Soc,
    boot: BootDescriptor,
    firmware: Arc<[u8]>,
}

impl Machine {
    pub fn new(cfg: MachineConfig) -> Result<Self, MachineError> {
        Self::with_hooks(cfg, &ArmCpuFactory, TracingUnimpSink::shared())
    }

    /// Build with a host-provided core implementation and unimplemented-access sink.
    pub fn with_hooks(
        cfg: MachineConfig,
        cpu_factory: &dyn CpuFactory,
        unimp: SharedUnimpSink,
    ) -> Result<Self, MachineError> {
        let Validated {
            spec,
            cpu_count,
            firmware,
        } = validate_cfg(&MachineRegistry::builtin(), &cfg)?;

        let soc_config = SocConfig {
            cpu_count: usize::from(cpu_count),
            sdram_size: cfg.ram_size_bytes,
            ..SocConfig::new(spec.soc)
        };
        let soc = Soc::new(&soc_config, cpu_factory, unimp)?;

        tracing::info!(
            firmware = %firmware.origin,
            len = firmware.bytes.len(),
            addr = %format_args!("0x{FIRMWARE_LOAD_ADDR:08x}"),
            "loading firmware"
        );
        let boot = BootDescriptor {
            firmware: firmware.origin,
            firmware_len: firmware.bytes.len(),
            load_addr: FIRMWARE_LOAD_ADDR,
            entry: FIRMWARE_LOAD_ADDR,
            ram_size: cfg.ram_size_bytes,
        };

        let mut machine = Self {
            spec,
            soc,
            boot,
            firmware: firmware.bytes,
        };
        machine.reset();
        Ok(machine)
    }

    pub fn spec(&self) -> &MachineSpec {
        &self.spec
    }

    pub fn boot(&self) -> &BootDescriptor {
        &self.boot
    }

    pub fn soc(&self) -> &Soc {
        &self.soc
    }

    /// The physical address space, shareable with core threads.
    pub fn bus(&self) -> Arc<AddressSpace> {
        self.soc.address_space().clone()
    }

    pub fn cpus(&self) -> &CpuCoreSet {
        self.soc.cpus()
    }

    /// Power a parked secondary core on at `entry`.
    pub fn release_core(&mut self, index: usize, entry: u64) -> Result<(), MachineError> {
        Ok(self.soc.cpus_mut().release(index, entry)?)
    }

    /// Return the machine to its power-on state: register blocks first, then the pristine
    /// firmware image in SRAM, then the cores (boot core at the entry point, secondaries parked).
    pub fn reset(&mut self) {
        self.soc.reset_devices();
        let sram = self.soc.sram();
        let offset = self.boot.load_addr - DeviceId::Sram.base();
        // `load_firmware` bounds the image to the load window, which lies inside SRAM.
        if let Err(err) = sram.write_bytes(offset, &self.firmware) {
            tracing::error!(%err, "firmware does not fit in SRAM");
        }
        self.soc.cpus_mut().reset(self.boot.entry);
        tracing::info!(
            machine = self.spec.name,
            entry = %format_args!("0x{:08x}", self.boot.entry),
            "reset, boot core released"
        );
    }
}
