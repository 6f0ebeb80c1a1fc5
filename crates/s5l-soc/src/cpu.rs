//! CPU core set: the boot core plus secondaries that stay parked until firmware releases them.
//!
//! Instruction execution belongs to the hosting framework. It plugs in through [`CpuFactory`] and
//! [`CpuCore`]; [`ArmCpu`] is the built-in state-only core used when no execution engine is attached.

use bitflags::bitflags;
use thiserror::Error;

use crate::SocError;

bitflags! {
    /// Optional architectural features of a core.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CpuFeatures: u32 {
        const EL2 = 1 << 0;
        const EL3 = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuCoreConfig {
    /// Hold the core in reset until it is released explicitly.
    pub start_powered_off: bool,
    pub features: CpuFeatures,
}

impl CpuCoreConfig {
    /// Configuration of core `index` on these SoCs: every exception level, secondaries parked.
    pub fn for_core(index: usize) -> Self {
        Self {
            start_powered_off: index > 0,
            features: CpuFeatures::EL2 | CpuFeatures::EL3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    On,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuRealizeError {
    #[error("unknown CPU model `{0}`")]
    UnknownModel(String),
    #[error("core is already realized")]
    AlreadyRealized,
    #[error("EL2 requires EL3 on this core")]
    El2WithoutEl3,
}

/// One processor core as seen by the SoC composer.
pub trait CpuCore: Send {
    fn index(&self) -> usize;
    fn model(&self) -> &str;

    /// Apply per-core configuration. Only meaningful before [`CpuCore::realize`].
    fn configure(&mut self, config: &CpuCoreConfig);
    fn config(&self) -> CpuCoreConfig;

    /// Finalize the core. Failure aborts SoC construction.
    fn realize(&mut self) -> Result<(), CpuRealizeError>;

    /// Return the core to its power-on state, with the program counter at `entry` if it starts
    /// powered on.
    fn reset(&mut self, entry: u64);

    fn power_state(&self) -> PowerState;
    fn power_on(&mut self, entry: u64);
    fn power_off(&mut self);

    /// Program counter of a powered-on core.
    fn pc(&self) -> u64;
}

/// Creates cores by model name.
pub trait CpuFactory {
    fn create(&self, model: &str, index: usize) -> Result<Box<dyn CpuCore>, CpuRealizeError>;
}

pub const CORTEX_A15: &str = "cortex-a15";

/// Register-state-only ARM core.
#[derive(Debug, Clone)]
pub struct ArmCpu {
    index: usize,
    model: String,
    config: CpuCoreConfig,
    realized: bool,
    power: PowerState,
    pc: u64,
}

impl ArmCpu {
    pub fn new(model: &str, index: usize) -> Self {
        Self {
            index,
            model: model.to_string(),
            config: CpuCoreConfig::default(),
            realized: false,
            power: PowerState::Off,
            pc: 0,
        }
    }

    pub fn is_realized(&self) -> bool {
        self.realized
    }
}

impl CpuCore for ArmCpu {
    fn index(&self) -> usize {
        self.index
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn configure(&mut self, config: &CpuCoreConfig) {
        if self.realized {
            tracing::warn!(cpu = self.index, "configure after realize ignored");
            return;
        }
        self.config = *config;
    }

    fn config(&self) -> CpuCoreConfig {
        self.config
    }

    fn realize(&mut self) -> Result<(), CpuRealizeError> {
        if self.realized {
            return Err(CpuRealizeError::AlreadyRealized);
        }
        let features = self.config.features;
        if features.contains(CpuFeatures::EL2) && !features.contains(CpuFeatures::EL3) {
            return Err(CpuRealizeError::El2WithoutEl3);
        }
        self.realized = true;
        tracing::trace!(cpu = self.index, model = %self.model, ?features, "realized");
        Ok(())
    }

    fn reset(&mut self, entry: u64) {
        if self.config.start_powered_off {
            self.power = PowerState::Off;
            self.pc = 0;
        } else {
            self.power = PowerState::On;
            self.pc = entry;
        }
    }

    fn power_state(&self) -> PowerState {
        self.power
    }

    fn power_on(&mut self, entry: u64) {
        self.power = PowerState::On;
        self.pc = entry;
    }

    fn power_off(&mut self) {
        self.power = PowerState::Off;
    }

    fn pc(&self) -> u64 {
        self.pc
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ArmCpuFactory;

impl CpuFactory for ArmCpuFactory {
    fn create(&self, model: &str, index: usize) -> Result<Box<dyn CpuCore>, CpuRealizeError> {
        match model {
            CORTEX_A15 => Ok(Box::new(ArmCpu::new(model, index))),
            other => Err(CpuRealizeError::UnknownModel(other.to_string())),
        }
    }
}

/// The SoC's cores. Core 0 is the boot core.
pub struct CpuCoreSet {
    cores: Vec<Box<dyn CpuCore>>,
}

impl std::fmt::Debug for CpuCoreSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.cores
                    .iter()
                    .map(|c| (c.index(), c.power_state(), c.pc())),
            )
            .finish()
    }
}

impl CpuCoreSet {
    /// Create, configure and realize `count` cores of `model`.
    pub fn build(factory: &dyn CpuFactory, model: &str, count: usize) -> Result<Self, SocError> {
        if count == 0 {
            return Err(SocError::NoSuchCore { index: 0, count });
        }
        let mut cores = Vec::with_capacity(count);
        for index in 0..count {
            let realize_err = |source: CpuRealizeError| SocError::CpuRealize { index, source };
            let mut core = factory.create(model, index).map_err(realize_err)?;
            core.configure(&CpuCoreConfig::for_core(index));
            core.realize().map_err(realize_err)?;
            cores.push(core);
        }
        Ok(Self { cores })
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    pub fn boot_core(&self) -> &dyn CpuCore {
        self.cores[0].as_ref()
    }

    pub fn core(&self, index: usize) -> Option<&dyn CpuCore> {
        self.cores.get(index).map(|c| c.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn CpuCore> + '_ {
        self.cores.iter().map(|c| c.as_ref())
    }

    /// Reset every core: the boot core starts at `entry`, secondaries are parked.
    pub fn reset(&mut self, entry: u64) {
        for core in &mut self.cores {
            core.reset(entry);
        }
    }

    /// Power a parked core on at `entry`.
    pub fn release(&mut self, index: usize, entry: u64) -> Result<(), SocError> {
        let count = self.cores.len();
        let core = self
            .cores
            .get_mut(index)
            .ok_or(SocError::NoSuchCore { index, count })?;
        if core.power_state() == PowerState::On {
            return Err(SocError::CoreAlreadyOn { index });
        }
        tracing::info!(cpu = index, entry = %format_args!("0x{entry:x}"), "releasing core");
        core.power_on(entry);
        Ok(())
    }

    /// Park a core.
    pub fn park(&mut self, index: usize) -> Result<(), SocError> {
        let count = self.cores.len();
        let core = self
            .cores
            .get_mut(index)
            .ok_or(SocError::NoSuchCore { index, count })?;
        core.power_off();
        Ok(())
    }

    /// Indices of the cores currently powered on.
    pub fn powered_on(&self) -> Vec<usize> {
        self.cores
            .iter()
            .filter(|c| c.power_state() == PowerState::On)
            .map(|c| c.index())
            .collect()
    }
}
