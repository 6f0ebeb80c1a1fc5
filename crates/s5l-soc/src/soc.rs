use std::sync::Arc;

use memory::{AddressSpace, RamBlock};
use s5l_devices::{
    Aic, BootStraps, ChipId, Gpio, MappedDevice, S5l8950Pmgr, S5l8950xPmgr, SharedUnimpSink, Spi,
    UnimplementedDevice,
};

use crate::cpu::{CpuCoreSet, CpuFactory, CORTEX_A15};
use crate::memmap::{self, DeviceId, UnimplementedRange};
use crate::SocError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocVariant {
    /// Apple A6 with the modeled peripheral set.
    S5l8950x,
    /// Bring-up SoC: SRAM, VROM and a stub PMGR only.
    S5l8950,
}

impl SocVariant {
    pub fn name(self) -> &'static str {
        match self {
            SocVariant::S5l8950x => "s5l8950x",
            SocVariant::S5l8950 => "s5l8950",
        }
    }

    pub fn cpu_model(self) -> &'static str {
        CORTEX_A15
    }

    pub fn num_cpus(self) -> usize {
        2
    }

    /// Region mirrored at address zero for the reset vector.
    pub fn reset_alias(self) -> DeviceId {
        match self {
            SocVariant::S5l8950x => DeviceId::Vrom,
            SocVariant::S5l8950 => DeviceId::Sram,
        }
    }

    /// Catch-all ranges mapped beneath the modeled devices.
    pub fn unimplemented_ranges(self) -> Vec<UnimplementedRange> {
        let mut ranges = vec![UnimplementedRange::UNKNOWN_PERIPHERAL];
        if self == SocVariant::S5l8950x {
            ranges.extend(
                DeviceId::ALL
                    .iter()
                    .filter(|id| **id != DeviceId::Sram)
                    .map(|id| UnimplementedRange::for_device(*id)),
            );
        }
        ranges
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocConfig {
    pub variant: SocVariant,
    pub cpu_count: usize,
    /// SDRAM mapped at the SDRAM base; at most the SDRAM window.
    pub sdram_size: u64,
    pub gpio_straps: BootStraps,
}

impl SocConfig {
    pub fn new(variant: SocVariant) -> Self {
        Self {
            variant,
            cpu_count: variant.num_cpus(),
            sdram_size: DeviceId::Sdram.size(),
            gpio_straps: BootStraps::default(),
        }
    }
}

/// A fully built SoC. Owns every core and register block for the lifetime of the machine.
pub struct Soc {
    variant: SocVariant,
    cpus: CpuCoreSet,
    address_space: Arc<AddressSpace>,
    sram: Arc<RamBlock>,
    vrom: Arc<RamBlock>,
    sdram: Arc<RamBlock>,
    // Construction order; reset walks it front to back.
    devices: Vec<(DeviceId, Arc<dyn MappedDevice>)>,
    aic: Option<Arc<Aic>>,
}

impl std::fmt::Debug for Soc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Soc")
            .field("variant", &self.variant)
            .field("cpus", &self.cpus)
            .field(
                "devices",
                &self.devices.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

struct Composer {
    space: AddressSpace,
    devices: Vec<(DeviceId, Arc<dyn MappedDevice>)>,
}

impl Composer {
    fn attach<D: MappedDevice + 'static>(
        &mut self,
        id: DeviceId,
        dev: Arc<D>,
    ) -> Result<Arc<D>, SocError> {
        self.space
            .map_mmio(dev.name(), id.base(), dev.size(), dev.clone())?;
        tracing::trace!(device = dev.name(), base = %format_args!("0x{:08x}", id.base()), "mapped");
        let handle: Arc<dyn MappedDevice> = dev.clone();
        self.devices.push((id, handle));
        Ok(dev)
    }
}

impl Soc {
    /// Build the SoC. Any failure is fatal; nothing is returned partially constructed.
    pub fn new(
        config: &SocConfig,
        cpu_factory: &dyn CpuFactory,
        unimp: SharedUnimpSink,
    ) -> Result<Self, SocError> {
        let variant = config.variant;
        memmap::validate(DeviceId::ALL)?;

        let cpus = CpuCoreSet::build(cpu_factory, variant.cpu_model(), config.cpu_count)?;

        let mut composer = Composer {
            space: AddressSpace::new(),
            devices: Vec::new(),
        };

        let sram = Arc::new(RamBlock::new(DeviceId::Sram.size())?);
        let sram_id = composer
            .space
            .map_ram("sram", DeviceId::Sram.base(), sram.clone())?;
        let vrom = Arc::new(RamBlock::new(DeviceId::Vrom.size())?);
        let vrom_id = composer
            .space
            .map_rom("vrom", DeviceId::Vrom.base(), vrom.clone())?;
        let (alias_name, alias_target) = match variant.reset_alias() {
            DeviceId::Sram => ("sram_alias", sram_id),
            _ => ("vrom_alias", vrom_id),
        };
        let alias = variant.reset_alias();
        composer
            .space
            .map_alias(alias_name, 0, alias_target, 0, alias.size())?;

        let mut aic = None;
        match variant {
            SocVariant::S5l8950x => {
                aic = Some(composer.attach(DeviceId::Aic, Arc::new(Aic::new(unimp.clone())))?);
                for (n, id) in DeviceId::SPI.into_iter().enumerate() {
                    composer.attach(id, Arc::new(Spi::new(n, unimp.clone())))?;
                }
                composer.attach(
                    DeviceId::Gpio,
                    Arc::new(Gpio::with_straps(config.gpio_straps, unimp.clone())),
                )?;
                composer.attach(DeviceId::Pmgr, Arc::new(S5l8950xPmgr::new(unimp.clone())))?;
                composer.attach(DeviceId::ChipId, Arc::new(ChipId::new(unimp.clone())))?;
            }
            SocVariant::S5l8950 => {
                composer.attach(DeviceId::Pmgr, Arc::new(S5l8950Pmgr::new(unimp.clone())))?;
            }
        }

        for range in variant.unimplemented_ranges() {
            let dev = UnimplementedDevice::new(range.name, range.size, unimp.clone());
            composer
                .space
                .map_background(range.name, range.base, range.size, Arc::new(dev))?;
        }

        let sdram = Arc::new(RamBlock::new(config.sdram_size)?);
        composer
            .space
            .map_ram("sdram", DeviceId::Sdram.base(), sdram.clone())?;

        tracing::debug!(
            soc = variant.name(),
            cpus = cpus.len(),
            devices = composer.devices.len(),
            "SoC realized"
        );

        Ok(Self {
            variant,
            cpus,
            address_space: Arc::new(composer.space),
            sram,
            vrom,
            sdram,
            devices: composer.devices,
            aic,
        })
    }

    pub fn variant(&self) -> SocVariant {
        self.variant
    }

    pub fn address_space(&self) -> &Arc<AddressSpace> {
        &self.address_space
    }

    pub fn sram(&self) -> &Arc<RamBlock> {
        &self.sram
    }

    pub fn vrom(&self) -> &Arc<RamBlock> {
        &self.vrom
    }

    pub fn sdram(&self) -> &Arc<RamBlock> {
        &self.sdram
    }

    pub fn aic(&self) -> Option<&Arc<Aic>> {
        self.aic.as_ref()
    }

    pub fn cpus(&self) -> &CpuCoreSet {
        &self.cpus
    }

    pub fn cpus_mut(&mut self) -> &mut CpuCoreSet {
        &mut self.cpus
    }

    /// Modeled register blocks in construction order.
    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &dyn MappedDevice)> + '_ {
        self.devices.iter().map(|(id, dev)| (*id, dev.as_ref()))
    }

    pub fn device(&self, id: DeviceId) -> Option<&dyn MappedDevice> {
        self.devices
            .iter()
            .find(|(dev_id, _)| *dev_id == id)
            .map(|(_, dev)| dev.as_ref())
    }

    /// Reset every register block in construction order.
    pub fn reset_devices(&self) {
        for (_, dev) in &self.devices {
            dev.reset();
        }
    }
}
