//! Power manager (PMGR).
//!
//! The S5L8950X block reports every PLL as locked and every clock doubler as bypassed, and exposes a
//! fixed boot-configuration strap in `SCRATCH0`. Writes are never honored. The earlier S5L8950
//! bring-up block models nothing at all.

use bitflags::bitflags;
use memory::MmioHandler;

use crate::mmio::{truncate, MappedDevice, SharedUnimpSink, UnimpReporter};
use crate::PERIPHERAL_WINDOW;

pub const PMGR_SIZE: u64 = PERIPHERAL_WINDOW;

pub const fn pll_ctl0(n: u64) -> u64 {
    n * 0x18
}

pub const fn pll_debug(n: u64) -> u64 {
    0x2010 + n * 4
}

pub const REG_DOUBLER_DEBUG: u64 = 0x2034;
pub const REG_SCRATCH0: u64 = 0x6000;

/// PLL whose control word early firmware polls for lock.
pub const LOCKED_PLL: u64 = 4;
/// PLLs whose debug word reports bypass enabled.
pub const BYPASSED_PLLS: std::ops::RangeInclusive<u64> = 2..=8;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PllCtl: u32 {
        const ENABLE = 1 << 31;
        const EXT_BYPASS = 1 << 30;
        const REAL_LOCK = 1 << 29;
        const LOAD = 1 << 27;
        const BYPASS = 1 << 23;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PllDebug: u32 {
        const BYP_ENABLED = 1 << 30;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DoublerDebug: u32 {
        const ENABLED = 1 << 31;
        const BYP_ENABLED = 1 << 30;
    }
}

pub const BOOT_CONFIG_SHIFT: u32 = 8;
pub const BOOT_CONFIG_MASK: u32 = 0xFF << BOOT_CONFIG_SHIFT;

/// Boot-config index selecting the first FMI0 NAND entry (2 chip selects).
pub const BOOT_CONFIG_FMI0_NAND: u32 = 4;

/// Value of `SCRATCH0` as seen by the boot ROM.
pub const SCRATCH0_VALUE: u32 = BOOT_CONFIG_FMI0_NAND << BOOT_CONFIG_SHIFT;

/// Fixed register values of the S5L8950X PMGR, by exact offset.
fn s5l8950x_register(offset: u64) -> Option<u32> {
    match offset {
        o if o == pll_ctl0(LOCKED_PLL) => Some(PllCtl::REAL_LOCK.bits()),
        o if BYPASSED_PLLS.clone().any(|n| pll_debug(n) == o) => {
            Some(PllDebug::BYP_ENABLED.bits())
        }
        REG_DOUBLER_DEBUG => Some(DoublerDebug::BYP_ENABLED.bits()),
        REG_SCRATCH0 => Some(SCRATCH0_VALUE),
        _ => None,
    }
}

fn register_name(offset: u64) -> Option<&'static str> {
    match offset {
        REG_DOUBLER_DEBUG => Some("DOUBLER_DEBUG"),
        REG_SCRATCH0 => Some("SCRATCH0"),
        o if o < pll_ctl0(16) && o % 0x18 == 0 => Some("PLL_CTL0"),
        o if (pll_debug(0)..pll_debug(16)).contains(&o) && o % 4 == 0 => Some("PLL_DEBUG"),
        _ => None,
    }
}

/// PMGR of the A6 (S5L8950X).
#[derive(Debug)]
pub struct S5l8950xPmgr {
    unimp: UnimpReporter,
}

impl S5l8950xPmgr {
    pub fn new(sink: SharedUnimpSink) -> Self {
        tracing::trace!(device = "pmgr", "init");
        Self {
            unimp: UnimpReporter::new("pmgr", sink),
        }
    }
}

impl MmioHandler for S5l8950xPmgr {
    fn read(&self, offset: u64, size: usize) -> u64 {
        match s5l8950x_register(offset) {
            Some(value) => truncate(u64::from(value), size),
            None => self.unimp.read(register_name(offset), offset, size),
        }
    }

    fn write(&self, offset: u64, size: usize, value: u64) {
        self.unimp.write(register_name(offset), offset, size, value);
    }
}

impl MappedDevice for S5l8950xPmgr {
    fn name(&self) -> &str {
        self.unimp.device()
    }

    fn size(&self) -> u64 {
        PMGR_SIZE
    }

    fn reset(&self) {
        tracing::trace!(device = "pmgr", "reset");
    }
}

/// PMGR of the S5L8950 bring-up SoC: every offset is unmodeled.
#[derive(Debug)]
pub struct S5l8950Pmgr {
    unimp: UnimpReporter,
}

impl S5l8950Pmgr {
    pub fn new(sink: SharedUnimpSink) -> Self {
        tracing::trace!(device = "pmgr", "init");
        Self {
            unimp: UnimpReporter::new("pmgr", sink),
        }
    }
}

impl MmioHandler for S5l8950Pmgr {
    fn read(&self, offset: u64, size: usize) -> u64 {
        self.unimp.read(None, offset, size)
    }

    fn write(&self, offset: u64, size: usize, value: u64) {
        self.unimp.write(None, offset, size, value);
    }
}

impl MappedDevice for S5l8950Pmgr {
    fn name(&self) -> &str {
        self.unimp.device()
    }

    fn size(&self) -> u64 {
        PMGR_SIZE
    }

    fn reset(&self) {
        tracing::trace!(device = "pmgr", "reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmio::UnimpLog;

    #[test]
    fn register_offsets_match_the_hardware_layout() {
        assert_eq!(pll_ctl0(4), 0x60);
        assert_eq!(pll_debug(2), 0x2018);
        assert_eq!(pll_debug(8), 0x2030);
        assert_eq!(SCRATCH0_VALUE, 0x400);
        assert_eq!(SCRATCH0_VALUE & BOOT_CONFIG_MASK, SCRATCH0_VALUE);
    }

    #[test]
    fn locked_pll_and_bypass_bits_read_back() {
        let pmgr = S5l8950xPmgr::new(UnimpLog::new());
        assert_eq!(pmgr.read(0x60, 4), 1 << 29);
        for n in 2..=8 {
            assert_eq!(pmgr.read(pll_debug(n), 4), 1 << 30, "PLL_DEBUG({n})");
        }
        assert_eq!(pmgr.read(REG_DOUBLER_DEBUG, 4), 1 << 30);
        assert_eq!(pmgr.read(REG_SCRATCH0, 4), 4 << 8);
    }

    #[test]
    fn neighbouring_plls_are_unmodeled() {
        let log = UnimpLog::new();
        let pmgr = S5l8950xPmgr::new(log.clone());
        assert_eq!(pmgr.read(pll_ctl0(3), 4), 0);
        assert_eq!(pmgr.read(pll_debug(1), 4), 0);
        assert_eq!(pmgr.read(pll_debug(0), 4), 0);

        let names: Vec<_> = log.take().into_iter().map(|e| e.register).collect();
        assert_eq!(
            names,
            [Some("PLL_CTL0"), Some("PLL_DEBUG"), Some("PLL_DEBUG")]
        );
    }

    #[test]
    fn writes_do_not_change_status_bits() {
        let log = UnimpLog::new();
        let pmgr = S5l8950xPmgr::new(log.clone());
        for _ in 0..3 {
            pmgr.write(0x60, 4, 0);
            pmgr.write(REG_SCRATCH0, 4, 0xffff_ffff);
            assert_eq!(pmgr.read(0x60, 4), u64::from(PllCtl::REAL_LOCK.bits()));
            assert_eq!(pmgr.read(REG_SCRATCH0, 4), 0x400);
        }
        assert_eq!(log.len(), 6);
    }

    #[test]
    fn narrow_reads_are_truncated() {
        let pmgr = S5l8950xPmgr::new(UnimpLog::new());
        assert_eq!(pmgr.read(0x60, 2), 0);
        assert_eq!(pmgr.read(REG_SCRATCH0, 2), 0x400);
        assert_eq!(pmgr.read(REG_SCRATCH0, 1), 0);
    }

    #[test]
    fn bring_up_pmgr_answers_zero_everywhere() {
        let log = UnimpLog::new();
        let pmgr = S5l8950Pmgr::new(log.clone());
        assert_eq!(pmgr.read(0x60, 4), 0);
        assert_eq!(pmgr.read(REG_SCRATCH0, 4), 0);
        pmgr.write(0x60, 4, 1);
        assert_eq!(log.len(), 3);
        assert!(log.entries().iter().all(|e| e.register.is_none()));
    }
}
