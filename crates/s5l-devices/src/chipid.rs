//! Chip identification / fuse block.
//!
//! `CFG_FUSE0` describes a development part: not production-fused, not secure, security domain 0,
//! board id 0, no ECID personalization and minimum epoch 0. Every other fuse word is unmodeled.

use bitflags::bitflags;
use memory::MmioHandler;

use crate::mmio::{truncate, MappedDevice, SharedUnimpSink, UnimpReporter};
use crate::PERIPHERAL_WINDOW;

pub const CHIPID_SIZE: u64 = PERIPHERAL_WINDOW;

pub const REG_CFG_FUSE0: u64 = 0x00;
pub const REG_CFG_FUSE1: u64 = 0x04;
pub const REG_CFG_FUSE2: u64 = 0x08;
pub const REG_CFG_FUSE3: u64 = 0x0C;
pub const REG_CFG_FUSE4: u64 = 0x10;
pub const REG_CFG_FUSE5: u64 = 0x14;
pub const REG_ECID_LO: u64 = 0x20;
pub const REG_ECID_HI: u64 = 0x24;

pub const fn dvfm_fuse(n: u64) -> u64 {
    0x40 + n * 4
}

pub const fn scc_fuse(n: u64) -> u64 {
    0x80 + n * 4
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CfgFuse0: u32 {
        const PRODUCTION_MODE = 1 << 0;
        const SECURE_MODE = 1 << 1;
        const SECURITY_DOMAIN = 0x3 << 2;
        const BOARD_ID = 0x3 << 4;
        const ECID_IMAGE_PERSONALIZATION_REQUIRED = 1 << 7;
        const MINIMUM_EPOCH = 0x7F << 9;
    }
}

impl CfgFuse0 {
    pub fn security_domain(self) -> u32 {
        (self & Self::SECURITY_DOMAIN).bits() >> 2
    }

    pub fn board_id(self) -> u32 {
        (self & Self::BOARD_ID).bits() >> 4
    }

    pub fn minimum_epoch(self) -> u32 {
        (self & Self::MINIMUM_EPOCH).bits() >> 9
    }
}

/// Power-on `CFG_FUSE0` of the emulated part.
pub const DEFAULT_CFG_FUSE0: CfgFuse0 = CfgFuse0::empty();

fn register_name(offset: u64) -> Option<&'static str> {
    match offset {
        REG_CFG_FUSE1 => Some("CFG_FUSE1"),
        REG_CFG_FUSE2 => Some("CFG_FUSE2"),
        REG_CFG_FUSE3 => Some("CFG_FUSE3"),
        REG_CFG_FUSE4 => Some("CFG_FUSE4"),
        REG_CFG_FUSE5 => Some("CFG_FUSE5"),
        REG_ECID_LO => Some("ECID_LO"),
        REG_ECID_HI => Some("ECID_HI"),
        o if (dvfm_fuse(0)..scc_fuse(0)).contains(&o) && o % 4 == 0 => Some("DVFM_FUSE"),
        o if (scc_fuse(0)..scc_fuse(16)).contains(&o) && o % 4 == 0 => Some("SCC_FUSE"),
        _ => None,
    }
}

#[derive(Debug)]
pub struct ChipId {
    fuse0: CfgFuse0,
    unimp: UnimpReporter,
}

impl ChipId {
    pub fn new(sink: SharedUnimpSink) -> Self {
        tracing::trace!(device = "chipid", "init");
        Self {
            fuse0: DEFAULT_CFG_FUSE0,
            unimp: UnimpReporter::new("chipid", sink),
        }
    }

    pub fn cfg_fuse0(&self) -> CfgFuse0 {
        self.fuse0
    }
}

impl MmioHandler for ChipId {
    fn read(&self, offset: u64, size: usize) -> u64 {
        match offset {
            REG_CFG_FUSE0 => {
                tracing::trace!(device = "chipid", fuse0 = ?self.fuse0, "CFG_FUSE0 read");
                truncate(u64::from(self.fuse0.bits()), size)
            }
            _ => self.unimp.read(register_name(offset), offset, size),
        }
    }

    fn write(&self, offset: u64, size: usize, value: u64) {
        let register = match offset {
            REG_CFG_FUSE0 => Some("CFG_FUSE0"),
            _ => register_name(offset),
        };
        self.unimp.write(register, offset, size, value);
    }
}

impl MappedDevice for ChipId {
    fn name(&self) -> &str {
        self.unimp.device()
    }

    fn size(&self) -> u64 {
        CHIPID_SIZE
    }

    fn reset(&self) {
        tracing::trace!(device = "chipid", "reset");
    }
}
