#![forbid(unsafe_code)]

//! Register blocks of the S5L8950 / S5L8950X application processors.
//!
//! Every block implements [`MappedDevice`]: a `&self` MMIO decoder plus a reset entry point. Offsets
//! a block does not model read as zero, drop writes and are reported through an [`UnimpSink`].

pub mod aic;
pub mod chipid;
pub mod gpio;
pub mod mmio;
pub mod pmgr;
pub mod spi;
pub mod unimp;

pub use memory::MmioHandler;

pub use aic::Aic;
pub use chipid::{CfgFuse0, ChipId};
pub use gpio::{BootStraps, Gpio};
pub use mmio::{
    AccessKind, MappedDevice, SharedUnimpSink, TracingUnimpSink, UnimpLog, UnimpSink,
    UnimplementedAccess,
};
pub use pmgr::{S5l8950Pmgr, S5l8950xPmgr};
pub use spi::Spi;
pub use unimp::UnimplementedDevice;

/// Size of the MMIO window every peripheral on these SoCs occupies.
pub const PERIPHERAL_WINDOW: u64 = 0x10_0000;
