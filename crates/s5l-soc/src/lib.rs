#![forbid(unsafe_code)]

//! S5L8950 / S5L8950X SoC composer.
//!
//! [`Soc::new`] builds the CPU core set and the physical address space: SRAM, VROM, the reset
//! alias at address zero, every modeled register block at its fixed base and catch-all handlers
//! for everything else.

pub mod cpu;
mod error;
pub mod memmap;
mod soc;

pub use cpu::{
    ArmCpu, ArmCpuFactory, CpuCore, CpuCoreConfig, CpuCoreSet, CpuFactory, CpuFeatures,
    CpuRealizeError, PowerState,
};
pub use error::SocError;
pub use memmap::{DeviceId, UnimplementedRange};
pub use soc::{Soc, SocConfig, SocVariant};
