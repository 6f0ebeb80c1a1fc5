//! Guest physical memory for the emulated SoC: RAM/ROM blocks, MMIO routing, alias regions and
//! catch-all background regions, composed into one [`AddressSpace`].
#![forbid(unsafe_code)]

mod address_space;
pub mod bus;
mod ram;

pub use address_space::{
    AddressSpace, MapError, MmioHandler, RegionId, RegionInfo, RegionKind, BACKGROUND_PRIORITY,
    DEFAULT_PRIORITY,
};
pub use bus::MemoryBus;
pub use ram::{RamBlock, RamError, DEFAULT_CHUNK_SIZE};

#[cfg(test)]
mod tests;
