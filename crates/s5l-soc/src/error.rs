use memory::{MapError, RamError};
use thiserror::Error;

use crate::cpu::CpuRealizeError;

/// Fatal SoC construction errors. A SoC that fails to build is never handed out partially built.
#[derive(Debug, Error)]
pub enum SocError {
    #[error(
        "memory map entries `{first}` [0x{:x}, 0x{:x}) and `{second}` [0x{:x}, 0x{:x}) overlap",
        first_range.0, first_range.1, second_range.0, second_range.1
    )]
    MemoryMapOverlap {
        first: &'static str,
        first_range: (u64, u64),
        second: &'static str,
        second_range: (u64, u64),
    },

    #[error("failed to map SoC region: {0}")]
    Map(#[from] MapError),

    #[error("failed to allocate SoC memory: {0}")]
    Ram(#[from] RamError),

    #[error("failed to realize cpu[{index}]: {source}")]
    CpuRealize {
        index: usize,
        #[source]
        source: CpuRealizeError,
    },

    #[error("SoC has {count} cores, cpu[{index}] does not exist")]
    NoSuchCore { index: usize, count: usize },

    #[error("cpu[{index}] is already powered on")]
    CoreAlreadyOn { index: usize },
}
