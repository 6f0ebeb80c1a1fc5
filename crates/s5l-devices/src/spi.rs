//! SPI controller. No register is modeled; the block reserves its window so stray firmware probes
//! are reported instead of falling through to the generic catch-all.

use memory::MmioHandler;

use crate::mmio::{MappedDevice, SharedUnimpSink, UnimpReporter};
use crate::PERIPHERAL_WINDOW;

pub const SPI_SIZE: u64 = PERIPHERAL_WINDOW;

#[derive(Debug)]
pub struct Spi {
    index: usize,
    unimp: UnimpReporter,
}

impl Spi {
    pub fn new(index: usize, sink: SharedUnimpSink) -> Self {
        tracing::trace!(device = "spi", index, "init");
        Self {
            index,
            unimp: UnimpReporter::new(format!("spi{index}"), sink),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl MmioHandler for Spi {
    fn read(&self, offset: u64, size: usize) -> u64 {
        self.unimp.read(None, offset, size)
    }

    fn write(&self, offset: u64, size: usize, value: u64) {
        self.unimp.write(None, offset, size, value);
    }
}

impl MappedDevice for Spi {
    fn name(&self) -> &str {
        self.unimp.device()
    }

    fn size(&self) -> u64 {
        SPI_SIZE
    }

    fn reset(&self) {
        tracing::trace!(device = "spi", index = self.index, "reset");
    }
}
