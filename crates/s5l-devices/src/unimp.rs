use std::sync::Arc;

use memory::MmioHandler;

use crate::mmio::{MappedDevice, SharedUnimpSink, UnimpReporter};

/// Catch-all device covering an address range nothing else models.
///
/// Reads return zero and writes are dropped; every access is reported with its offset relative to
/// the start of the range.
#[derive(Debug)]
pub struct UnimplementedDevice {
    size: u64,
    unimp: UnimpReporter,
}

impl UnimplementedDevice {
    pub fn new(name: impl Into<Arc<str>>, size: u64, sink: SharedUnimpSink) -> Self {
        Self {
            size,
            unimp: UnimpReporter::new(name, sink),
        }
    }
}

impl MmioHandler for UnimplementedDevice {
    fn read(&self, offset: u64, size: usize) -> u64 {
        self.unimp.read(None, offset, size)
    }

    fn write(&self, offset: u64, size: usize, value: u64) {
        self.unimp.write(None, offset, size, value);
    }
}

impl MappedDevice for UnimplementedDevice {
    fn name(&self) -> &str {
        self.unimp.device()
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn reset(&self) {}
}
