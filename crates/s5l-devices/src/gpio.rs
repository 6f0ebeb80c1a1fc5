//! GPIO controller (Apple GPIO version 2).
//!
//! Pins are numbered `pad * 8 + pin`. Only the three boot-mode pins the boot ROM samples are
//! modeled; they read as constant levels.

use memory::MmioHandler;

use crate::mmio::{truncate, MappedDevice, SharedUnimpSink, UnimpReporter};
use crate::PERIPHERAL_WINDOW;

pub const GPIO_SIZE: u64 = PERIPHERAL_WINDOW;

pub const PAD_PINS: u32 = 8;

pub const fn gpio(pad: u32, pin: u32) -> u32 {
    pad * PAD_PINS + pin
}

/// Offset of the configuration word of pin `n`.
pub const fn cfg(n: u32) -> u64 {
    n as u64 * 4
}

/// Offset of the interrupt word of pin `n`.
pub const fn int(n: u32) -> u64 {
    0x800 + n as u64 * 4
}

pub const GPIO_REQUEST_DFU2: u32 = gpio(0, 0);
pub const GPIO_REQUEST_DFU1: u32 = gpio(0, 1);
pub const GPIO_FORCE_DFU: u32 = gpio(25, 6);

/// Levels of the boot-mode pins.
///
/// The default is the state of an idle handset: both DFU request buttons pulled up (released) and
/// force-DFU low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootStraps {
    pub request_dfu1: bool,
    pub request_dfu2: bool,
    pub force_dfu: bool,
}

impl Default for BootStraps {
    fn default() -> Self {
        Self {
            request_dfu1: true,
            request_dfu2: true,
            force_dfu: false,
        }
    }
}

#[derive(Debug)]
pub struct Gpio {
    straps: BootStraps,
    unimp: UnimpReporter,
}

impl Gpio {
    pub fn new(sink: SharedUnimpSink) -> Self {
        Self::with_straps(BootStraps::default(), sink)
    }

    pub fn with_straps(straps: BootStraps, sink: SharedUnimpSink) -> Self {
        tracing::trace!(device = "gpio", ?straps, "init");
        Self {
            straps,
            unimp: UnimpReporter::new("gpio", sink),
        }
    }

    pub fn straps(&self) -> BootStraps {
        self.straps
    }

    fn strap(&self, offset: u64) -> Option<(&'static str, bool)> {
        match offset {
            o if o == cfg(GPIO_REQUEST_DFU2) => Some(("REQUEST_DFU2", self.straps.request_dfu2)),
            o if o == cfg(GPIO_REQUEST_DFU1) => Some(("REQUEST_DFU1", self.straps.request_dfu1)),
            o if o == cfg(GPIO_FORCE_DFU) => Some(("FORCE_DFU", self.straps.force_dfu)),
            _ => None,
        }
    }
}

fn register_name(offset: u64) -> Option<&'static str> {
    match offset {
        o if o < int(0) && o % 4 == 0 => Some("GPIOCFG"),
        o if (int(0)..int(0x200)).contains(&o) && o % 4 == 0 => Some("GPIOINT"),
        _ => None,
    }
}

impl MmioHandler for Gpio {
    fn read(&self, offset: u64, size: usize) -> u64 {
        match self.strap(offset) {
            Some((pin, level)) => {
                tracing::trace!(device = "gpio", pin, level, "boot strap read");
                truncate(u64::from(level), size)
            }
            None => self.unimp.read(register_name(offset), offset, size),
        }
    }

    fn write(&self, offset: u64, size: usize, value: u64) {
        self.unimp.write(register_name(offset), offset, size, value);
    }
}

impl MappedDevice for Gpio {
    fn name(&self) -> &str {
        self.unimp.device()
    }

    fn size(&self) -> u64 {
        GPIO_SIZE
    }

    fn reset(&self) {
        tracing::trace!(device = "gpio", "reset");
    }
}
