//! Apple interrupt controller (AIC), version 1 as found on the A6.
//!
//! Only the low half of the free-running timebase is modeled. Early firmware spins on `TIME_LO`
//! until it observes the counter move, so reads alternate between `0` and [`TIME_LO_ADVANCED`]
//! instead of tracking elapsed time: the first read after reset returns `0`, the second returns
//! `0x8FFF_FFFF`, the third `0` again, and so on.

use std::sync::atomic::{AtomicU32, Ordering};

use memory::MmioHandler;

use crate::mmio::{truncate, MappedDevice, SharedUnimpSink, UnimpReporter};
use crate::PERIPHERAL_WINDOW;

pub const AIC_SIZE: u64 = PERIPHERAL_WINDOW;

pub const REG_TIME_LO: u64 = 0x0020;
pub const REG_TIME_HI: u64 = 0x0028;

/// Value `TIME_LO` reads as after a read that returned zero.
pub const TIME_LO_ADVANCED: u32 = 0x8FFF_FFFF;

#[derive(Debug)]
pub struct Aic {
    time_lo: AtomicU32,
    unimp: UnimpReporter,
}

impl Aic {
    pub fn new(sink: SharedUnimpSink) -> Self {
        tracing::trace!(device = "aic", "init");
        Self {
            time_lo: AtomicU32::new(0),
            unimp: UnimpReporter::new("aic", sink),
        }
    }

    /// Current `TIME_LO` state without the read side effect.
    pub fn peek_time_lo(&self) -> u32 {
        self.time_lo.load(Ordering::Acquire)
    }

    /// Guest-visible `TIME_LO` read: return the stored value and flip it.
    ///
    /// The test-and-flip is a single atomic update, so concurrent readers on different cores each
    /// observe a distinct step of the 0 / `TIME_LO_ADVANCED` cycle.
    fn read_time_lo(&self) -> u32 {
        let prev = self
            .time_lo
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                Some(if cur == 0 { TIME_LO_ADVANCED } else { 0 })
            });
        // The closure never declines the update.
        prev.unwrap_or_else(|cur| cur)
    }
}

impl MmioHandler for Aic {
    fn read(&self, offset: u64, size: usize) -> u64 {
        match offset {
            REG_TIME_LO => truncate(u64::from(self.read_time_lo()), size),
            REG_TIME_HI => self.unimp.read(Some("TIME_HI"), offset, size),
            _ => self.unimp.read(None, offset, size),
        }
    }

    fn write(&self, offset: u64, size: usize, value: u64) {
        let register = match offset {
            REG_TIME_LO => Some("TIME_LO"),
            REG_TIME_HI => Some("TIME_HI"),
            _ => None,
        };
        self.unimp.write(register, offset, size, value);
    }
}

impl MappedDevice for Aic {
    fn name(&self) -> &str {
        self.unimp.device()
    }

    fn size(&self) -> u64 {
        AIC_SIZE
    }

    fn reset(&self) {
        tracing::trace!(device = "aic", "reset");
        self.time_lo.store(0, Ordering::Release);
    }
}
