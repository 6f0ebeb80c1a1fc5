use std::sync::Arc;

use proptest::prelude::*;
use s5l_devices::{
    aic, chipid, gpio, pmgr, Aic, ChipId, Gpio, MappedDevice, MmioHandler, S5l8950xPmgr, Spi,
    UnimpLog,
};

/// (offset, value) pairs that every fresh device of the given kind reads back on its first read.
fn modeled(dev: &str) -> Vec<(u64, u64)> {
    match dev {
        "aic" => vec![(aic::REG_TIME_LO, 0)],
        "pmgr" => {
            let mut regs = vec![
                (pmgr::pll_ctl0(4), 1 << 29),
                (pmgr::REG_DOUBLER_DEBUG, 1 << 30),
                (pmgr::REG_SCRATCH0, 4 << 8),
            ];
            regs.extend((2..=8).map(|n| (pmgr::pll_debug(n), 1 << 30)));
            regs
        }
        "gpio" => vec![
            (gpio::cfg(gpio::GPIO_REQUEST_DFU2), 1),
            (gpio::cfg(gpio::GPIO_REQUEST_DFU1), 1),
            (gpio::cfg(gpio::GPIO_FORCE_DFU), 0),
        ],
        "chipid" => vec![(chipid::REG_CFG_FUSE0, 0)],
        _ => Vec::new(),
    }
}

fn devices(log: &Arc<UnimpLog>) -> Vec<Arc<dyn MappedDevice>> {
    vec![
        Arc::new(Aic::new(log.clone())),
        Arc::new(S5l8950xPmgr::new(log.clone())),
        Arc::new(Gpio::new(log.clone())),
        Arc::new(ChipId::new(log.clone())),
        Arc::new(Spi::new(0, log.clone())),
    ]
}

proptest! {
    #[test]
    fn unmodeled_writes_leave_modeled_registers_alone(
        word in 0u64..(s5l_devices::PERIPHERAL_WINDOW / 4),
        size in prop::sample::select(vec![1usize, 2, 4, 8]),
        value in any::<u64>(),
    ) {
        let log = UnimpLog::new();
        for dev in devices(&log) {
            let offset = word * 4;
            dev.write(offset, size, value);
            for (reg, expected) in modeled(dev.name()) {
                prop_assert_eq!(dev.read(reg, 4), expected, "{} +0x{:x}", dev.name(), reg);
            }
        }
    }

    #[test]
    fn unmodeled_reads_are_zero_and_reported(word in 0u64..(s5l_devices::PERIPHERAL_WINDOW / 4)) {
        let offset = word * 4;
        let log = UnimpLog::new();
        for dev in devices(&log) {
            let is_modeled = modeled(dev.name()).iter().any(|(reg, _)| *reg == offset);
            let before = log.len();
            let value = dev.read(offset, 4);
            if !is_modeled {
                prop_assert_eq!(value, 0);
                prop_assert_eq!(log.len(), before + 1);
            }
        }
    }

    #[test]
    fn aic_writes_anywhere_leave_time_lo_alone(
        word in 0u64..(aic::AIC_SIZE / 4),
        size in prop::sample::select(vec![1usize, 2, 4, 8]),
        value in any::<u64>(),
    ) {
        let dev = Aic::new(UnimpLog::new());
        let offset = word * 4;

        dev.write(offset, size, value);
        prop_assert_eq!(dev.peek_time_lo(), 0);

        prop_assert_eq!(dev.read(aic::REG_TIME_LO, 4), 0);
        dev.write(offset, size, value);
        prop_assert_eq!(dev.peek_time_lo(), aic::TIME_LO_ADVANCED);
    }
}
