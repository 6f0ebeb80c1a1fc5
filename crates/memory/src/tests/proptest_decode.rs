use crate::{AddressSpace, MemoryBus, MmioHandler};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Tagged {
    tag: u64,
    hits: AtomicUsize,
}

impl MmioHandler for Tagged {
    fn read(&self, offset: u64, _size: usize) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed);
        (self.tag << 24) | (offset & 0xff_ffff)
    }

    fn write(&self, _offset: u64, _size: usize, _value: u64) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }
}

const WINDOW: u64 = 0x10_0000;
const BASES: [u64; 4] = [0x3F10_0000, 0x3F20_0000, 0x3F50_0000, 0x3FA0_0000];

fn build() -> (AddressSpace, Vec<Arc<Tagged>>) {
    let mut space = AddressSpace::new();
    let fallback = Arc::new(Tagged {
        tag: 0xff,
        hits: AtomicUsize::new(0),
    });
    space
        .map_background("unk", 0, 0x8000_0000, fallback)
        .unwrap();
    let mut devs = Vec::new();
    for (i, base) in BASES.iter().enumerate() {
        let dev = Arc::new(Tagged {
            tag: i as u64,
            hits: AtomicUsize::new(0),
        });
        space
            .map_mmio(&format!("dev{i}"), *base, WINDOW, dev.clone())
            .unwrap();
        devs.push(dev);
    }
    (space, devs)
}

proptest! {
    #[test]
    fn every_in_window_access_reaches_exactly_one_device(
        dev in 0usize..BASES.len(),
        offset in (0u64..WINDOW / 4).prop_map(|w| w * 4),
    ) {
        let (space, devs) = build();
        let value = space.read_u32(BASES[dev] + offset);
        prop_assert_eq!(u64::from(value), ((dev as u64) << 24) | offset);

        for (i, d) in devs.iter().enumerate() {
            let expected = usize::from(i == dev);
            prop_assert_eq!(d.hits.load(Ordering::Relaxed), expected);
        }
    }

    #[test]
    fn resolve_agrees_with_region_bounds(paddr in 0u64..0x9000_0000) {
        let (space, _devs) = build();
        match space.resolve(paddr) {
            Some(info) => {
                prop_assert!(info.contains(paddr));
                let in_device = BASES.iter().any(|b| paddr >= *b && paddr < b + WINDOW);
                prop_assert_eq!(info.is_background(), !in_device);
            }
            None => prop_assert!(paddr >= 0x8000_0000),
        }
    }
}
