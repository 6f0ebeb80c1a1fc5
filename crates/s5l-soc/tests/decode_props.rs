use proptest::prelude::*;
use s5l_devices::UnimpLog;
use s5l_soc::{ArmCpuFactory, DeviceId, Soc, SocConfig, SocVariant};

fn mmio_entries() -> Vec<DeviceId> {
    DeviceId::ALL
        .iter()
        .copied()
        .filter(|id| !matches!(id, DeviceId::Sram | DeviceId::Vrom | DeviceId::Sdram))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn in_window_addresses_resolve_to_their_block(
        entry in prop::sample::select(mmio_entries()),
        word in 0u64..0x4_0000,
    ) {
        let soc = Soc::new(&SocConfig::new(SocVariant::S5l8950x), &ArmCpuFactory, UnimpLog::new())
            .unwrap();
        let paddr = entry.base() + word * 4;
        let region = soc.address_space().resolve(paddr).unwrap();
        prop_assert_eq!(region.name, entry.name());
    }

    #[test]
    fn peripheral_space_is_fully_covered(paddr in 0u64..0x8000_0000) {
        let soc = Soc::new(&SocConfig::new(SocVariant::S5l8950), &ArmCpuFactory, UnimpLog::new())
            .unwrap();
        prop_assert!(soc.address_space().resolve(paddr).is_some());
    }
}
