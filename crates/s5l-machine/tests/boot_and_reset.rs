use std::io::Write;
use std::sync::{Arc, Barrier};
use std::thread;

use memory::MemoryBus;
use s5l_devices::UnimpLog;
use s5l_machine::{FirmwareImage, FirmwareOrigin, Machine, MachineConfig, MachineError};
use s5l_soc::{ArmCpuFactory, PowerState, SocError};

const FIRMWARE: [u8; 16] = [
    0x06, 0x00, 0x00, 0xEA, // b reset
    0xFE, 0xFF, 0xFF, 0xEA, // b .
    0x11, 0x22, 0x33, 0x44, //
    0x55, 0x66, 0x77, 0x88, //
];

fn machine(name: &str) -> Machine {
    Machine::with_hooks(
        MachineConfig {
            machine: name.into(),
            firmware: Some(FirmwareImage::from(FIRMWARE.to_vec())),
            ..Default::default()
        },
        &ArmCpuFactory,
        UnimpLog::new(),
    )
    .unwrap()
}

#[test]
fn firmware_lands_at_sram_base_and_boot_core_starts_there() {
    let m = machine("iphone-n42ap");
    let bus = m.bus();

    assert_eq!(bus.read_u32(0x1000_0000), 0xEA00_0006);
    assert_eq!(bus.read_u32(0x1000_000C), 0x8877_6655);

    let boot = m.boot();
    assert_eq!(boot.load_addr, 0x1000_0000);
    assert_eq!(boot.entry, 0x1000_0000);
    assert_eq!(boot.ram_size, 1 << 30);
    assert_eq!(boot.firmware, FirmwareOrigin::Bytes);
    assert_eq!(boot.firmware_len, 16);

    assert_eq!(m.cpus().boot_core().power_state(), PowerState::On);
    assert_eq!(m.cpus().boot_core().pc(), 0x1000_0000);
    assert_eq!(m.cpus().core(1).unwrap().power_state(), PowerState::Off);

    // Address zero mirrors the (empty) VROM on the full SoC.
    assert_eq!(bus.read_u32(0), 0);
}

#[test]
fn minimal_board_runs_firmware_from_the_zero_alias() {
    let m = machine("iphone-n42ap-minimal");
    assert_eq!(m.bus().read_u32(0), 0xEA00_0006);
    assert_eq!(m.bus().read_u32(0x4), 0xEAFF_FFFE);
}

#[test]
fn firmware_is_read_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&FIRMWARE).unwrap();
    file.flush().unwrap();

    let m = Machine::with_hooks(
        MachineConfig {
            firmware: Some(FirmwareImage::Path(file.path().to_path_buf())),
            ..Default::default()
        },
        &ArmCpuFactory,
        UnimpLog::new(),
    )
    .unwrap();
    assert_eq!(
        m.boot().firmware,
        FirmwareOrigin::Path(file.path().to_path_buf())
    );
    assert_eq!(m.bus().read_u32(0x1000_0004), 0xEAFF_FFFE);
}

#[test]
fn reset_restores_power_on_state() {
    let mut m = machine("iphone-n42ap");
    let bus = m.bus();

    // Guest scribbles over its own image and advances the AIC timebase.
    bus.write_u32(0x1000_0000, 0);
    bus.write_u32(0x1000_1000, 0xDEAD_BEEF);
    assert_eq!(bus.read_u32(0x3F20_0020), 0);
    m.release_core(1, 0x1000_0200).unwrap();
    assert_eq!(m.cpus().powered_on(), [0, 1]);

    m.reset();

    assert_eq!(bus.read_u32(0x1000_0000), 0xEA00_0006);
    assert_eq!(bus.read_u32(0x3F20_0020), 0);
    assert_eq!(bus.read_u32(0x3F20_0020), 0x8FFF_FFFF);
    assert_eq!(m.cpus().powered_on(), [0]);
    assert_eq!(m.cpus().boot_core().pc(), 0x1000_0000);
}

#[test]
fn releasing_cores_is_checked() {
    let mut m = machine("iphone-n42ap");
    assert!(matches!(
        m.release_core(0, 0x1000_0000),
        Err(MachineError::Soc(SocError::CoreAlreadyOn { index: 0 }))
    ));
    assert!(matches!(
        m.release_core(7, 0x1000_0000),
        Err(MachineError::Soc(SocError::NoSuchCore { index: 7, count: 2 }))
    ));
    m.release_core(1, 0x1000_0100).unwrap();
    assert_eq!(m.cpus().core(1).unwrap().pc(), 0x1000_0100);
}

#[test]
fn both_cores_poll_the_aic_through_the_shared_bus() {
    const READS: usize = 1_001;

    let mut m = machine("iphone-n42ap");
    m.release_core(1, 0x1000_0000).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let bus = m.bus();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                (0..READS)
                    .filter(|_| bus.read_u32(0x3F20_0020) == 0)
                    .count()
            })
        })
        .collect();
    let zeros: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(zeros, (2 * READS).div_ceil(2));
}
