//! Physical memory map shared by the S5L8950 and S5L8950X.
//!
//! The bases are the addresses firmware is built against and must not change.

use std::fmt;

use crate::SocError;

macro_rules! device_table {
    ($($id:ident => $name:literal, $base:literal, $size:literal;)+) => {
        /// Every block with a fixed base in the SoC address map.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum DeviceId {
            $($id,)+
        }

        impl DeviceId {
            pub const ALL: &'static [DeviceId] = &[$(DeviceId::$id,)+];

            pub const fn name(self) -> &'static str {
                match self {
                    $(DeviceId::$id => $name,)+
                }
            }

            pub const fn base(self) -> u64 {
                match self {
                    $(DeviceId::$id => $base,)+
                }
            }

            /// Architectural size of the block's window.
            pub const fn size(self) -> u64 {
                match self {
                    $(DeviceId::$id => $size,)+
                }
            }
        }
    };
}

device_table! {
    Sram => "sram", 0x1000_0000, 0x0008_0000;
    Sdio => "sdio", 0x3000_0000, 0x0010_0000;
    Sha1 => "sha1", 0x3010_0000, 0x0010_0000;
    Sha2 => "sha2", 0x3020_0000, 0x0010_0000;
    NandDll => "nand_dll", 0x3100_0000, 0x0010_0000;
    Fmi0 => "fmi0", 0x3120_0000, 0x0010_0000;
    Fmi1 => "fmi1", 0x3130_0000, 0x0010_0000;
    Spi0 => "spi0", 0x3200_0000, 0x0010_0000;
    Spi1 => "spi1", 0x3210_0000, 0x0010_0000;
    Spi2 => "spi2", 0x3220_0000, 0x0010_0000;
    Spi3 => "spi3", 0x3230_0000, 0x0010_0000;
    Spi4 => "spi4", 0x3240_0000, 0x0010_0000;
    Uart0 => "uart0", 0x3250_0000, 0x0010_0000;
    Uart1 => "uart1", 0x3260_0000, 0x0010_0000;
    Uart2 => "uart2", 0x3270_0000, 0x0010_0000;
    Uart3 => "uart3", 0x3280_0000, 0x0010_0000;
    Uart4 => "uart4", 0x3290_0000, 0x0010_0000;
    Uart5 => "uart5", 0x32A0_0000, 0x0010_0000;
    Uart6 => "uart6", 0x32B0_0000, 0x0010_0000;
    Pke => "pke", 0x3310_0000, 0x0010_0000;
    Iic => "iic", 0x3320_0000, 0x0010_0000;
    Audio => "audio", 0x3400_0000, 0x0010_0000;
    UsbPhy => "usbphy", 0x3600_0000, 0x0010_0000;
    UsbOtg => "usbotg", 0x3610_0000, 0x0010_0000;
    UperfWidgets => "uperf_widgets", 0x36E0_0000, 0x0010_0000;
    UperfPl301 => "uperf_pl301", 0x36F0_0000, 0x0010_0000;
    Cdma => "cdma", 0x3700_0000, 0x0010_0000;
    Venc => "venc", 0x3800_0000, 0x0010_0000;
    Vdec => "vdec", 0x3810_0000, 0x0010_0000;
    Jpeg0 => "jpeg0", 0x3820_0000, 0x0010_0000;
    Scaler => "scaler", 0x3830_0000, 0x0010_0000;
    Jpeg1 => "jpeg1", 0x3850_0000, 0x0010_0000;
    NrtDart => "nrt_dart", 0x38B0_0000, 0x0010_0000;
    NrtDartWidgets => "nrt_dart_widgets", 0x38C0_0000, 0x0010_0000;
    NrtDartPl301 => "nrt_dart_pl301", 0x38D0_0000, 0x0010_0000;
    NrtTopWidgets => "nrt_top_widgets", 0x38E0_0000, 0x0010_0000;
    NrtTopPl301 => "nrt_top_pl301", 0x38F0_0000, 0x0010_0000;
    Clcd => "clcd", 0x3920_0000, 0x0010_0000;
    Dither0 => "dither0", 0x3930_0000, 0x0010_0000;
    TvOut => "tvout", 0x3940_0000, 0x0010_0000;
    Dsim => "dsim", 0x3950_0000, 0x0010_0000;
    RgbOut => "rgbout", 0x3960_0000, 0x0010_0000;
    Dp => "dp", 0x3970_0000, 0x0010_0000;
    Dither1 => "dither1", 0x3980_0000, 0x0010_0000;
    Lpdp => "lpdp", 0x3990_0000, 0x0010_0000;
    Isp => "isp", 0x3A00_0000, 0x0010_0000;
    Disp0 => "disp0", 0x3A10_0000, 0x0010_0000;
    Disp1 => "disp1", 0x3A20_0000, 0x0010_0000;
    RtDart => "rt_dart", 0x3A40_0000, 0x0010_0000;
    RtTopWidgets => "rt_top_widgets", 0x3A50_0000, 0x0010_0000;
    RtTopPl301 => "rt_top_pl301", 0x3A60_0000, 0x0010_0000;
    Adsp => "adsp", 0x3B00_0000, 0x0010_0000;
    Amp => "amp", 0x3D00_0000, 0x0010_0000;
    Scc => "scc", 0x3D20_0000, 0x0010_0000;
    Vrom => "vrom", 0x3F00_0000, 0x0001_0000;
    Pmgr => "pmgr", 0x3F10_0000, 0x0010_0000;
    Aic => "aic", 0x3F20_0000, 0x0010_0000;
    Iop => "iop", 0x3F30_0000, 0x0010_0000;
    Rosc => "rosc", 0x3F40_0000, 0x0010_0000;
    ChipId => "chipid", 0x3F50_0000, 0x0010_0000;
    Swi => "swi", 0x3F60_0000, 0x0010_0000;
    Dwi => "dwi", 0x3F70_0000, 0x0010_0000;
    Amc => "amc", 0x3F80_0000, 0x0010_0000;
    Gpio => "gpio", 0x3FA0_0000, 0x0010_0000;
    Pio => "pio", 0x3FB0_0000, 0x0010_0000;
    Cim => "cim", 0x3FD0_0000, 0x0010_0000;
    CdioWidgets => "cdio_widgets", 0x3FE0_0000, 0x0010_0000;
    CdioPl301 => "cdio_pl301", 0x3FF0_0000, 0x0010_0000;
    Sdram => "sdram", 0x8000_0000, 0x4000_0000;
}

impl DeviceId {
    pub fn end(self) -> u64 {
        self.base() + self.size()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }

    pub const SPI: [DeviceId; 5] = [Self::Spi0, Self::Spi1, Self::Spi2, Self::Spi3, Self::Spi4];

    /// The `n`th SPI controller, if it exists.
    pub fn spi(n: usize) -> Option<Self> {
        Self::SPI.get(n).copied()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Upper bound of the peripheral half of the physical address space.
pub const PERIPHERAL_SPACE_END: u64 = 0x8000_0000;

/// The SDIO controller's catch-all window spans its whole 16 MiB block, past the blocks that follow
/// it.
pub const SDIO_UNIMPLEMENTED_SIZE: u64 = 0x0100_0000;

/// A range answered by the generic unimplemented-device handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnimplementedRange {
    pub name: &'static str,
    pub base: u64,
    pub size: u64,
}

impl UnimplementedRange {
    /// Catch-all for the whole peripheral space.
    pub const UNKNOWN_PERIPHERAL: UnimplementedRange = UnimplementedRange {
        name: "unk_peripheral",
        base: 0,
        size: PERIPHERAL_SPACE_END,
    };

    /// Catch-all covering `id`'s window.
    pub fn for_device(id: DeviceId) -> Self {
        let size = match id {
            DeviceId::Sdio => SDIO_UNIMPLEMENTED_SIZE,
            other => other.size(),
        };
        Self {
            name: id.name(),
            base: id.base(),
            size,
        }
    }
}

/// Check that no two table entries overlap.
pub fn validate(entries: &[DeviceId]) -> Result<(), SocError> {
    let mut sorted: Vec<DeviceId> = entries.to_vec();
    sorted.sort_by_key(|id| (id.base(), id.size()));
    for pair in sorted.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b.base() < a.end() {
            return Err(SocError::MemoryMapOverlap {
                first: a.name(),
                first_range: (a.base(), a.end()),
                second: b.name(),
                second_range: (b.base(), b.end()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_every_block_once() {
        assert_eq!(DeviceId::ALL.len(), 69);
        let mut names: Vec<_> = DeviceId::ALL.iter().map(|id| id.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 69);
    }

    #[test]
    fn canonical_table_does_not_overlap() {
        validate(DeviceId::ALL).unwrap();
    }

    #[test]
    fn well_known_bases() {
        assert_eq!(DeviceId::Sram.base(), 0x1000_0000);
        assert_eq!(DeviceId::Vrom.base(), 0x3F00_0000);
        assert_eq!(DeviceId::Pmgr.base(), 0x3F10_0000);
        assert_eq!(DeviceId::Aic.base(), 0x3F20_0000);
        assert_eq!(DeviceId::ChipId.base(), 0x3F50_0000);
        assert_eq!(DeviceId::Gpio.base(), 0x3FA0_0000);
        assert_eq!(DeviceId::Sdram.base(), 0x8000_0000);
        assert_eq!(DeviceId::Sdram.size(), 0x4000_0000);
        assert_eq!(DeviceId::spi(4), Some(DeviceId::Spi4));
        assert_eq!(DeviceId::spi(5), None);
    }

    #[test]
    fn table_is_sorted_by_base() {
        assert!(DeviceId::ALL
            .windows(2)
            .all(|w| w[0].base() < w[1].base()));
    }

    #[test]
    fn sdio_catch_all_spans_sixteen_megabytes() {
        let sdio = UnimplementedRange::for_device(DeviceId::Sdio);
        assert_eq!((sdio.base, sdio.size), (0x3000_0000, 0x0100_0000));
        let vrom = UnimplementedRange::for_device(DeviceId::Vrom);
        assert_eq!(vrom.size, 0x1_0000);
    }

    #[test]
    fn overlap_is_reported_with_both_ranges() {
        let err = validate(&[DeviceId::Sram, DeviceId::Sram]).unwrap_err();
        assert!(matches!(
            err,
            SocError::MemoryMapOverlap {
                first: "sram",
                second: "sram",
                ..
            }
        ));
        assert!(DeviceId::from_name("chipid") == Some(DeviceId::ChipId));
    }
}
