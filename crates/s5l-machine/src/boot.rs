//! Firmware loading and the boot descriptor handed to the boot core.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use s5l_soc::DeviceId;

use crate::MachineError;

/// Physical address the firmware image is copied to. Execution starts here.
pub const FIRMWARE_LOAD_ADDR: u64 = DeviceId::Sram.base();
/// Largest image the loader accepts.
pub const FIRMWARE_MAX_SIZE: usize = 64 * 1024;

/// Where the firmware comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum FirmwareImage {
    /// Read from disk when the machine is built.
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

impl fmt::Debug for FirmwareImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareImage::Path(path) => f.debug_tuple("Path").field(path).finish(),
            FirmwareImage::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

impl From<PathBuf> for FirmwareImage {
    fn from(path: PathBuf) -> Self {
        FirmwareImage::Path(path)
    }
}

impl From<Vec<u8>> for FirmwareImage {
    fn from(bytes: Vec<u8>) -> Self {
        FirmwareImage::Bytes(bytes.into())
    }
}

/// Where a loaded image came from, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirmwareOrigin {
    Path(PathBuf),
    Bytes,
}

impl fmt::Display for FirmwareOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareOrigin::Path(path) => write!(f, "{}", path.display()),
            FirmwareOrigin::Bytes => f.write_str("<in-memory image>"),
        }
    }
}

/// Boot parameters fixed when the machine is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootDescriptor {
    pub firmware: FirmwareOrigin,
    pub firmware_len: usize,
    pub load_addr: u64,
    pub entry: u64,
    pub ram_size: u64,
}

/// Firmware image read into memory and checked against the load window.
#[derive(Debug, Clone)]
pub(crate) struct LoadedFirmware {
    pub(crate) origin: FirmwareOrigin,
    pub(crate) bytes: Arc<[u8]>,
}

pub(crate) fn load_firmware(image: &FirmwareImage) -> Result<LoadedFirmware, MachineError> {
    let (origin, bytes): (_, Arc<[u8]>) = match image {
        FirmwareImage::Path(path) => {
            let bytes = std::fs::read(path).map_err(|source| MachineError::FirmwareRead {
                path: path.clone(),
                source,
            })?;
            (FirmwareOrigin::Path(path.clone()), bytes.into())
        }
        FirmwareImage::Bytes(bytes) => (FirmwareOrigin::Bytes, bytes.clone()),
    };
    if bytes.len() > FIRMWARE_MAX_SIZE {
        return Err(MachineError::FirmwareTooLarge {
            len: bytes.len(),
            max: FIRMWARE_MAX_SIZE,
        });
    }
    Ok(LoadedFirmware { origin, bytes })
}
