use std::sync::Arc;

use thiserror::Error;

use crate::bus::MemoryBus;
use crate::ram::RamBlock;

/// Priority of canonical RAM/ROM/MMIO regions and aliases.
pub const DEFAULT_PRIORITY: i32 = 0;
/// Priority of catch-all regions that only answer when nothing else claims an address.
pub const BACKGROUND_PRIORITY: i32 = -1000;

/// A memory-mapped register window.
///
/// `offset` is relative to the start of the mapped region and `size` is the access width in bytes
/// (1, 2, 4 or 8). Handlers are shared between every core that can issue accesses, so they take
/// `&self` and keep any mutable state behind atomics or locks.
pub trait MmioHandler: Send + Sync {
    fn read(&self, offset: u64, size: usize) -> u64;
    fn write(&self, offset: u64, size: usize, value: u64);
}

/// Stable handle for a region mapped into an [`AddressSpace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Ram,
    Rom,
    Mmio,
    Alias { target: RegionId, offset: u64 },
}

/// Public description of a mapped region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInfo {
    pub id: RegionId,
    pub name: String,
    pub start: u64,
    pub len: u64,
    pub priority: i32,
    pub kind: RegionKind,
}

impl RegionInfo {
    pub fn end(&self) -> u64 {
        self.start + self.len
    }

    pub fn is_background(&self) -> bool {
        self.priority < DEFAULT_PRIORITY
    }

    pub fn contains(&self, paddr: u64) -> bool {
        paddr >= self.start && paddr - self.start < self.len
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("region `{name}` is empty")]
    EmptyRegion { name: String },

    #[error("region `{name}` at 0x{start:x} (len 0x{len:x}) overflows the physical address space")]
    AddressOverflow { name: String, start: u64, len: u64 },

    #[error(
        "region `{name}` [0x{start:x}, 0x{end:x}) overlaps `{existing}` [0x{existing_start:x}, 0x{existing_end:x})"
    )]
    Overlap {
        name: String,
        start: u64,
        end: u64,
        existing: String,
        existing_start: u64,
        existing_end: u64,
    },

    #[error("alias `{name}` targets unknown region {target:?}")]
    UnknownAliasTarget { name: String, target: RegionId },

    #[error("alias `{name}` cannot target another alias `{target}`")]
    AliasOfAlias { name: String, target: String },

    #[error(
        "alias `{name}` window 0x{offset:x}+0x{len:x} exceeds target `{target}` (0x{target_len:x} bytes)"
    )]
    AliasOutOfRange {
        name: String,
        target: String,
        offset: u64,
        len: u64,
        target_len: u64,
    },
}

enum Backing {
    Ram(Arc<RamBlock>),
    Rom(Arc<RamBlock>),
    Mmio(Arc<dyn MmioHandler>),
    Alias { target: RegionId, offset: u64 },
}

struct Region {
    name: String,
    start: u64,
    len: u64,
    priority: i32,
    backing: Backing,
}

impl Region {
    fn contains(&self, paddr: u64) -> bool {
        paddr >= self.start && paddr - self.start < self.len
    }

    fn end(&self) -> u64 {
        self.start + self.len
    }

    fn is_canonical(&self) -> bool {
        self.priority >= DEFAULT_PRIORITY && !matches!(self.backing, Backing::Alias { .. })
    }

    fn kind(&self) -> RegionKind {
        match self.backing {
            Backing::Ram(_) => RegionKind::Ram,
            Backing::Rom(_) => RegionKind::Rom,
            Backing::Mmio(_) => RegionKind::Mmio,
            Backing::Alias { target, offset } => RegionKind::Alias { target, offset },
        }
    }
}

/// Guest physical address space (RAM + ROM + MMIO + aliases) for one machine.
///
/// Regions are resolved by priority: canonical regions and aliases ([`DEFAULT_PRIORITY`]) always
/// win over catch-all regions ([`BACKGROUND_PRIORITY`]). Among overlapping regions of equal
/// priority the most recently mapped one answers. Canonical (non-alias, non-background) regions
/// are checked for overlap when they are mapped.
///
/// Accesses that land in no region read as zero and drop writes.
///
/// The map is built once through `&mut self` and then shared read-only (typically as
/// `Arc<AddressSpace>`); all access paths take `&self`.
#[derive(Default)]
pub struct AddressSpace {
    regions: Vec<Region>,
    // Indices into `regions`, highest priority first, newest first within a priority.
    lookup: Vec<usize>,
}

impl AddressSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_ram(
        &mut self,
        name: &str,
        start: u64,
        block: Arc<RamBlock>,
    ) -> Result<RegionId, MapError> {
        let len = block.size();
        self.insert(name, start, len, DEFAULT_PRIORITY, Backing::Ram(block))
    }

    /// Map a read-only block. Guest writes are dropped; the host may still fill the block through
    /// [`RamBlock::write_bytes`].
    pub fn map_rom(
        &mut self,
        name: &str,
        start: u64,
        block: Arc<RamBlock>,
    ) -> Result<RegionId, MapError> {
        let len = block.size();
        self.insert(name, start, len, DEFAULT_PRIORITY, Backing::Rom(block))
    }

    pub fn map_mmio(
        &mut self,
        name: &str,
        start: u64,
        len: u64,
        handler: Arc<dyn MmioHandler>,
    ) -> Result<RegionId, MapError> {
        self.insert(name, start, len, DEFAULT_PRIORITY, Backing::Mmio(handler))
    }

    /// Map a catch-all handler that only sees accesses no other region claims.
    ///
    /// Background regions may overlap anything, including each other.
    pub fn map_background(
        &mut self,
        name: &str,
        start: u64,
        len: u64,
        handler: Arc<dyn MmioHandler>,
    ) -> Result<RegionId, MapError> {
        self.insert(name, start, len, BACKGROUND_PRIORITY, Backing::Mmio(handler))
    }

    /// Map `len` bytes of `target` (starting at `offset` within it) at `start`.
    ///
    /// Reads and writes through the alias behave exactly like accesses to the target, including
    /// ROM write protection.
    pub fn map_alias(
        &mut self,
        name: &str,
        start: u64,
        target: RegionId,
        offset: u64,
        len: u64,
    ) -> Result<RegionId, MapError> {
        let Some(target_region) = self.regions.get(target.0) else {
            return Err(MapError::UnknownAliasTarget {
                name: name.to_string(),
                target,
            });
        };
        if matches!(target_region.backing, Backing::Alias { .. }) {
            return Err(MapError::AliasOfAlias {
                name: name.to_string(),
                target: target_region.name.clone(),
            });
        }
        if offset
            .checked_add(len)
            .map_or(true, |end| end > target_region.len)
        {
            return Err(MapError::AliasOutOfRange {
                name: name.to_string(),
                target: target_region.name.clone(),
                offset,
                len,
                target_len: target_region.len,
            });
        }
        self.insert(
            name,
            start,
            len,
            DEFAULT_PRIORITY,
            Backing::Alias { target, offset },
        )
    }

    fn insert(
        &mut self,
        name: &str,
        start: u64,
        len: u64,
        priority: i32,
        backing: Backing,
    ) -> Result<RegionId, MapError> {
        if len == 0 {
            return Err(MapError::EmptyRegion {
                name: name.to_string(),
            });
        }
        let Some(end) = start.checked_add(len) else {
            return Err(MapError::AddressOverflow {
                name: name.to_string(),
                start,
                len,
            });
        };

        let region = Region {
            name: name.to_string(),
            start,
            len,
            priority,
            backing,
        };

        if region.is_canonical() {
            if let Some(existing) = self
                .regions
                .iter()
                .filter(|r| r.is_canonical())
                .find(|r| start < r.end() && r.start < end)
            {
                return Err(MapError::Overlap {
                    name: name.to_string(),
                    start,
                    end,
                    existing: existing.name.clone(),
                    existing_start: existing.start,
                    existing_end: existing.end(),
                });
            }
        }

        let id = RegionId(self.regions.len());
        self.regions.push(region);
        self.lookup.push(id.0);
        let regions = &self.regions;
        self.lookup.sort_by(|&a, &b| {
            regions[b]
                .priority
                .cmp(&regions[a].priority)
                .then(b.cmp(&a))
        });
        Ok(id)
    }

    pub fn region(&self, id: RegionId) -> Option<RegionInfo> {
        self.regions.get(id.0).map(|r| RegionInfo {
            id,
            name: r.name.clone(),
            start: r.start,
            len: r.len,
            priority: r.priority,
            kind: r.kind(),
        })
    }

    /// All regions in the order they were mapped.
    pub fn regions(&self) -> impl Iterator<Item = RegionInfo> + '_ {
        (0..self.regions.len()).filter_map(|idx| self.region(RegionId(idx)))
    }

    /// The region that answers an access at `paddr`, if any.
    pub fn resolve(&self, paddr: u64) -> Option<RegionInfo> {
        self.find(paddr).and_then(|idx| self.region(RegionId(idx)))
    }

    fn find(&self, paddr: u64) -> Option<usize> {
        self.lookup
            .iter()
            .copied()
            .find(|&idx| self.regions[idx].contains(paddr))
    }

    /// Decide who answers an access of `size` bytes at `paddr`.
    ///
    /// The access goes to a single region only when that region covers every byte and no region
    /// that outranks it claims any of them; otherwise each byte is resolved on its own.
    fn route(&self, paddr: u64, size: usize) -> Route {
        let end = paddr.saturating_add(size as u64);
        let overlaps = |r: &Region| paddr < r.end() && r.start < end;
        let Some(pos) = self
            .lookup
            .iter()
            .position(|&idx| self.regions[idx].contains(paddr))
        else {
            if size > 1 && self.regions.iter().any(overlaps) {
                return Route::Split;
            }
            return Route::Unmapped;
        };
        let idx = self.lookup[pos];
        let region = &self.regions[idx];
        let offset = paddr - region.start;
        let shadowed = self.lookup[..pos]
            .iter()
            .any(|&other| overlaps(&self.regions[other]));
        if offset + size as u64 <= region.len && !shadowed {
            Route::Whole { idx, offset }
        } else {
            Route::Split
        }
    }

    /// Read `size` bytes (1..=8) at `paddr` as a little-endian value.
    ///
    /// An access owned entirely by one region is delivered to it as a single access of the given
    /// width; an access that crosses into another region is split into byte accesses.
    pub fn read(&self, paddr: u64, size: usize) -> u64 {
        let size = size.clamp(1, 8);
        match self.route(paddr, size) {
            Route::Whole { idx, offset } => self.read_in(idx, offset, size),
            Route::Unmapped => {
                tracing::warn!(paddr = format_args!("0x{paddr:x}"), size, "read from unmapped address");
                0
            }
            Route::Split => {
                let mut out = 0u64;
                for i in 0..size {
                    let Some(addr) = paddr.checked_add(i as u64) else {
                        break;
                    };
                    out |= (self.read(addr, 1) & 0xff) << (i * 8);
                }
                out
            }
        }
    }

    /// Write the low `size` bytes (1..=8) of `value` at `paddr`, little-endian.
    pub fn write(&self, paddr: u64, size: usize, value: u64) {
        let size = size.clamp(1, 8);
        match self.route(paddr, size) {
            Route::Whole { idx, offset } => self.write_in(idx, offset, size, value),
            Route::Unmapped => tracing::warn!(
                paddr = format_args!("0x{paddr:x}"),
                size,
                value = format_args!("0x{value:x}"),
                "write to unmapped address dropped"
            ),
            Route::Split => {
                for i in 0..size {
                    let Some(addr) = paddr.checked_add(i as u64) else {
                        break;
                    };
                    self.write(addr, 1, (value >> (i * 8)) & 0xff);
                }
            }
        }
    }

    fn read_in(&self, idx: usize, offset: u64, size: usize) -> u64 {
        match &self.regions[idx].backing {
            Backing::Ram(block) | Backing::Rom(block) => {
                let mut buf = [0u8; 8];
                if let Err(err) = block.read_bytes(offset, &mut buf[..size]) {
                    // Region length is the block size, so this means the map is corrupt.
                    tracing::error!(region = %self.regions[idx].name, %err, "RAM read failed");
                }
                u64::from_le_bytes(buf)
            }
            Backing::Mmio(handler) => handler.read(offset, size) & width_mask(size),
            Backing::Alias {
                target,
                offset: base,
            } => self.read_in(target.0, base + offset, size),
        }
    }

    fn write_in(&self, idx: usize, offset: u64, size: usize, value: u64) {
        let region = &self.regions[idx];
        match &region.backing {
            Backing::Ram(block) => {
                let bytes = value.to_le_bytes();
                if let Err(err) = block.write_bytes(offset, &bytes[..size]) {
                    tracing::error!(region = %region.name, %err, "RAM write failed");
                }
            }
            Backing::Rom(_) => {
                tracing::trace!(
                    region = %region.name,
                    offset = format_args!("0x{offset:x}"),
                    "write to ROM ignored"
                );
            }
            Backing::Mmio(handler) => handler.write(offset, size, value & width_mask(size)),
            Backing::Alias {
                target,
                offset: base,
            } => self.write_in(target.0, base + offset, size, value),
        }
    }
}

enum Route {
    Whole { idx: usize, offset: u64 },
    Split,
    Unmapped,
}

fn width_mask(size: usize) -> u64 {
    match size {
        0 => 0,
        n if n >= 8 => u64::MAX,
        n => (1u64 << (n * 8)) - 1,
    }
}

impl MemoryBus for AddressSpace {
    fn read_physical(&self, paddr: u64, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = match paddr.checked_add(i as u64) {
                Some(addr) => self.read(addr, 1) as u8,
                None => 0,
            };
        }
    }

    fn write_physical(&self, paddr: u64, buf: &[u8]) {
        for (i, byte) in buf.iter().enumerate() {
            if let Some(addr) = paddr.checked_add(i as u64) {
                self.write(addr, 1, u64::from(*byte));
            }
        }
    }

    fn read_u16(&self, paddr: u64) -> u16 {
        self.read(paddr, 2) as u16
    }

    fn read_u32(&self, paddr: u64) -> u32 {
        self.read(paddr, 4) as u32
    }

    fn read_u64(&self, paddr: u64) -> u64 {
        self.read(paddr, 8)
    }

    fn write_u16(&self, paddr: u64, val: u16) {
        self.write(paddr, 2, u64::from(val));
    }

    fn write_u32(&self, paddr: u64, val: u32) {
        self.write(paddr, 4, u64::from(val));
    }

    fn write_u64(&self, paddr: u64, val: u64) {
        self.write(paddr, 8, val);
    }
}
