use std::sync::{PoisonError, RwLock};

use thiserror::Error;

/// Default allocation granule for [`RamBlock`] backing storage (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Errors returned by [`RamBlock`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RamError {
    /// The requested range is outside the block.
    #[error("RAM access out of range: offset=0x{offset:x} len={len} size=0x{size:x}")]
    OutOfRange { offset: u64, len: usize, size: u64 },
    /// The block size cannot be represented by the current platform's `usize`.
    #[error("RAM block size {size} does not fit in usize")]
    TooLarge { size: u64 },
    /// The chunk size is zero or not a power of two.
    #[error("invalid RAM chunk size {chunk_size}")]
    InvalidChunkSize { chunk_size: usize },
}

/// A fixed-size block of guest RAM or ROM contents.
///
/// Storage is allocated lazily in `chunk_size` granules on first write; chunks that were never
/// written read as zero. This keeps a 1 GiB SDRAM mapping cheap for machines that only ever touch
/// a few pages of it during early boot.
///
/// Readers and writers may run on different host threads; the chunk table sits behind an
/// [`RwLock`].
pub struct RamBlock {
    size: u64,
    chunk_size: usize,
    chunks: RwLock<Vec<Option<Box<[u8]>>>>,
}

impl std::fmt::Debug for RamBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RamBlock")
            .field("size", &self.size)
            .field("chunk_size", &self.chunk_size)
            .field("allocated_chunks", &self.allocated_chunks())
            .finish()
    }
}

impl RamBlock {
    pub fn new(size: u64) -> Result<Self, RamError> {
        Self::with_chunk_size(size, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(size: u64, chunk_size: usize) -> Result<Self, RamError> {
        if chunk_size == 0 || !chunk_size.is_power_of_two() {
            return Err(RamError::InvalidChunkSize { chunk_size });
        }
        let size_usize = usize::try_from(size).map_err(|_| RamError::TooLarge { size })?;
        let chunk_count = size_usize.div_ceil(chunk_size);
        let mut chunks = Vec::new();
        chunks.resize_with(chunk_count, || None);
        Ok(Self {
            size,
            chunk_size,
            chunks: RwLock::new(chunks),
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks that currently own host memory.
    pub fn allocated_chunks(&self) -> usize {
        let chunks = self.chunks.read().unwrap_or_else(PoisonError::into_inner);
        chunks.iter().filter(|c| c.is_some()).count()
    }

    fn check_range(&self, offset: u64, len: usize) -> Result<(), RamError> {
        let end = offset.checked_add(len as u64).ok_or(RamError::OutOfRange {
            offset,
            len,
            size: self.size,
        })?;
        if end > self.size {
            return Err(RamError::OutOfRange {
                offset,
                len,
                size: self.size,
            });
        }
        Ok(())
    }

    pub fn read_bytes(&self, offset: u64, dst: &mut [u8]) -> Result<(), RamError> {
        self.check_range(offset, dst.len())?;
        let chunks = self.chunks.read().unwrap_or_else(PoisonError::into_inner);

        let mut pos = 0usize;
        while pos < dst.len() {
            // In range: `offset + dst.len() <= size` and `size` fits in usize.
            let addr = offset as usize + pos;
            let chunk_idx = addr / self.chunk_size;
            let in_chunk = addr % self.chunk_size;
            let len = (self.chunk_size - in_chunk).min(dst.len() - pos);
            match &chunks[chunk_idx] {
                Some(chunk) => dst[pos..pos + len].copy_from_slice(&chunk[in_chunk..in_chunk + len]),
                None => dst[pos..pos + len].fill(0),
            }
            pos += len;
        }
        Ok(())
    }

    pub fn write_bytes(&self, offset: u64, src: &[u8]) -> Result<(), RamError> {
        self.check_range(offset, src.len())?;
        let mut chunks = self.chunks.write().unwrap_or_else(PoisonError::into_inner);

        let mut pos = 0usize;
        while pos < src.len() {
            let addr = offset as usize + pos;
            let chunk_idx = addr / self.chunk_size;
            let in_chunk = addr % self.chunk_size;
            let len = (self.chunk_size - in_chunk).min(src.len() - pos);
            let chunk_size = self.chunk_size;
            let chunk = chunks[chunk_idx].get_or_insert_with(|| vec![0u8; chunk_size].into_boxed_slice());
            chunk[in_chunk..in_chunk + len].copy_from_slice(&src[pos..pos + len]);
            pos += len;
        }
        Ok(())
    }

    /// Drop every allocated chunk, returning the block to its all-zero power-on contents.
    pub fn clear(&self) {
        let mut chunks = self.chunks.write().unwrap_or_else(PoisonError::into_inner);
        for chunk in chunks.iter_mut() {
            *chunk = None;
        }
    }
}
