//! In-memory sector store.
//!
//! [`SectorStore`] is the byte payload a disk's lock protocol guards: a
//! fixed-capacity, zero-initialised array addressed by byte offset or by
//! whole sectors. Bounds are checked per request and the store never grows.
//!
//! The store deliberately does not take the lock manager's monitor. Whether
//! a caller holds a read or write lock while touching bytes is session-layer
//! policy; callers that need consistency hold the appropriate lock around
//! their I/O.

use std::sync::RwLock;

use tracing::trace;

use crate::config::DiskConfig;
use crate::error::{DiskError, DiskResult};

/// Fixed-capacity, zero-initialised byte store with sector addressing.
///
/// Byte access goes through an internal [`RwLock`] so concurrent readers do
/// not serialise on each other. This lock orders individual memory copies
/// only; request-level consistency comes from the lock manager.
#[derive(Debug)]
pub struct SectorStore {
    data: RwLock<Vec<u8>>,
    sector_size: u32,
    sector_count: u32,
    capacity: usize,
}

impl SectorStore {
    /// Allocate a zeroed store with the given geometry.
    ///
    /// # Errors
    ///
    /// Returns [`DiskError::InvalidConfig`] when the geometry fails
    /// [`DiskConfig::validate`] or the capacity does not fit in `usize`.
    pub fn new(config: &DiskConfig) -> DiskResult<Self> {
        config.validate()?;
        let capacity =
            usize::try_from(config.capacity_bytes()).map_err(|_| DiskError::InvalidConfig {
                field: "sector_count".to_owned(),
                value: config.sector_count.to_string(),
                reason: "total capacity does not fit in usize on this platform".to_owned(),
            })?;
        Ok(Self {
            data: RwLock::new(vec![0u8; capacity]),
            sector_size: config.sector_size,
            sector_count: config.sector_count,
            capacity,
        })
    }

    /// Capacity in bytes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes per sector.
    #[must_use]
    pub const fn sector_size(&self) -> u32 {
        self.sector_size
    }

    /// Number of sectors.
    #[must_use]
    pub const fn sector_count(&self) -> u32 {
        self.sector_count
    }

    /// Read `buf.len()` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`DiskError::OutOfBounds`] when the range exceeds capacity.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> DiskResult<()> {
        let end = self.checked_range(offset, buf.len())?;
        let data = self.data.read().expect("store lock poisoned");
        buf.copy_from_slice(&data[offset..end]);
        Ok(())
    }

    /// Write `bytes` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`DiskError::OutOfBounds`] when the range exceeds capacity.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn write_at(&self, offset: usize, bytes: &[u8]) -> DiskResult<()> {
        let end = self.checked_range(offset, bytes.len())?;
        let mut data = self.data.write().expect("store lock poisoned");
        data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Read `count` whole sectors starting at `first_sector`.
    ///
    /// # Errors
    ///
    /// Returns [`DiskError::OutOfBounds`] when the sector range exceeds the
    /// disk.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn read_sectors(&self, first_sector: u32, count: u32) -> DiskResult<Vec<u8>> {
        let (offset, len) = self.sector_range(first_sector, count)?;
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Write whole sectors starting at `first_sector`.
    ///
    /// # Errors
    ///
    /// - [`DiskError::MisalignedIo`] when `bytes` is not a whole number of
    ///   sectors.
    /// - [`DiskError::OutOfBounds`] when the sector range exceeds the disk.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn write_sectors(&self, first_sector: u32, bytes: &[u8]) -> DiskResult<()> {
        let sector_size = self.sector_size as usize;
        if bytes.is_empty() || bytes.len() % sector_size != 0 {
            trace!(
                target: "fairdisk.store",
                len = bytes.len(),
                sector_size = self.sector_size,
                "misaligned sector write rejected"
            );
            return Err(DiskError::MisalignedIo {
                len: bytes.len(),
                sector_size: self.sector_size,
            });
        }
        #[allow(clippy::cast_possible_truncation)]
        let count = (bytes.len() / sector_size) as u32;
        let (offset, _) = self.sector_range(first_sector, count)?;
        self.write_at(offset, bytes)
    }

    /// Validate a byte range against capacity, returning its end offset.
    fn checked_range(&self, offset: usize, len: usize) -> DiskResult<usize> {
        let oob = DiskError::OutOfBounds {
            offset,
            len,
            capacity: self.capacity,
        };
        match offset.checked_add(len) {
            Some(end) if end <= self.capacity => Ok(end),
            _ => {
                trace!(
                    target: "fairdisk.store",
                    offset,
                    len,
                    capacity = self.capacity,
                    "out-of-bounds access rejected"
                );
                Err(oob)
            }
        }
    }

    /// Translate a sector range into a checked byte range.
    fn sector_range(&self, first_sector: u32, count: u32) -> DiskResult<(usize, usize)> {
        let sector_size = self.sector_size as usize;
        let offset = first_sector as usize * sector_size;
        let len = count as usize * sector_size;
        let end_sector = u64::from(first_sector) + u64::from(count);
        if end_sector > u64::from(self.sector_count) {
            trace!(
                target: "fairdisk.store",
                first_sector,
                count,
                sector_count = self.sector_count,
                "out-of-bounds sector access rejected"
            );
            return Err(DiskError::OutOfBounds {
                offset,
                len,
                capacity: self.capacity,
            });
        }
        Ok((offset, len))
    }
}
