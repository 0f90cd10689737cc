use serde::{Deserialize, Serialize};

use crate::error::{DiskError, DiskResult};

/// Default sector size in bytes.
pub const SECTOR_SIZE: u32 = 512;

/// Default number of sectors per disk.
pub const DEFAULT_SECTOR_COUNT: u32 = 32;

const MIN_SECTOR_SIZE: u32 = 16;
const MAX_SECTOR_SIZE: u32 = 64 * 1024;
const MAX_CAPACITY_BYTES: u64 = 1 << 30;

/// Geometry for one in-memory disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskConfig {
    /// Number of sectors. Default: 32.
    pub sector_count: u32,
    /// Bytes per sector. Default: [`SECTOR_SIZE`] (512). Must be a power of two.
    pub sector_size: u32,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            sector_count: DEFAULT_SECTOR_COUNT,
            sector_size: SECTOR_SIZE,
        }
    }
}

impl DiskConfig {
    /// Total capacity in bytes.
    #[must_use]
    pub const fn capacity_bytes(&self) -> u64 {
        self.sector_count as u64 * self.sector_size as u64
    }

    /// Load geometry from environment variables; fall back to defaults.
    ///
    /// Recognized variables: `FAIRDISK_SECTOR_COUNT`, `FAIRDISK_SECTOR_SIZE`.
    /// Unparsable values are ignored. The result is not validated; call
    /// [`validate`](Self::validate) before use.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(val) = std::env::var("FAIRDISK_SECTOR_COUNT")
            && let Ok(parsed) = val.parse::<u32>()
        {
            cfg.sector_count = parsed;
        }

        if let Ok(val) = std::env::var("FAIRDISK_SECTOR_SIZE")
            && let Ok(parsed) = val.parse::<u32>()
        {
            cfg.sector_size = parsed;
        }

        cfg
    }

    /// Validate user-provided geometry.
    ///
    /// # Errors
    ///
    /// Returns [`DiskError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> DiskResult<()> {
        if self.sector_count == 0 {
            return Err(DiskError::InvalidConfig {
                field: "sector_count".to_owned(),
                value: "0".to_owned(),
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.sector_size < MIN_SECTOR_SIZE
            || self.sector_size > MAX_SECTOR_SIZE
            || !self.sector_size.is_power_of_two()
        {
            return Err(DiskError::InvalidConfig {
                field: "sector_size".to_owned(),
                value: self.sector_size.to_string(),
                reason: format!("must be a power of two in [{MIN_SECTOR_SIZE}, {MAX_SECTOR_SIZE}]"),
            });
        }
        if self.capacity_bytes() > MAX_CAPACITY_BYTES {
            return Err(DiskError::InvalidConfig {
                field: "sector_count".to_owned(),
                value: self.sector_count.to_string(),
                reason: format!(
                    "total capacity {} exceeds the {MAX_CAPACITY_BYTES}-byte in-memory ceiling",
                    self.capacity_bytes()
                ),
            });
        }

        Ok(())
    }
}
