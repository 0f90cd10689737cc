use crate::session::{LockMode, SessionId};

/// Unified error type covering all failure modes across the fairdisk lock and store stack.
///
/// Every variant includes an actionable error message guiding the consumer toward resolution.
/// Lock errors are strictly local to the requesting session: a rejected, busy, or interrupted
/// request never mutates shared lock state, so callers can always retry, release, or move on
/// without repair steps. No error is fatal to the manager.
#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    // === Lock protocol errors ===
    /// The requesting session already holds the lock in a conflicting mode.
    #[error(
        "Deadlock: {session} already holds the {held} lock and requested {requested}. Release the held lock before re-acquiring."
    )]
    Deadlock {
        /// The self-conflicting session.
        session: SessionId,
        /// Mode currently held by the session.
        held: LockMode,
        /// Mode the session asked for.
        requested: LockMode,
    },

    /// A non-blocking acquire found the lock unavailable.
    #[error(
        "Lock busy: earlier tickets are queued or the held mode conflicts. Retry later or use blocking acquire()."
    )]
    Busy,

    /// A blocking acquire was cancelled before its ticket was served.
    #[error(
        "Lock wait interrupted before grant. The ticket was abandoned; retrying draws a fresh ticket."
    )]
    Interrupted,

    /// A release was issued by a session that holds nothing.
    #[error("Release without a held lock: {session} holds nothing. Acquire before releasing.")]
    NotHeld {
        /// The session that issued the release.
        session: SessionId,
    },

    // === Store errors ===
    /// A read or write fell outside the store's fixed capacity.
    #[error("I/O out of bounds: offset {offset} + len {len} exceeds capacity {capacity} bytes.")]
    OutOfBounds {
        /// Requested starting byte offset.
        offset: usize,
        /// Requested transfer length in bytes.
        len: usize,
        /// Store capacity in bytes.
        capacity: usize,
    },

    /// Sector-addressed I/O was issued with a partial-sector payload.
    #[error(
        "Sector I/O length {len} is not a whole number of {sector_size}-byte sectors. Pad or split the transfer."
    )]
    MisalignedIo {
        /// Payload length in bytes.
        len: usize,
        /// Sector size of the target disk.
        sector_size: u32,
    },

    // === Registry errors ===
    /// A disk with this name already exists.
    #[error("Disk \"{name}\" already exists. Choose another name or remove the old disk first.")]
    DiskExists {
        /// The contested name.
        name: String,
    },

    /// No disk with this name is registered.
    #[error("Disk \"{name}\" not found. Create it with DiskRegistry::create().")]
    DiskNotFound {
        /// The requested name.
        name: String,
    },

    // === Configuration errors ===
    /// A configuration value is invalid.
    #[error("Invalid config: {field} = \"{value}\" ({reason})")]
    InvalidConfig {
        /// Which config field.
        field: String,
        /// The invalid value.
        value: String,
        /// Why it is invalid.
        reason: String,
    },
}

/// Convenience alias used throughout fairdisk.
pub type DiskResult<T> = Result<T, DiskError>;
