//! Session identity and the lock-holder table.
//!
//! A [`SessionId`] names one client connection to a disk. The
//! [`SessionTable`] is the holder half of the lock state: at most one
//! writer, or any number of readers, never both. It also answers the
//! conservative self-deadlock question a request must pass before a ticket
//! is drawn.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// Session identity
// ---------------------------------------------------------------------------

/// Opaque identity of one client session.
///
/// Ids are minted from a process-global counter and never reused within a
/// process lifetime, so a stale handle cannot impersonate a newer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Mint a fresh, process-unique session id.
    #[must_use]
    pub fn mint() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for logging and diagnostics.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Lock mode
// ---------------------------------------------------------------------------

/// Requested or held lock mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared lock: excludes the writer, admits other readers.
    Read,
    /// Exclusive lock: excludes everyone else.
    Write,
}

impl LockMode {
    /// Stable lowercase name for logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Holder table
// ---------------------------------------------------------------------------

/// Which sessions currently hold the lock, and how.
///
/// Owned by the lock manager and only ever touched under its mutex. A
/// session's held mode is derived from these two fields alone, so holder
/// accounting cannot drift out of sync with itself.
#[derive(Debug, Default)]
pub struct SessionTable {
    write_holder: Option<SessionId>,
    readers: HashSet<SessionId>,
}

impl SessionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode held by `session`, if any.
    #[must_use]
    pub fn mode_of(&self, session: SessionId) -> Option<LockMode> {
        if self.write_holder == Some(session) {
            Some(LockMode::Write)
        } else if self.readers.contains(&session) {
            Some(LockMode::Read)
        } else {
            None
        }
    }

    /// Would granting `requested` to `session` deadlock the session on itself?
    ///
    /// Returns the held mode when the request must be rejected:
    /// - holding `Write`, requesting anything;
    /// - holding `Read`, requesting `Write`.
    ///
    /// Holding `Read` and requesting `Read` again is allowed; the reader set
    /// makes the duplicate grant idempotent. The check is deliberately local:
    /// with a single resource and two modes, only a self-conflict can wedge a
    /// session forever.
    #[must_use]
    pub fn self_conflict(&self, session: SessionId, requested: LockMode) -> Option<LockMode> {
        match self.mode_of(session) {
            Some(LockMode::Write) => Some(LockMode::Write),
            Some(LockMode::Read) if requested == LockMode::Write => Some(LockMode::Read),
            _ => None,
        }
    }

    /// Record a grant. The caller has already established compatibility.
    pub fn grant(&mut self, session: SessionId, mode: LockMode) {
        match mode {
            LockMode::Read => {
                self.readers.insert(session);
            }
            LockMode::Write => {
                self.write_holder = Some(session);
            }
        }
    }

    /// Drop whatever `session` holds, returning the mode it held.
    pub fn release(&mut self, session: SessionId) -> Option<LockMode> {
        if self.write_holder == Some(session) {
            self.write_holder = None;
            Some(LockMode::Write)
        } else if self.readers.remove(&session) {
            Some(LockMode::Read)
        } else {
            None
        }
    }

    /// Session holding the write lock, if any.
    #[must_use]
    pub const fn write_holder(&self) -> Option<SessionId> {
        self.write_holder
    }

    /// Number of sessions holding read locks.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Reader sessions, ascending by id. For diagnostics.
    #[must_use]
    pub fn reader_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.readers.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// True when nobody holds the lock in any mode.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.write_holder.is_none() && self.readers.is_empty()
    }
}
