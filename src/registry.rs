//! Named disks and connection handles.
//!
//! A [`Disk`] pairs one [`SectorStore`] with the [`LockManager`] guarding
//! it. The [`DiskRegistry`] owns any number of named disks, created and
//! removed at runtime; removing a disk shuts its lock down so every queued
//! waiter unwinds.
//!
//! Clients talk to a disk through a [`DiskHandle`], which carries a fresh
//! [`SessionId`]. Dropping the handle is a disconnect: pending waits are
//! cancelled and any held lock is released, so a session that goes away
//! mid-protocol can never strand the lock.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::DiskConfig;
use crate::error::{DiskError, DiskResult};
use crate::manager::LockManager;
use crate::session::{LockMode, SessionId};
use crate::store::SectorStore;

// ---------------------------------------------------------------------------
// Disk
// ---------------------------------------------------------------------------

/// One named in-memory disk: a sector store plus the lock guarding it.
#[derive(Debug)]
pub struct Disk {
    name: String,
    config: DiskConfig,
    store: SectorStore,
    lock: LockManager,
}

impl Disk {
    /// Build a standalone disk.
    ///
    /// # Errors
    ///
    /// Returns [`DiskError::InvalidConfig`] when `name` is empty or the
    /// geometry is invalid.
    pub fn new(name: &str, config: DiskConfig) -> DiskResult<Self> {
        if name.is_empty() {
            return Err(DiskError::InvalidConfig {
                field: "name".to_owned(),
                value: String::new(),
                reason: "disk name must not be empty".to_owned(),
            });
        }
        let store = SectorStore::new(&config)?;
        Ok(Self {
            name: name.to_owned(),
            config,
            store,
            lock: LockManager::new(),
        })
    }

    /// Disk name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Geometry this disk was created with.
    #[must_use]
    pub const fn config(&self) -> &DiskConfig {
        &self.config
    }

    /// The byte store.
    #[must_use]
    pub const fn store(&self) -> &SectorStore {
        &self.store
    }

    /// The lock guarding this disk.
    #[must_use]
    pub const fn lock_manager(&self) -> &LockManager {
        &self.lock
    }

    /// Open a new session against this disk.
    #[must_use]
    pub fn connect(self: &Arc<Self>) -> DiskHandle {
        let session = SessionId::mint();
        debug!(
            target: "fairdisk.registry",
            disk = %self.name,
            %session,
            "session connected"
        );
        DiskHandle {
            disk: Arc::clone(self),
            session,
        }
    }
}

// ---------------------------------------------------------------------------
// DiskHandle
// ---------------------------------------------------------------------------

/// One client session bound to one disk.
///
/// The handle forwards lock and I/O calls under its own [`SessionId`].
/// Dropping it disconnects the session: pending waits are cancelled and any
/// held lock is released. Handles are deliberately not cloneable; one handle
/// is one session.
#[derive(Debug)]
pub struct DiskHandle {
    disk: Arc<Disk>,
    session: SessionId,
}

impl DiskHandle {
    /// This handle's session identity.
    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Name of the disk this handle is connected to.
    #[must_use]
    pub fn disk_name(&self) -> &str {
        self.disk.name()
    }

    /// Blocking acquire under this session. See [`LockManager::acquire`].
    ///
    /// # Errors
    ///
    /// Propagates [`DiskError::Deadlock`] and [`DiskError::Interrupted`].
    pub fn acquire(&self, mode: LockMode) -> DiskResult<()> {
        self.disk.lock.acquire(self.session, mode)
    }

    /// Non-blocking acquire. See [`LockManager::try_acquire`].
    ///
    /// # Errors
    ///
    /// Propagates [`DiskError::Deadlock`] and [`DiskError::Busy`].
    pub fn try_acquire(&self, mode: LockMode) -> DiskResult<()> {
        self.disk.lock.try_acquire(self.session, mode)
    }

    /// Release this session's lock.
    ///
    /// # Errors
    ///
    /// Propagates [`DiskError::NotHeld`].
    pub fn release(&self) -> DiskResult<()> {
        self.disk.lock.release(self.session)
    }

    /// Cancel this session's suspended acquires from another thread.
    pub fn cancel(&self) -> bool {
        self.disk.lock.cancel(self.session)
    }

    /// Mode this session currently holds, if any.
    #[must_use]
    pub fn held_mode(&self) -> Option<LockMode> {
        self.disk.lock.held_mode(self.session)
    }

    /// Whether this session holds the lock in any mode.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.held_mode().is_some()
    }

    /// Read bytes at `offset`. See [`SectorStore::read_at`].
    ///
    /// # Errors
    ///
    /// Propagates [`DiskError::OutOfBounds`].
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> DiskResult<()> {
        self.disk.store.read_at(offset, buf)
    }

    /// Write bytes at `offset`. See [`SectorStore::write_at`].
    ///
    /// # Errors
    ///
    /// Propagates [`DiskError::OutOfBounds`].
    pub fn write_at(&self, offset: usize, bytes: &[u8]) -> DiskResult<()> {
        self.disk.store.write_at(offset, bytes)
    }

    /// Read whole sectors. See [`SectorStore::read_sectors`].
    ///
    /// # Errors
    ///
    /// Propagates [`DiskError::OutOfBounds`].
    pub fn read_sectors(&self, first_sector: u32, count: u32) -> DiskResult<Vec<u8>> {
        self.disk.store.read_sectors(first_sector, count)
    }

    /// Write whole sectors. See [`SectorStore::write_sectors`].
    ///
    /// # Errors
    ///
    /// Propagates [`DiskError::OutOfBounds`] and [`DiskError::MisalignedIo`].
    pub fn write_sectors(&self, first_sector: u32, bytes: &[u8]) -> DiskResult<()> {
        self.disk.store.write_sectors(first_sector, bytes)
    }
}

impl Drop for DiskHandle {
    fn drop(&mut self) {
        self.disk.lock.on_disconnect(self.session);
    }
}

// ---------------------------------------------------------------------------
// DiskRegistry
// ---------------------------------------------------------------------------

/// Runtime collection of named disks.
#[derive(Debug, Default)]
pub struct DiskRegistry {
    disks: Mutex<HashMap<String, Arc<Disk>>>,
}

impl DiskRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a disk.
    ///
    /// # Errors
    ///
    /// - [`DiskError::DiskExists`] when the name is taken.
    /// - [`DiskError::InvalidConfig`] when the name or geometry is invalid.
    ///
    /// # Panics
    ///
    /// Panics if the registry mutex is poisoned.
    pub fn create(&self, name: &str, config: DiskConfig) -> DiskResult<Arc<Disk>> {
        let mut disks = self.disks.lock().expect("registry lock poisoned");
        match disks.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(DiskError::DiskExists {
                name: name.to_owned(),
            }),
            Entry::Vacant(slot) => {
                let disk = Arc::new(Disk::new(name, config)?);
                info!(
                    target: "fairdisk.registry",
                    name,
                    sector_count = disk.config.sector_count,
                    sector_size = disk.config.sector_size,
                    "disk created"
                );
                slot.insert(Arc::clone(&disk));
                Ok(disk)
            }
        }
    }

    /// Look up a disk by name.
    ///
    /// # Errors
    ///
    /// Returns [`DiskError::DiskNotFound`] when no such disk exists.
    ///
    /// # Panics
    ///
    /// Panics if the registry mutex is poisoned.
    pub fn get(&self, name: &str) -> DiskResult<Arc<Disk>> {
        self.disks
            .lock()
            .expect("registry lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| DiskError::DiskNotFound {
                name: name.to_owned(),
            })
    }

    /// Remove a disk and shut its lock down.
    ///
    /// Queued waiters unwind as interrupted and new lock requests fail, but
    /// sessions still holding the disk's `Arc` can release and finish store
    /// I/O while they unwind.
    ///
    /// # Errors
    ///
    /// Returns [`DiskError::DiskNotFound`] when no such disk exists.
    ///
    /// # Panics
    ///
    /// Panics if the registry mutex is poisoned.
    pub fn remove(&self, name: &str) -> DiskResult<()> {
        let removed = self
            .disks
            .lock()
            .expect("registry lock poisoned")
            .remove(name);

        match removed {
            Some(disk) => {
                // Outside the registry mutex: shutdown takes the disk's own.
                disk.lock.shutdown();
                info!(target: "fairdisk.registry", name, "disk removed");
                Ok(())
            }
            None => Err(DiskError::DiskNotFound {
                name: name.to_owned(),
            }),
        }
    }

    /// Registered disk names, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the registry mutex is poisoned.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .disks
            .lock()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of registered disks.
    ///
    /// # Panics
    ///
    /// Panics if the registry mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.disks.lock().expect("registry lock poisoned").len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
