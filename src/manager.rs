//! The fair lock monitor.
//!
//! [`LockManager`] coordinates read/write access to one disk. Admission is
//! strictly ticket-ordered: every blocking acquire draws a ticket, suspends
//! until the serving counter reaches that ticket AND the requested mode is
//! compatible with current holders, then consumes the ticket. There is no
//! barging: a read that is compatible with the current holders still waits
//! behind an earlier queued writer.
//!
//! # Waiter lifecycle
//!
//! A suspended acquire ends one of two ways. Either its ticket is served and
//! the lock granted, or the wait is cancelled ([`LockManager::cancel`],
//! [`LockManager::shutdown`], or the disconnect hook) and the waiter marks
//! its ticket dead before returning [`DiskError::Interrupted`]. Dead tickets
//! are swept as the serving counter passes them, so an abandoned wait never
//! stalls the sessions queued behind it.
//!
//! # Thread model
//!
//! One [`std::sync::Mutex`] guards all lock state; a [`std::sync::Condvar`]
//! parks waiters. [`Condvar::wait`] releases the mutex while suspended and
//! reacquires it on wake, and every waiter re-checks its own predicate after
//! waking, so wakes are broadcast and spurious wakeups are harmless. The
//! monitor broadcasts on every ticket retirement (grant, cancellation,
//! release, shutdown); predicates are ticket-exact, so a broadcast can only
//! change when a waiter wakes, never which session wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};

use tracing::{debug, trace, warn};

use crate::error::{DiskError, DiskResult};
use crate::metrics::LockMetrics;
use crate::session::{LockMode, SessionId, SessionTable};
use crate::ticket::TicketQueue;

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

/// Bookkeeping for one suspended acquire.
#[derive(Debug, Clone, Copy)]
struct Waiter {
    session: SessionId,
    mode: LockMode,
    cancelled: bool,
}

/// Mutable lock state behind the manager's mutex.
#[derive(Debug, Default)]
struct LockState {
    holders: SessionTable,
    tickets: TicketQueue,
    /// Suspended acquires keyed by ticket.
    waiters: HashMap<u32, Waiter>,
    /// Set at teardown; waiters unwind as interrupted.
    shutdown: bool,
}

impl LockState {
    /// Mode compatibility against current holders. Ignores queue order;
    /// ticket eligibility is checked separately.
    fn compatible(&self, mode: LockMode) -> bool {
        match mode {
            LockMode::Read => self.holders.write_holder().is_none(),
            LockMode::Write => self.holders.is_idle(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of one lock's state, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSnapshot {
    /// Session holding the write lock, if any.
    pub write_holder: Option<SessionId>,
    /// Sessions holding read locks, ascending by id.
    pub readers: Vec<SessionId>,
    /// Next ticket to issue.
    pub ticket_head: u32,
    /// Ticket currently eligible for service.
    pub ticket_tail: u32,
    /// Tickets outstanding: live waiters plus unswept dead tickets.
    pub outstanding: u32,
    /// Suspended acquires.
    pub waiting: usize,
    /// Abandoned tickets not yet swept.
    pub dead: usize,
    /// Whether shutdown was requested.
    pub shutdown: bool,
}

// ---------------------------------------------------------------------------
// LockManager
// ---------------------------------------------------------------------------

/// Fair, deadlock-aware reader/writer lock for one disk.
///
/// See the [module-level documentation](self) for the admission protocol.
///
/// # Usage
///
/// ```
/// use fairdisk::{LockManager, LockMode, SessionId};
///
/// let lock = LockManager::new();
/// let session = SessionId::mint();
///
/// lock.acquire(session, LockMode::Write)?;
/// // ... exclusive access ...
/// lock.release(session)?;
/// # Ok::<(), fairdisk::DiskError>(())
/// ```
pub struct LockManager {
    state: Mutex<LockState>,
    notify: Condvar,
    metrics: Arc<LockMetrics>,
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snap = self.snapshot();
        f.debug_struct("LockManager")
            .field("write_holder", &snap.write_holder)
            .field("readers", &snap.readers.len())
            .field("waiting", &snap.waiting)
            .finish_non_exhaustive()
    }
}

impl LockManager {
    /// Create an idle lock manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            notify: Condvar::new(),
            metrics: Arc::new(LockMetrics::new()),
        }
    }

    // ── Acquire ──────────────────────────────────────────────────────

    /// Blocking acquire.
    ///
    /// Draws an admission ticket and suspends until the ticket is served and
    /// `mode` is compatible with current holders. Strict FIFO among live
    /// tickets: a compatible request still waits behind every earlier one.
    ///
    /// Re-acquiring `Read` while already holding `Read` is permitted; the
    /// grant is idempotent and a single release clears the hold.
    ///
    /// # Errors
    ///
    /// - [`DiskError::Deadlock`] when `session` already holds the lock in a
    ///   conflicting mode. No ticket is drawn; the hold is untouched.
    /// - [`DiskError::Interrupted`] when the wait is cancelled or the
    ///   manager shuts down. The abandoned ticket is marked dead and
    ///   skipped; holder state is untouched. A cancel that races a would-be
    ///   grant wins: the caller sees `Interrupted`, never a lock it has to
    ///   give back.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn acquire(&self, session: SessionId, mode: LockMode) -> DiskResult<()> {
        let mut state = self.state.lock().expect("lock state poisoned");

        if state.shutdown {
            self.metrics.record_interrupted();
            return Err(DiskError::Interrupted);
        }

        if let Some(held) = state.holders.self_conflict(session, mode) {
            self.metrics.record_deadlock();
            warn!(
                target: "fairdisk.lock",
                %session,
                held = held.name(),
                requested = mode.name(),
                "self-deadlock rejected"
            );
            return Err(DiskError::Deadlock {
                session,
                held,
                requested: mode,
            });
        }

        let ticket = state.tickets.next_ticket();
        state.waiters.insert(
            ticket,
            Waiter {
                session,
                mode,
                cancelled: false,
            },
        );
        trace!(
            target: "fairdisk.lock",
            %session,
            ticket,
            mode = mode.name(),
            "ticket drawn"
        );

        loop {
            state.tickets.advance_tail();

            let cancelled = state.waiters.get(&ticket).is_none_or(|w| w.cancelled);
            if cancelled {
                state.waiters.remove(&ticket);
                state.tickets.mark_dead(ticket);
                // Sweep immediately in case this ticket was next in line;
                // later waiters sweep the rest as they re-check.
                state.tickets.advance_tail();
                self.metrics.record_dead_ticket();
                self.metrics.record_interrupted();
                debug!(
                    target: "fairdisk.lock",
                    %session,
                    ticket,
                    "wait interrupted; ticket abandoned"
                );
                drop(state);
                self.broadcast();
                return Err(DiskError::Interrupted);
            }

            if state.tickets.tail() == ticket && state.compatible(mode) {
                state.holders.grant(session, mode);
                state.waiters.remove(&ticket);
                state.tickets.retire_serving();
                self.metrics.record_grant(mode);
                debug!(
                    target: "fairdisk.lock",
                    %session,
                    ticket,
                    mode = mode.name(),
                    "lock granted"
                );
                drop(state);
                self.broadcast();
                return Ok(());
            }

            state = self.notify.wait(state).expect("lock state poisoned");
        }
    }

    /// Non-blocking acquire.
    ///
    /// Grants only when no live ticket is queued AND `mode` is compatible
    /// with current holders; never draws a ticket, never suspends. The
    /// queue-empty requirement is stricter than compatibility alone and is
    /// what keeps the non-blocking path from barging past queued waiters.
    /// Dead tickets are swept first, so a queue of abandoned waits does not
    /// count against the caller.
    ///
    /// # Errors
    ///
    /// - [`DiskError::Deadlock`] when `session` already holds the lock in a
    ///   conflicting mode.
    /// - [`DiskError::Busy`] when the lock is unavailable right now, or the
    ///   manager has shut down.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn try_acquire(&self, session: SessionId, mode: LockMode) -> DiskResult<()> {
        let mut state = self.state.lock().expect("lock state poisoned");

        if state.shutdown {
            self.metrics.record_busy();
            return Err(DiskError::Busy);
        }

        if let Some(held) = state.holders.self_conflict(session, mode) {
            self.metrics.record_deadlock();
            warn!(
                target: "fairdisk.lock",
                %session,
                held = held.name(),
                requested = mode.name(),
                "self-deadlock rejected"
            );
            return Err(DiskError::Deadlock {
                session,
                held,
                requested: mode,
            });
        }

        state.tickets.advance_tail();

        if state.tickets.is_empty() && state.compatible(mode) {
            state.holders.grant(session, mode);
            self.metrics.record_grant(mode);
            debug!(
                target: "fairdisk.lock",
                %session,
                mode = mode.name(),
                "lock granted without ticket"
            );
            return Ok(());
        }

        self.metrics.record_busy();
        trace!(
            target: "fairdisk.lock",
            %session,
            mode = mode.name(),
            queued = state.tickets.outstanding(),
            "busy"
        );
        Err(DiskError::Busy)
    }

    // ── Release ──────────────────────────────────────────────────────

    /// Release whatever lock `session` holds.
    ///
    /// Holder state is keyed by session identity, so one session can never
    /// drop a lock belonging to another. Every waiter is woken to re-check
    /// its own predicate; tickets are unique, so at most one wait predicate
    /// becomes true per release.
    ///
    /// # Errors
    ///
    /// Returns [`DiskError::NotHeld`] when the session holds nothing. That
    /// is a caller bug and is surfaced rather than swallowed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn release(&self, session: SessionId) -> DiskResult<()> {
        let released = {
            let mut state = self.state.lock().expect("lock state poisoned");
            state.holders.release(session)
        };

        match released {
            Some(mode) => {
                self.metrics.record_release();
                debug!(
                    target: "fairdisk.lock",
                    %session,
                    mode = mode.name(),
                    "lock released"
                );
                self.broadcast();
                Ok(())
            }
            None => {
                self.metrics.record_not_held();
                warn!(target: "fairdisk.lock", %session, "release without a held lock");
                Err(DiskError::NotHeld { session })
            }
        }
    }

    // ── Cancellation ─────────────────────────────────────────────────

    /// Cancel every suspended acquire belonging to `session`.
    ///
    /// Affected waits return [`DiskError::Interrupted`] promptly and abandon
    /// their tickets; holder state is untouched, so a lock the session
    /// already holds stays held. Returns `true` when at least one waiter was
    /// flagged.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn cancel(&self, session: SessionId) -> bool {
        let flagged = {
            let mut state = self.state.lock().expect("lock state poisoned");
            let mut flagged = false;
            for waiter in state.waiters.values_mut() {
                if waiter.session == session && !waiter.cancelled {
                    waiter.cancelled = true;
                    flagged = true;
                }
            }
            flagged
        };

        if flagged {
            debug!(target: "fairdisk.lock", %session, "cancel requested");
            self.broadcast();
        }
        flagged
    }

    /// Connection-close hook: cancel pending waits, then drop any held lock.
    ///
    /// Idempotent. Calling it for a session that already released, or never
    /// held anything, is a no-op; a second call after the first is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn on_disconnect(&self, session: SessionId) {
        self.cancel(session);

        let released = {
            let mut state = self.state.lock().expect("lock state poisoned");
            state.holders.release(session)
        };

        if let Some(mode) = released {
            self.metrics.record_disconnect_release();
            debug!(
                target: "fairdisk.lock",
                %session,
                mode = mode.name(),
                "lock released on disconnect"
            );
            self.broadcast();
        }
    }

    // ── Shutdown ─────────────────────────────────────────────────────

    /// Shut the lock down.
    ///
    /// Every suspended waiter unwinds with [`DiskError::Interrupted`].
    /// Subsequent blocking acquires fail the same way; non-blocking acquires
    /// report [`DiskError::Busy`]. Releases keep working so current holders
    /// can unwind. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock().expect("lock state poisoned");
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            for waiter in state.waiters.values_mut() {
                waiter.cancelled = true;
            }
            debug!(
                target: "fairdisk.lock",
                waiting = state.waiters.len(),
                "shutdown requested"
            );
        }
        self.broadcast();
    }

    /// Whether shutdown has been requested.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().expect("lock state poisoned").shutdown
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Current lock held by `session`, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn held_mode(&self, session: SessionId) -> Option<LockMode> {
        self.state
            .lock()
            .expect("lock state poisoned")
            .holders
            .mode_of(session)
    }

    /// Capture a consistent snapshot of the lock state.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> LockSnapshot {
        let state = self.state.lock().expect("lock state poisoned");
        LockSnapshot {
            write_holder: state.holders.write_holder(),
            readers: state.holders.reader_ids(),
            ticket_head: state.tickets.head(),
            ticket_tail: state.tickets.tail(),
            outstanding: state.tickets.outstanding(),
            waiting: state.waiters.len(),
            dead: state.tickets.dead_len(),
            shutdown: state.shutdown,
        }
    }

    /// Shared reference to the telemetry counters.
    #[must_use]
    pub const fn metrics(&self) -> &Arc<LockMetrics> {
        &self.metrics
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Wake every waiter to re-check its predicate.
    fn broadcast(&self) {
        self.metrics.record_broadcast();
        self.notify.notify_all();
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
