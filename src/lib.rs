//! Fair, deadlock-aware reader/writer locking for named in-memory sector stores.
//!
//! fairdisk models a small fleet of ramdisk-style block stores, each guarded
//! by a strict FIFO lock protocol:
//!
//! - **Ticket-ordered admission**: every blocking acquire draws a ticket and
//!   is served strictly in arrival order; no request barges past an earlier
//!   one, whatever its mode ([`LockManager`]).
//! - **Self-deadlock rejection**: a session that already holds the lock in a
//!   conflicting mode is refused up front instead of waiting forever
//!   ([`DiskError::Deadlock`]).
//! - **Abandoned-ticket skipping**: a waiter that is cancelled marks its
//!   ticket dead; the serving counter sweeps past dead tickets so a vanished
//!   session never stalls the queue ([`TicketQueue`]).
//! - **Session handles**: [`DiskHandle`] ties lock ownership to a connection;
//!   dropping the handle cancels pending waits and releases held locks.
//! - **Bounds-checked stores**: [`SectorStore`] is a fixed-capacity, zeroed
//!   byte array addressed by byte offset or whole sectors.
//!
//! The lock manager orders access; it does not wrap store I/O. Sessions that
//! need consistent reads or writes hold the appropriate lock around their
//! I/O calls, exactly like a block-device client.

pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod registry;
pub mod session;
pub mod store;
pub mod ticket;
pub mod tracing_config;

pub use config::{DEFAULT_SECTOR_COUNT, DiskConfig, SECTOR_SIZE};
pub use error::{DiskError, DiskResult};
pub use manager::{LockManager, LockSnapshot};
pub use metrics::{LockMetrics, LockMetricsSnapshot};
pub use registry::{Disk, DiskHandle, DiskRegistry};
pub use session::{LockMode, SessionId, SessionTable};
pub use store::SectorStore;
pub use ticket::TicketQueue;
