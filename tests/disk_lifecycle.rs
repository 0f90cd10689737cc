//! Disk, handle, and registry lifecycle tests for fairdisk.
//!
//! These tests drive the full stack the way a client would: create named
//! disks, connect sessions, hold locks around store I/O, and tear things
//! down mid-protocol. The focus is on:
//!
//! 1. A locked write/read round trip through two sessions
//! 2. Handle drop as disconnect: held locks released, pending waits freed
//! 3. Registry removal interrupting queued waiters while holders unwind
//! 4. Independence of disks: one disk's lock and bytes never leak into
//!    another's
//! 5. Cancelling a blocked handle from another thread

use std::thread;
use std::time::{Duration, Instant};

use fairdisk::{DiskConfig, DiskError, DiskRegistry, LockMode};

// ═══════════════════════════════════════════════════════════════════════════
// Test helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Poll until `predicate` holds, panicking after a generous timeout.
fn wait_until(what: &str, predicate: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !predicate() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

fn small_geometry() -> DiskConfig {
    DiskConfig {
        sector_count: 8,
        sector_size: 64,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 1. Locked I/O round trip
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn writer_then_reader_roundtrip_through_sessions() {
    let registry = DiskRegistry::new();
    let disk = registry.create("journal", small_geometry()).unwrap();

    let writer = disk.connect();
    writer.acquire(LockMode::Write).unwrap();
    let payload: Vec<u8> = (0..128).collect();
    writer.write_sectors(2, &payload).unwrap();
    writer.release().unwrap();
    drop(writer);

    let reader = disk.connect();
    reader.acquire(LockMode::Read).unwrap();
    assert_eq!(reader.read_sectors(2, 2).unwrap(), payload);

    // Sectors outside the written range stay zeroed.
    assert!(reader.read_sectors(0, 2).unwrap().iter().all(|&b| b == 0));
    assert!(reader.read_sectors(4, 4).unwrap().iter().all(|&b| b == 0));
    reader.release().unwrap();
}

#[test]
fn store_rejects_out_of_range_io_regardless_of_lock() {
    let registry = DiskRegistry::new();
    let disk = registry.create("bounds", small_geometry()).unwrap();
    let handle = disk.connect();

    // 8 sectors of 64 bytes: capacity 512.
    let mut buf = [0u8; 16];
    assert!(matches!(
        handle.read_at(500, &mut buf).unwrap_err(),
        DiskError::OutOfBounds { capacity: 512, .. }
    ));
    assert!(matches!(
        handle.write_sectors(8, &[0u8; 64]).unwrap_err(),
        DiskError::OutOfBounds { .. }
    ));
    assert!(matches!(
        handle.write_sectors(0, &[0u8; 40]).unwrap_err(),
        DiskError::MisalignedIo { sector_size: 64, .. }
    ));
}

// ═══════════════════════════════════════════════════════════════════════════
// 2. Handle drop as disconnect
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn dropping_a_writer_handle_admits_the_next_waiter() {
    let registry = DiskRegistry::new();
    let disk = registry.create("scratch", small_geometry()).unwrap();

    let holder = disk.connect();
    holder.acquire(LockMode::Write).unwrap();

    let waiter = disk.connect();
    let waiter_session = waiter.session();
    let waiter_thread = thread::spawn(move || {
        waiter.acquire(LockMode::Read).unwrap();
        assert_eq!(waiter.held_mode(), Some(LockMode::Read));
        waiter.release().unwrap();
    });
    wait_until("waiter to queue", || {
        disk.lock_manager().snapshot().waiting == 1
    });

    // The holder's thread vanishes without releasing; drop must stand in.
    drop(holder);
    waiter_thread.join().unwrap();
    assert_eq!(disk.lock_manager().held_mode(waiter_session), None);

    let m = disk.lock_manager().metrics().snapshot();
    assert_eq!(m.disconnect_releases, 1);
    assert_eq!(m.releases, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// 3. Registry removal mid-protocol
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn removing_a_disk_interrupts_queued_waiters() {
    let registry = DiskRegistry::new();
    let disk = registry.create("doomed", small_geometry()).unwrap();

    let holder = disk.connect();
    holder.acquire(LockMode::Write).unwrap();

    let waiter = disk.connect();
    let waiter_thread = thread::spawn(move || waiter.acquire(LockMode::Read));
    wait_until("waiter to queue", || {
        disk.lock_manager().snapshot().waiting == 1
    });

    registry.remove("doomed").unwrap();
    assert!(matches!(
        waiter_thread.join().unwrap().unwrap_err(),
        DiskError::Interrupted
    ));

    // The holder can still finish its I/O and unwind cleanly.
    holder.write_at(0, b"final").unwrap();
    holder.release().unwrap();
    assert!(matches!(
        holder.acquire(LockMode::Write).unwrap_err(),
        DiskError::Interrupted
    ));
    assert!(matches!(
        registry.get("doomed").unwrap_err(),
        DiskError::DiskNotFound { .. }
    ));
}

// ═══════════════════════════════════════════════════════════════════════════
// 4. Disk independence
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn disks_have_independent_locks_and_bytes() {
    let registry = DiskRegistry::new();
    let left = registry.create("left", small_geometry()).unwrap();
    let right = registry.create("right", small_geometry()).unwrap();
    assert_eq!(registry.names(), vec!["left", "right"]);

    let left_handle = left.connect();
    left_handle.acquire(LockMode::Write).unwrap();
    left_handle.write_at(0, b"left only").unwrap();

    // The write hold on "left" does not queue or block anything on "right".
    let right_handle = right.connect();
    right_handle.try_acquire(LockMode::Write).unwrap();

    let mut buf = [0u8; 9];
    right_handle.read_at(0, &mut buf).unwrap();
    assert_eq!(&buf, &[0u8; 9], "bytes never cross disks");

    left_handle.release().unwrap();
    right_handle.release().unwrap();
}

#[test]
fn same_name_after_removal_is_a_fresh_disk() {
    let registry = DiskRegistry::new();
    let first = registry.create("reborn", small_geometry()).unwrap();
    let handle = first.connect();
    handle.acquire(LockMode::Write).unwrap();
    handle.write_at(0, b"old life").unwrap();
    handle.release().unwrap();
    drop(handle);

    registry.remove("reborn").unwrap();
    let second = registry.create("reborn", small_geometry()).unwrap();
    assert!(!second.lock_manager().is_shutdown());

    let handle = second.connect();
    let mut buf = [0u8; 8];
    handle.read_at(0, &mut buf).unwrap();
    assert_eq!(&buf, &[0u8; 8], "fresh disk starts zeroed");
}

// ═══════════════════════════════════════════════════════════════════════════
// 5. Cancelling a blocked handle
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn cancel_frees_a_blocked_session_without_touching_the_holder() {
    let registry = DiskRegistry::new();
    let disk = registry.create("busy", small_geometry()).unwrap();

    let holder = disk.connect();
    holder.acquire(LockMode::Write).unwrap();

    let blocked = disk.connect();
    let blocked_session = blocked.session();
    let blocked_thread = thread::spawn(move || {
        let result = blocked.acquire(LockMode::Write);
        // The handle drops here; disconnect after an interrupted wait must
        // not disturb anyone else's hold.
        result
    });
    wait_until("waiter to queue", || {
        disk.lock_manager().snapshot().waiting == 1
    });

    assert!(disk.lock_manager().cancel(blocked_session));
    assert!(matches!(
        blocked_thread.join().unwrap().unwrap_err(),
        DiskError::Interrupted
    ));

    let snap = disk.lock_manager().snapshot();
    assert_eq!(snap.write_holder, Some(holder.session()));
    assert_eq!(snap.waiting, 0);
    assert_eq!(snap.dead, 0);
    holder.release().unwrap();
}
