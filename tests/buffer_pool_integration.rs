//! Integration tests for the buffer pool manager.
//!
//! These tests verify cross-component behavior that unit tests don't cover.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use walpool::buffer::{BufferManager, BufferPoolManager};
use walpool::common::{BlockId, Error, NO_LSN};
use walpool::storage::page::ZeroFormatter;
use walpool::storage::{DiskFileManager, FileManager};

fn create_bpm(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let fm = Arc::new(DiskFileManager::open(dir.path()).unwrap());
    (BufferPoolManager::new(pool_size, fm), dir)
}

/// Test data persistence across multiple eviction cycles.
#[test]
fn test_data_persistence_across_evictions() {
    let (bpm, _dir) = create_bpm(2);

    // Create 5 blocks with unique data (forces evictions)
    let mut blocks = vec![];
    for i in 0..5 {
        let guard = bpm.fetch_new("data.tbl", &ZeroFormatter).unwrap();
        guard.set_int(0, i, 1, NO_LSN).unwrap();
        guard.set_int(4, i * 3, 1, NO_LSN).unwrap();
        blocks.push(guard.block().unwrap());
    }

    // Read all back - verifies evicted blocks were flushed
    for (i, block) in blocks.iter().enumerate() {
        let guard = bpm.fetch(block).unwrap();
        assert_eq!(guard.get_int(0).unwrap(), i as i32);
        assert_eq!(guard.get_int(4).unwrap(), i as i32 * 3);
    }
}

/// Test flush and reload across pool instances.
#[test]
fn test_flush_and_reload() {
    let dir = tempdir().unwrap();
    let block;

    // First session: create and write
    {
        let fm = Arc::new(DiskFileManager::open(dir.path()).unwrap());
        let bpm = BufferPoolManager::new(10, fm);

        let guard = bpm.fetch_new("data.tbl", &ZeroFormatter).unwrap();
        block = guard.block().unwrap();
        guard.set_string(0, "persistent!", 42, NO_LSN).unwrap();
        drop(guard);

        bpm.flush_all(42).unwrap();
    }

    // Second session: verify data
    {
        let fm = Arc::new(DiskFileManager::open(dir.path()).unwrap());
        assert_eq!(fm.size("data.tbl").unwrap(), 1);
        let bpm = BufferPoolManager::new(10, fm);

        let guard = bpm.fetch(&block).unwrap();
        assert_eq!(guard.get_string(0).unwrap(), "persistent!");
    }
}

/// Committing one transaction leaves another's changes in memory only.
#[test]
fn test_flush_all_is_transaction_scoped() {
    let dir = tempdir().unwrap();
    let fm = Arc::new(DiskFileManager::open(dir.path()).unwrap());
    let b0 = fm.append("data.tbl").unwrap();
    let b1 = fm.append("data.tbl").unwrap();
    let bpm = BufferPoolManager::new(4, fm.clone());

    {
        let g0 = bpm.fetch(&b0).unwrap();
        let g1 = bpm.fetch(&b1).unwrap();
        g0.set_int(0, 100, 1, NO_LSN).unwrap();
        g1.set_int(0, 200, 2, NO_LSN).unwrap();
    }

    bpm.flush_all(1).unwrap();

    let fresh = DiskFileManager::open(dir.path()).unwrap();
    let mut page = walpool::Page::new();
    fresh.read(&b0, &mut page).unwrap();
    assert_eq!(page.get_int(0).unwrap(), 100);
    fresh.read(&b1, &mut page).unwrap();
    assert_eq!(page.get_int(0).unwrap(), 0);
}

/// Test concurrent writers to different blocks.
#[test]
fn test_concurrent_writers() {
    let (bpm, _dir) = create_bpm(10);
    let bpm = Arc::new(bpm);

    let blocks: Vec<BlockId> = (0..5)
        .map(|_| bpm.fetch_new("data.tbl", &ZeroFormatter).unwrap().block().unwrap())
        .collect();

    let mut handles = vec![];

    for (i, block) in blocks.iter().enumerate() {
        let bpm_clone = Arc::clone(&bpm);
        let block = block.clone();

        handles.push(thread::spawn(move || {
            for j in 0..50 {
                let guard = bpm_clone.fetch(&block).unwrap();
                guard.set_int(0, (i * 50 + j) as i32, i as i64, NO_LSN).unwrap();
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    // Verify each block has last written value
    for (i, block) in blocks.iter().enumerate() {
        let guard = bpm.fetch(block).unwrap();
        assert_eq!(guard.get_int(0).unwrap(), (i * 50 + 49) as i32);
    }
    assert_eq!(bpm.available(), 10);
}

/// Many threads cycling through more blocks than frames.
#[test]
fn test_concurrent_readers_with_eviction() {
    let (bpm, _dir) = create_bpm(4);
    let bpm = Arc::new(bpm);

    let blocks: Vec<BlockId> = (0..8)
        .map(|i| {
            let guard = bpm.fetch_new("data.tbl", &ZeroFormatter).unwrap();
            guard.set_int(0, i, 0, NO_LSN).unwrap();
            guard.block().unwrap()
        })
        .collect();
    let blocks = Arc::new(blocks);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let bpm = Arc::clone(&bpm);
            let blocks = Arc::clone(&blocks);
            thread::spawn(move || {
                for round in 0..100 {
                    let n = (t * 3 + round) % blocks.len();
                    loop {
                        match bpm.fetch(&blocks[n]) {
                            Ok(guard) => {
                                assert_eq!(guard.get_int(0).unwrap(), n as i32);
                                break;
                            }
                            Err(Error::PoolExhausted) => thread::yield_now(),
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(bpm.available(), 4);
}

/// Test stats accuracy under load.
#[test]
fn test_stats_accuracy() {
    let (bpm, _dir) = create_bpm(2);

    let block = bpm.fetch_new("data.tbl", &ZeroFormatter).unwrap().block().unwrap();

    // Multiple fetches = cache hits
    for _ in 0..5 {
        let _ = bpm.fetch(&block).unwrap();
    }

    let stats = bpm.stats().snapshot();
    assert_eq!(stats.cache_hits, 5);

    // Force eviction
    let _ = bpm.fetch_new("data.tbl", &ZeroFormatter).unwrap();
    let _ = bpm.fetch_new("data.tbl", &ZeroFormatter).unwrap();

    let stats = bpm.stats().snapshot();
    assert!(stats.evictions >= 1);
    assert!(stats.hit_rate() > 0.0);
}

/// The waiting manager hands a frame over once another thread lets go.
#[test]
fn test_buffer_manager_waits_for_release() {
    let (bpm, _dir) = create_bpm(1);
    let bm = Arc::new(BufferManager::new(Arc::new(bpm), Duration::from_secs(5)));

    let first = bm.pin_new("data.tbl", &ZeroFormatter).unwrap();
    let first_block = first.block().unwrap();

    let waiter = {
        let bm = Arc::clone(&bm);
        thread::spawn(move || {
            let buffer = bm.pin_new("data.tbl", &ZeroFormatter)?;
            let block = buffer.block();
            bm.unpin(&buffer);
            Ok::<_, Error>(block)
        })
    };

    thread::sleep(Duration::from_millis(50));
    bm.unpin(&first);

    let second_block = waiter.join().unwrap().unwrap().unwrap();
    assert_ne!(second_block, first_block);
    assert_eq!(bm.available(), 1);
}

/// Without a release the waiting manager aborts.
#[test]
fn test_buffer_manager_aborts() {
    let (bpm, _dir) = create_bpm(1);
    let bm = BufferManager::new(Arc::new(bpm), Duration::from_millis(30));

    let _held = bm.pin_new("data.tbl", &ZeroFormatter).unwrap();
    let err = bm.pin_new("data.tbl", &ZeroFormatter).unwrap_err();

    assert!(matches!(err, Error::BufferAbort { .. }));
    assert!(err.is_recoverable());
    // The failed request appended nothing
    assert_eq!(bm.pool().file_manager().size("data.tbl").unwrap(), 1);
}

/// Dropping a pool guard wakes a waiter on the same pool well before its
/// timeout.
#[test]
fn test_guard_drop_wakes_buffer_manager() {
    let (bpm, _dir) = create_bpm(1);
    let pool = Arc::new(bpm);
    let bm = Arc::new(BufferManager::new(Arc::clone(&pool), Duration::from_secs(3)));

    let guard = pool.fetch_new("data.tbl", &ZeroFormatter).unwrap();

    let waiter = {
        let bm = Arc::clone(&bm);
        thread::spawn(move || {
            let start = Instant::now();
            let buffer = bm.pin_new("data.tbl", &ZeroFormatter)?;
            bm.unpin(&buffer);
            Ok::<_, Error>(start.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(50));
    drop(guard);

    let waited = waiter.join().unwrap().unwrap();
    assert!(waited < Duration::from_secs(1), "waited {:?}", waited);
    assert_eq!(pool.available(), 1);
}
