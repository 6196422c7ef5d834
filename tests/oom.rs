use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::ptr::null_mut;

use chaintable::{AssocTable, Stats, TableError};

/// Fails allocations on the current thread whose size reaches the threshold.
struct FailingAllocator;

unsafe impl GlobalAlloc for FailingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.size() >= FAIL_THRESHOLD.try_with(Cell::get).unwrap_or(usize::MAX) {
            return null_mut();
        }
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: FailingAllocator = FailingAllocator;

thread_local! {
    static FAIL_THRESHOLD: Cell<usize> = const { Cell::new(usize::MAX) };
}

fn with_failing_allocations<R, F: FnOnce() -> R>(threshold: usize, f: F) -> R {
    FAIL_THRESHOLD.with(|t| t.set(threshold));
    let result = f();
    FAIL_THRESHOLD.with(|t| t.set(usize::MAX));
    result
}

fn filled(num_entries: usize) -> AssocTable<u64> {
    let mut table = AssocTable::new();
    for k in 0..num_entries {
        assert!(table.insert(&format!("k{k:02}"), k as u64).is_ok());
    }
    table
}

fn assert_contents(table: &AssocTable<u64>, num_entries: usize) {
    for k in 0..num_entries {
        assert_eq!(table.get(&format!("k{k:02}")), Some(&(k as u64)));
    }
}

#[test]
fn resize_failure() {
    let mut table = filled(12);
    assert!(table.delete("k03").is_ok());
    assert!(table.insert("k03", 3).is_ok());
    let stats = table.stats();
    assert_eq!(
        stats,
        Stats {
            size: 12,
            capacity: 16,
            load_factor: 0.75,
            tombstones: 1,
        }
    );

    // The key copy fits below the threshold, the new bucket array does not.
    let result = with_failing_allocations(64, || table.insert("k12", 12));
    assert_eq!(result, Err(TableError::MemoryError));
    assert_eq!(table.stats(), stats);
    assert!(table.get("k12").is_none());
    assert_contents(&table, 12);

    assert!(table.insert("k12", 12).is_ok());
    assert_eq!(table.capacity(), 32);
    assert_eq!(table.num_tombstones(), 0);
    assert_contents(&table, 13);
}

#[test]
fn key_copy_failure() {
    let mut table = filled(4);
    let stats = table.stats();
    let long_key = "x".repeat(256);

    let result = with_failing_allocations(128, || table.insert(&long_key, 0));
    assert_eq!(result, Err(TableError::MemoryError));
    assert_eq!(table.stats(), stats);
    assert!(table.get(&long_key).is_none());
    assert_contents(&table, 4);

    assert!(table.insert(&long_key, 0).is_ok());
    assert_eq!(table.len(), 5);
}

#[test]
fn chain_failure() {
    let mut table: AssocTable<u64> = AssocTable::new();

    // Every chain is empty, so the first entry of a chain requires an allocation.
    let result = with_failing_allocations(16, || table.insert("abc", 1));
    assert_eq!(result, Err(TableError::MemoryError));
    assert!(table.is_empty());
    assert!(table.get("abc").is_none());

    assert!(table.insert("abc", 1).is_ok());
    assert_eq!(table.get("abc"), Some(&1));
}

#[test]
fn update_does_not_allocate() {
    let mut table = filled(12);
    let result = with_failing_allocations(1, || table.upsert("k07", 70));
    assert_eq!(result, Ok(Some(7)));
    assert_eq!(table.get("k07"), Some(&70));
    assert_eq!(table.capacity(), 16);
}

#[test]
fn create_failure() {
    let result = with_failing_allocations(64, || AssocTable::<u64>::with_capacity(1024));
    assert_eq!(result.unwrap_err(), TableError::MemoryError);

    let table = AssocTable::<u64>::with_capacity(1024).unwrap();
    assert_eq!(table.capacity(), 1024);
}
