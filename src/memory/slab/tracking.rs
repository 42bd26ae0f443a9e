/*!
 * Leak Tracking
 * Live-allocation registry with nested snapshots
 */

use crate::core::types::{Address, Size};
use crate::memory::types::AllocationRecord;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::panic::Location;
use tracing::warn;

/// Registry of every allocation that has not been returned yet
pub(crate) struct LeakTracker {
    live: DashMap<Address, AllocationRecord, RandomState>,
    /// Stack of saved live-address sets
    snapshots: Mutex<Vec<HashSet<Address, RandomState>>>,
}

impl LeakTracker {
    pub fn new() -> Self {
        Self {
            live: DashMap::with_hasher(RandomState::new()),
            snapshots: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, address: Address, size: Size, location: &'static Location<'static>) {
        self.live.insert(
            address,
            AllocationRecord {
                address,
                size,
                location: format!("{}:{}", location.file(), location.line()),
            },
        );
    }

    /// Remove the record for `address`, handing it back
    pub fn forget(&self, address: Address) -> Option<AllocationRecord> {
        self.live.remove(&address).map(|(_, record)| record)
    }

    /// Put back a record taken by [`forget`](Self::forget)
    pub fn restore(&self, record: AllocationRecord) {
        self.live.insert(record.address, record);
    }

    /// Live allocations ordered by address
    pub fn live(&self) -> Vec<AllocationRecord> {
        let mut records: Vec<_> = self.live.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by_key(|record| record.address);
        records
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn push_snapshot(&self) {
        let addresses = self.live.iter().map(|entry| *entry.key()).collect();
        self.snapshots.lock().push(addresses);
    }

    /// Drop the most recent snapshot; `false` when none was saved
    pub fn pop_snapshot(&self) -> bool {
        self.snapshots.lock().pop().is_some()
    }

    /// Allocations made since the most recent snapshot and still live
    ///
    /// Without a saved snapshot every live allocation is reported.
    pub fn diff_since_snapshot(&self) -> Vec<AllocationRecord> {
        let snapshots = self.snapshots.lock();
        match snapshots.last() {
            Some(saved) => {
                let mut records: Vec<_> = self
                    .live
                    .iter()
                    .filter(|entry| !saved.contains(entry.key()))
                    .map(|entry| entry.value().clone())
                    .collect();
                records.sort_by_key(|record| record.address);
                records
            }
            None => {
                drop(snapshots);
                self.live()
            }
        }
    }

    /// Log each record and return how many there were
    pub fn report(records: &[AllocationRecord]) -> usize {
        for record in records {
            warn!(
                address = record.address,
                size = record.size,
                location = %record.location,
                "{}",
                record
            );
        }
        records.len()
    }
}
