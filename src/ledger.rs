//! Pester Budget Ledger
//!
//! Per-user counters gating unprompted outbound contact. Every handle starts
//! with one pester; mentions earn more, unprompted replies spend them.
//!
//! The ledger never forgets a handle and never clamps a counter, so a
//! budget can go negative after a run of unprompted replies.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Budget given to a handle on first reference
pub const INITIAL_PESTERS: i64 = 1;

/// What we know about one peer user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub handle: String,
    /// How many times we can pester this user unprompted
    pub pesters_left: i64,
}

impl UserRecord {
    fn new(handle: &str) -> Self {
        Self {
            handle: handle.to_string(),
            pesters_left: INITIAL_PESTERS,
        }
    }
}

/// Shared ledger of user records.
///
/// A single lock guards the map; each operation is one read-modify-write
/// under that lock, so concurrent updates to the same handle are never lost.
#[derive(Debug, Default)]
pub struct PesterLedger {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl PesterLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the record for `handle`, creating it if unknown
    pub fn record_for(&self, handle: &str) -> UserRecord {
        self.update(handle, |_| {})
    }

    /// Earn one pester for `handle`
    pub fn increment(&self, handle: &str) -> i64 {
        let record = self.update(handle, |r| r.pesters_left += 1);
        debug!("@{} pesters_left -> {}", handle, record.pesters_left);
        record.pesters_left
    }

    /// Spend one pester for `handle`
    pub fn decrement(&self, handle: &str) -> i64 {
        let record = self.update(handle, |r| r.pesters_left -= 1);
        debug!("@{} pesters_left -> {}", handle, record.pesters_left);
        record.pesters_left
    }

    /// Whether we may contact `handle` unprompted
    pub fn can_pester(&self, handle: &str) -> bool {
        self.record_for(handle).pesters_left > 0
    }

    /// Number of handles referenced so far
    pub fn len(&self) -> usize {
        self.users.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.lock().is_empty()
    }

    fn update(&self, handle: &str, f: impl FnOnce(&mut UserRecord)) -> UserRecord {
        let mut users = self.users.lock();
        let record = users
            .entry(handle.to_string())
            .or_insert_with(|| UserRecord::new(handle));
        f(record);
        record.clone()
    }
}
