use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::LoanId;

/// registry of per-loan mutexes
///
/// the registry lock is only held while a loan's mutex is looked up or
/// released, so work on different loans never waits on each other. an entry
/// lives only while some caller holds or waits on it.
#[derive(Debug, Default)]
pub struct LoanLocks {
    registry: Mutex<HashMap<LoanId, Arc<Mutex<()>>>>,
}

impl LoanLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// run `f` while holding the mutex serialising all balance changes of one loan
    pub fn with_lock<T>(&self, loan_id: LoanId, f: impl FnOnce() -> T) -> T {
        let handle = {
            // the map is only changed under this lock, a panic elsewhere cannot leave it torn
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(registry.entry(loan_id).or_default())
        };
        let _entry = Entry {
            locks: self,
            loan_id,
            handle: &handle,
        };

        let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    pub fn len(&self) -> usize {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// drops the registry entry once the last caller for a loan is done, on
/// unwind as well
struct Entry<'a> {
    locks: &'a LoanLocks,
    loan_id: LoanId,
    handle: &'a Arc<Mutex<()>>,
}

impl Drop for Entry<'_> {
    fn drop(&mut self) {
        let mut registry = self.locks.registry.lock().unwrap_or_else(PoisonError::into_inner);
        // one reference in the map, one here: no other caller holds or waits on it
        if Arc::strong_count(self.handle) == 2 {
            registry.remove(&self.loan_id);
        }
    }
}
