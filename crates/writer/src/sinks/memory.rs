//! MemorySink - in-memory sink with fault injection
//!
//! Used by pipeline tests to observe what was persisted and to simulate
//! store failures on chosen writes.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{Ack, PersistenceFault, Reading, ReadingSink};

#[derive(Debug, Default)]
struct StoreState {
    rows: Vec<Reading>,
    attempts: u64,
    closed: bool,
}

/// Shared view of a [`MemorySink`]'s contents
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Persisted readings in insert order
    pub fn rows(&self) -> Vec<Reading> {
        self.lock().rows.clone()
    }

    /// Insert calls seen, failed ones included
    pub fn attempts(&self) -> u64 {
        self.lock().attempts
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// In-memory sink
#[derive(Debug, Default)]
pub struct MemorySink {
    store: MemoryStore,
    fail_attempts: HashSet<u64>,
    fail_next: u32,
    rejects: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given insert attempts (1-based, counting every call)
    pub fn failing_attempts(mut self, attempts: impl IntoIterator<Item = u64>) -> Self {
        self.fail_attempts.extend(attempts);
        self
    }

    /// Fail the next `n` insert calls
    pub fn failing_next(mut self, n: u32) -> Self {
        self.fail_next = n;
        self
    }

    /// Report injected failures as rejections instead of outages
    pub fn rejecting(mut self) -> Self {
        self.rejects = true;
        self
    }

    /// Handle for inspecting the store after the sink is moved
    pub fn store(&self) -> MemoryStore {
        self.store.clone()
    }

    fn injected_fault(&self, attempt: u64) -> PersistenceFault {
        let message = format!("injected failure on attempt {attempt}");
        if self.rejects {
            PersistenceFault::rejected("memory", message)
        } else {
            PersistenceFault::unavailable("memory", message)
        }
    }
}

impl ReadingSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&mut self, reading: &Reading) -> Result<Ack, PersistenceFault> {
        let attempt = {
            let mut state = self.store.lock();
            if state.closed {
                return Err(PersistenceFault::unavailable("memory", "sink closed"));
            }
            state.attempts += 1;
            state.attempts
        };

        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(self.injected_fault(attempt));
        }
        if self.fail_attempts.contains(&attempt) {
            return Err(self.injected_fault(attempt));
        }

        let mut state = self.store.lock();
        state.rows.push(reading.clone());
        Ok(Ack::stored(state.rows.len() as i64))
    }

    async fn close(&mut self) -> Result<(), PersistenceFault> {
        self.store.lock().closed = true;
        Ok(())
    }
}
