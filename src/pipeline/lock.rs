use std::collections::HashSet;

use parking_lot::{Condvar, Mutex};

/// Set of keys currently being verified. A second caller for the same key
/// blocks until the first guard is dropped.
#[derive(Default)]
pub(crate) struct KeyedLocks {
    in_flight: Mutex<HashSet<String>>,
    released: Condvar,
}

impl KeyedLocks {
    pub(crate) fn acquire(&self, key: &str) -> KeyGuard<'_> {
        let mut in_flight = self.in_flight.lock();
        while in_flight.contains(key) {
            self.released.wait(&mut in_flight);
        }
        in_flight.insert(key.to_string());
        KeyGuard {
            locks: self,
            key: key.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_held(&self, key: &str) -> bool {
        self.in_flight.lock().contains(key)
    }
}

pub(crate) struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.locks.in_flight.lock().remove(&self.key);
        self.locks.released.notify_all();
    }
}
