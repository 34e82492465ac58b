//! Keyed pairwise rendezvous.

use super::SpinLock;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

#[derive(Default)]
struct Rendezvous {
    released: Mutex<bool>,
    cv: Condvar,
}

impl Rendezvous {
    fn release(&self) {
        *self.released.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cv.notify_one();
    }

    fn wait(&self) {
        let released = self.released.lock().unwrap_or_else(PoisonError::into_inner);
        drop(
            self.cv
                .wait_while(released, |released| !*released)
                .unwrap_or_else(PoisonError::into_inner),
        );
    }
}

struct LatchEntry<K> {
    key: K,
    /// `None` when the first arrival did not wait.
    waiter: Option<Arc<Rendezvous>>,
}

/// When two threads arrive with the same key they both continue.
///
/// Each key is single use: once the pair has met the entry is gone and the
/// next arrival with that key starts a new pair.
pub struct UniqueLatchEvents<K> {
    entries: SpinLock<Vec<LatchEntry<K>>>,
}

impl<K: PartialEq> UniqueLatchEvents<K> {
    pub fn new() -> Self {
        Self {
            entries: SpinLock::new(Vec::new()),
        }
    }

    /// Blocks until another thread arrives with the same key.
    pub fn arrive_and_wait(&self, key: K) {
        let mut entries = self.entries.lock();
        if let Some(partner) = take_entry(&mut entries, &key) {
            drop(entries);
            if let Some(waiter) = partner.waiter {
                waiter.release();
            }
            return;
        }

        let rendezvous = Arc::new(Rendezvous::default());
        entries.push(LatchEntry {
            key,
            waiter: Some(rendezvous.clone()),
        });
        drop(entries);
        rendezvous.wait();
    }

    /// Arrives without blocking. A waiting partner is released, otherwise
    /// the partner will find the entry and pass straight through.
    pub fn arrive(&self, key: K) {
        let mut entries = self.entries.lock();
        match take_entry(&mut entries, &key) {
            Some(partner) => {
                drop(entries);
                if let Some(waiter) = partner.waiter {
                    waiter.release();
                }
            }
            None => entries.push(LatchEntry { key, waiter: None }),
        }
    }

    /// Keys that have seen one arrival so far.
    pub fn pending(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<K: PartialEq> Default for UniqueLatchEvents<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn take_entry<K: PartialEq>(entries: &mut Vec<LatchEntry<K>>, key: &K) -> Option<LatchEntry<K>> {
    let position = entries.iter().position(|entry| entry.key == *key)?;
    Some(entries.swap_remove(position))
}
