//! Single-pointer publication of immutable values between threads.
//!
//! The producer builds a complete value off to the side and swaps it in; readers
//! clone the current `Arc` and keep reading that version for as long as they hold
//! it. The lock only ever guards the pointer itself, never the value, so a reader
//! sees either the previous complete value or the next one.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct SnapshotCell<T> {
    current: RwLock<Arc<T>>,
    generation: AtomicU64,
}

impl<T> SnapshotCell<T> {
    pub fn new(initial: T) -> Self {
        Self::from_arc(Arc::new(initial))
    }

    pub fn from_arc(initial: Arc<T>) -> Self {
        Self {
            current: RwLock::new(initial),
            generation: AtomicU64::new(0),
        }
    }

    /// The most recently published value.
    #[inline]
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }

    /// Replaces the published value and returns the one it displaced.
    pub fn publish(&self, next: Arc<T>) -> Arc<T> {
        let previous = std::mem::replace(&mut *self.current.write(), next);
        self.generation.fetch_add(1, Ordering::Release);
        previous
    }

    /// Number of publications since construction.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::fmt::Debug for SnapshotCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCell")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn publish_returns_previous_value() {
        let cell = SnapshotCell::new(1);
        let previous = cell.publish(Arc::new(2));
        assert_eq!(*previous, 1);
        assert_eq!(*cell.load(), 2);
        assert_eq!(cell.generation(), 1);
    }

    #[test]
    fn loaded_value_outlives_later_publications() {
        let cell = SnapshotCell::new(vec![1, 2, 3]);
        let held = cell.load();
        cell.publish(Arc::new(vec![4, 5, 6]));
        assert_eq!(*held, vec![1, 2, 3]);
        assert_eq!(*cell.load(), vec![4, 5, 6]);
    }

    #[test]
    fn concurrent_readers_never_observe_a_mixed_value() {
        const ATOMS: usize = 64;
        const TRIALS: usize = 10_000;

        let cell = Arc::new(SnapshotCell::new(vec![0u64; ATOMS]));

        let producer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                for n in 1..=TRIALS as u64 {
                    cell.publish(Arc::new(vec![n; ATOMS]));
                }
            })
        };

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    let mut last_seen = 0;
                    for _ in 0..TRIALS {
                        let positions = cell.load();
                        let first = positions[0];
                        assert!(positions.iter().all(|&p| p == first));
                        assert!(first >= last_seen);
                        last_seen = first;
                    }
                })
            })
            .collect();

        producer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(cell.load()[0], TRIALS as u64);
        assert_eq!(cell.generation(), TRIALS as u64);
    }
}
