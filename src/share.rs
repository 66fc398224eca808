//! Cross-task communication.
//!
//! Every task runs on one cooperative executor and no two steps overlap, so
//! both primitives sit on `NoopRawMutex`: there is no locking, only the
//! single-executor invariant. Neither type is `Sync`.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::{Channel, TrySendError};

/// Single-slot register, latest value wins.
///
/// `put` overwrites unconditionally and `get` returns the most recent write.
/// There is no backpressure and no notion of "unread": a reader that polls
/// slower than the writer simply misses intermediate values.
pub struct Share<T: Copy> {
    slot: Mutex<NoopRawMutex, Cell<T>>,
}

impl<T: Copy> Share<T> {
    pub const fn new(initial: T) -> Self {
        Self {
            slot: Mutex::new(Cell::new(initial)),
        }
    }

    pub fn put(&self, value: T) {
        self.slot.lock(|cell| cell.set(value));
    }

    pub fn get(&self) -> T {
        self.slot.lock(|cell| cell.get())
    }
}

/// Fixed-capacity FIFO. Both ends are non-blocking; a producer facing a full
/// queue or a consumer facing an empty one retries on a later tick.
pub struct Queue<T, const N: usize> {
    chan: Channel<NoopRawMutex, T, N>,
}

impl<T, const N: usize> Queue<T, N> {
    pub const fn new() -> Self {
        Self { chan: Channel::new() }
    }

    /// Hands the item back when the queue is full.
    pub fn try_put(&self, item: T) -> Result<(), T> {
        self.chan.try_send(item).map_err(|TrySendError::Full(item)| item)
    }

    pub fn try_get(&self) -> Option<T> {
        self.chan.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.chan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chan.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.chan.is_full()
    }

    pub fn clear(&self) {
        self.chan.clear();
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for Queue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_latest_write_wins() {
        let share = Share::new(0i32);
        assert_eq!(share.get(), 0);
        share.put(5);
        share.put(-3);
        assert_eq!(share.get(), -3);
        // Reads do not consume.
        assert_eq!(share.get(), -3);
    }

    #[test]
    fn queue_is_fifo() {
        let q: Queue<u16, 4> = Queue::new();
        for v in [1, 2, 3] {
            q.try_put(v).unwrap();
        }
        assert_eq!(q.len(), 3);
        assert_eq!(q.try_get(), Some(1));
        assert_eq!(q.try_get(), Some(2));
        assert_eq!(q.try_get(), Some(3));
        assert_eq!(q.try_get(), None);
    }

    #[test]
    fn full_queue_returns_the_item() {
        let q: Queue<u8, 2> = Queue::new();
        q.try_put(10).unwrap();
        q.try_put(11).unwrap();
        assert!(q.is_full());
        assert_eq!(q.try_put(12), Err(12));

        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.capacity(), 2);
    }
}
