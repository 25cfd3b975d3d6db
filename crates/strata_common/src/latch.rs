//! One-shot completion latches for task signalling.

use std::sync::{Condvar, Mutex};

/// A one-shot completion signal.
///
/// A latch starts open work: it can be closed exactly once and awaited any
/// number of times. `wait` blocks until the latch is closed and returns
/// immediately on every call after that. Used by the scheduler for both the
/// "build finished" and "output reported" signals of a task.
pub struct Latch {
    closed: Mutex<bool>,
    condvar: Condvar,
}

impl Latch {
    /// Creates a new, unclosed latch.
    pub fn new() -> Self {
        Self {
            closed: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Closes the latch, waking all current and future waiters.
    ///
    /// Must be called at most once; the owning worker is the only closer.
    pub fn close(&self) {
        let mut closed = self.closed.lock().unwrap();
        debug_assert!(!*closed, "latch closed twice");
        *closed = true;
        self.condvar.notify_all();
    }

    /// Blocks until the latch has been closed.
    pub fn wait(&self) {
        let mut closed = self.closed.lock().unwrap();
        while !*closed {
            closed = self.condvar.wait(closed).unwrap();
        }
    }

    /// Returns `true` if the latch has been closed, without blocking.
    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_open() {
        let latch = Latch::new();
        assert!(!latch.is_closed());
    }

    #[test]
    fn wait_returns_after_close() {
        let latch = Latch::new();
        latch.close();
        latch.wait();
        assert!(latch.is_closed());
    }

    #[test]
    fn wait_returns_repeatedly() {
        let latch = Latch::new();
        latch.close();
        latch.wait();
        latch.wait();
        latch.wait();
    }

    #[test]
    fn unblocks_concurrent_waiters() {
        let latch = Arc::new(Latch::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let latch = Arc::clone(&latch);
            handles.push(thread::spawn(move || {
                latch.wait();
                assert!(latch.is_closed());
            }));
        }

        thread::sleep(Duration::from_millis(10));
        latch.close();

        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn waiter_blocks_until_closed() {
        let latch = Arc::new(Latch::new());
        let waiter = {
            let latch = Arc::clone(&latch);
            thread::spawn(move || {
                latch.wait();
                true
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        latch.close();
        assert!(waiter.join().unwrap());
    }
}
