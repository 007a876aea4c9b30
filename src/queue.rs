use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// FIFO hand-off between two pipeline stages.
///
/// `push` never blocks. `pop` blocks until an element arrives or the queue
/// is aborted. `abort` is the shutdown signal: it wakes every waiter, drops
/// anything still queued and turns later pushes into no-ops, so a consumer
/// uses `pop() == None` as its exit condition.
pub struct MediaQueue<T> {
    inner: Mutex<Inner<T>>,
    cond: Condvar,
}

struct Inner<T> {
    items: VecDeque<T>,
    aborted: bool,
}

impl<T> MediaQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                aborted: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Move `item` in. Discarded silently once the queue is aborted.
    pub fn push(&self, item: T) {
        let mut q = self.inner.lock().unwrap();
        if q.aborted {
            return;
        }
        q.items.push_back(item);
        self.cond.notify_one();
    }

    /// Blocking take. Returns `None` iff the queue has been aborted.
    pub fn pop(&self) -> Option<T> {
        let mut q = self.inner.lock().unwrap();
        loop {
            if q.aborted {
                return None;
            }
            if let Some(item) = q.items.pop_front() {
                return Some(item);
            }
            q = self.cond.wait(q).unwrap();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Idempotent. Wakes all waiters and releases queued elements.
    pub fn abort(&self) {
        let mut q = self.inner.lock().unwrap();
        q.aborted = true;
        q.items.clear();
        self.cond.notify_all();
    }
}

impl<T> Default for MediaQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
