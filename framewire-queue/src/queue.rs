//! Bounded FIFO queue of `(frame_number, frame)` items.

use crate::error::QueueError;
use crate::halt::HaltHandle;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time;

/// Default capacity used across the codebase unless a caller overrides it.
pub const DEFAULT_CAPACITY: usize = 30;

/// A bounded, halt-aware FIFO of `(frame_number, item)` pairs.
///
/// Multiple producers and consumers may hold clones (it is cheap to wrap in
/// an `Arc`, as every caller in this codebase does) and operate concurrently.
pub struct FrameQueue<T> {
    capacity: usize,
    inner: Mutex<VecDeque<(u32, T)>>,
    not_empty: Notify,
    not_full: Notify,
    halt: HaltHandle,
}

impl<T> FrameQueue<T> {
    pub fn new(capacity: usize, halt: HaltHandle) -> Self {
        Self {
            capacity,
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Notify::new(),
            not_full: Notify::new(),
            halt,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Pushes an item, waiting up to `timeout` if the queue is full.
    pub async fn put(&self, item: (u32, T), timeout: Duration) -> Result<(), QueueError> {
        let deadline = time::Instant::now() + timeout;
        let mut item = Some(item);
        loop {
            if self.halt.is_halted() {
                return Err(QueueError::Halted);
            }
            {
                let mut guard = self.inner.lock().await;
                if guard.len() < self.capacity {
                    guard.push_back(item.take().expect("item consumed exactly once"));
                    drop(guard);
                    self.not_empty.notify_waiters();
                    return Ok(());
                }
            }
            let remaining = match deadline.checked_duration_since(time::Instant::now()) {
                Some(d) if !d.is_zero() => d,
                _ => return Err(QueueError::Full),
            };
            tokio::select! {
                _ = self.halt.wait() => return Err(QueueError::Halted),
                _ = time::timeout(remaining, self.not_full.notified()) => {}
            }
        }
    }

    /// Pushes an item without blocking; if the queue is full, the oldest
    /// item is dropped to make room (prefer the freshest frame).
    pub async fn put_nonblocking_drop_oldest(&self, item: (u32, T)) {
        let mut guard = self.inner.lock().await;
        if guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(item);
        drop(guard);
        self.not_empty.notify_waiters();
    }

    /// Returns a clone of the oldest item without removing it, or `None` if
    /// the queue is currently empty. Used by consumers that need to inspect
    /// an item's shape (e.g. for UI sizing) without taking it off the FIFO.
    pub async fn peek_front(&self) -> Option<(u32, T)>
    where
        T: Clone,
    {
        self.inner.lock().await.front().cloned()
    }

    /// Pops the oldest item, waiting up to `timeout` if the queue is empty.
    pub async fn get(&self, timeout: Duration) -> Result<(u32, T), QueueError> {
        let deadline = time::Instant::now() + timeout;
        loop {
            if self.halt.is_halted() {
                return Err(QueueError::Halted);
            }
            {
                let mut guard = self.inner.lock().await;
                if let Some(item) = guard.pop_front() {
                    drop(guard);
                    self.not_full.notify_waiters();
                    return Ok(item);
                }
            }
            let remaining = match deadline.checked_duration_since(time::Instant::now()) {
                Some(d) if !d.is_zero() => d,
                _ => return Err(QueueError::Empty),
            };
            tokio::select! {
                _ = self.halt.wait() => return Err(QueueError::Halted),
                _ = time::timeout(remaining, self.not_empty.notified()) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halt::halt_pair;

    fn queue(capacity: usize) -> FrameQueue<u8> {
        let (_switch, handle) = halt_pair();
        FrameQueue::new(capacity, handle)
    }

    #[tokio::test]
    async fn put_then_get_preserves_order() {
        let q = queue(4);
        q.put((1, 10), Duration::from_millis(100)).await.unwrap();
        q.put((2, 20), Duration::from_millis(100)).await.unwrap();
        assert_eq!(q.get(Duration::from_millis(100)).await.unwrap(), (1, 10));
        assert_eq!(q.get(Duration::from_millis(100)).await.unwrap(), (2, 20));
    }

    #[tokio::test]
    async fn get_times_out_when_empty() {
        let q = queue(4);
        let result = q.get(Duration::from_millis(20)).await;
        assert_eq!(result, Err(QueueError::Empty));
    }

    #[tokio::test]
    async fn put_times_out_when_full() {
        let q = queue(1);
        q.put((1, 1), Duration::from_millis(100)).await.unwrap();
        let result = q.put((2, 2), Duration::from_millis(20)).await;
        assert_eq!(result, Err(QueueError::Full));
    }

    #[tokio::test]
    async fn never_exceeds_capacity_under_concurrent_puts() {
        use std::sync::Arc;
        let (_switch, handle) = halt_pair();
        let q = Arc::new(FrameQueue::new(3, handle));
        let mut handles = Vec::new();
        for i in 0..10u32 {
            let q = q.clone();
            handles.push(tokio::spawn(async move {
                q.put_nonblocking_drop_oldest((i, i)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(q.len().await <= 3);
    }

    #[tokio::test]
    async fn halt_wakes_blocked_get() {
        let (switch, handle) = halt_pair();
        let q = std::sync::Arc::new(FrameQueue::<u8>::new(4, handle));
        let q2 = q.clone();
        let task = tokio::spawn(async move { q2.get(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        switch.raise();
        let result = task.await.unwrap();
        assert_eq!(result, Err(QueueError::Halted));
    }

    #[tokio::test]
    async fn peek_front_does_not_remove_item() {
        let q = queue(4);
        q.put((1, 10), Duration::from_millis(100)).await.unwrap();
        assert_eq!(q.peek_front().await, Some((1, 10)));
        assert_eq!(q.len().await, 1);
        assert_eq!(q.get(Duration::from_millis(100)).await.unwrap(), (1, 10));
    }

    #[tokio::test]
    async fn peek_front_on_empty_queue_is_none() {
        let q = queue(4);
        assert_eq!(q.peek_front().await, None);
    }

    #[tokio::test]
    async fn drop_oldest_keeps_freshest_item() {
        let q = queue(2);
        q.put_nonblocking_drop_oldest((1, 1)).await;
        q.put_nonblocking_drop_oldest((2, 2)).await;
        q.put_nonblocking_drop_oldest((3, 3)).await;
        assert_eq!(q.len().await, 2);
        let (first, _) = q.get(Duration::from_millis(50)).await.unwrap();
        assert_eq!(first, 2);
    }
}
