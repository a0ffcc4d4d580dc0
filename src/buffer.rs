use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default capacity of the channel connecting two stages
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Envelope for values travelling between stages.
///
/// `End` is pushed exactly once after a producer's final item and is
/// forwarded by each stage only after its flush has run, so it reaches the
/// terminal consumer when every buffered item upstream has been processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    /// One stream item
    Item(T),
    /// End-of-stream marker
    End,
}

/// A bounded lock-free channel between two stages, using crossbeam's ArrayQueue.
///
/// Pushing into a full channel blocks until the consumer makes room; this is
/// the pipeline's backpressure mechanism. Items are never dropped.
#[derive(Debug)]
pub struct RingBuffer<T> {
    queue: Arc<ArrayQueue<T>>,
    block_count: Arc<AtomicU64>,
}

impl<T> Clone for RingBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            block_count: Arc::clone(&self.block_count),
        }
    }
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with the specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity)),
            block_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Push an item into the buffer, blocking while it is full
    pub fn push(&self, item: T) {
        if let Err(item) = self.queue.push(item) {
            self.block_count.fetch_add(1, Ordering::Relaxed);
            self.push_blocking(item);
        }
    }

    fn push_blocking(&self, mut item: T) {
        loop {
            match self.queue.push(item) {
                Ok(()) => return,
                Err(i) => {
                    item = i;
                    // Spin with a small backoff to reduce CPU usage
                    thread::sleep(Duration::from_micros(1));
                }
            }
        }
    }

    /// Attempt to pop an item from the buffer
    pub fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Get the current size of the buffer
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Get the capacity of the buffer
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Get the utilization of the buffer as a percentage (0-100)
    pub fn utilization(&self) -> u32 {
        ((self.len() as u32 * 100) / self.capacity() as u32).min(100)
    }

    /// Get the number of times a push found the buffer full
    pub fn block_count(&self) -> u64 {
        self.block_count.load(Ordering::Relaxed)
    }
}
