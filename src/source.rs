use crate::backpressure::BackpressureController;
use crate::buffer::{Message, RingBuffer, DEFAULT_CHANNEL_CAPACITY};
use crate::pipeline::Producer;
use tracing::debug;

/// Turns a finite, already-materialized ordered sequence into a one-item-at-
/// a-time producer.
///
/// The adapter runs on its own thread and writes into a bounded channel, so
/// it only makes progress in response to downstream demand. On top of the
/// blocking channel it honors a watermark pause signal: while the channel
/// sits above the high watermark the adapter stops consuming its input, and
/// it resumes from the same position once the channel drains below the low
/// watermark.
pub struct SourceAdapter<T> {
    items: Vec<T>,
    backpressure: BackpressureController,
}

impl<T: Send + 'static> SourceAdapter<T> {
    /// Create a source over an ordered sequence of items
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items.into_iter().collect(),
            backpressure: BackpressureController::new(),
        }
    }

    pub(crate) fn run(self, out: RingBuffer<Message<T>>) {
        debug!(count = self.items.len(), "source started");
        for item in self.items {
            self.backpressure.throttle(&out);
            out.push(Message::Item(item));
        }
        out.push(Message::End);
        debug!("source finished");
    }
}

/// Convert an ordered sequence into a [`Producer`] that emits each item in
/// original order, then signals end-of-stream.
pub fn to_stream<T: Send + 'static>(items: impl IntoIterator<Item = T>) -> Producer<T> {
    to_stream_with_capacity(items, DEFAULT_CHANNEL_CAPACITY)
}

/// Like [`to_stream`], with an explicit channel capacity for the pipeline.
/// A capacity of zero is silently normalized to the default.
pub fn to_stream_with_capacity<T: Send + 'static>(
    items: impl IntoIterator<Item = T>,
    capacity: usize,
) -> Producer<T> {
    Producer::from_source(SourceAdapter::new(items), capacity)
}
