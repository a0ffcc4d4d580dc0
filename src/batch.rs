use crate::error::Result;
use crate::stage::{Emitter, Stage};
use rand::seq::SliceRandom;
use rand::Rng;

/// Default number of items per batch for sampling and shuffling
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// A batch size of zero is silently normalized to the default, never raised.
fn normalize_batch_size(batch_size: usize) -> usize {
    if batch_size == 0 {
        DEFAULT_BATCH_SIZE
    } else {
        batch_size
    }
}

/// A stage that partitions the stream into fixed-size batches and emits one
/// uniformly random representative per batch.
///
/// Items accumulate in a pool; when the pool reaches the batch size one item
/// is picked and the pool cleared. A non-empty short final batch still
/// yields one pick at flush, so N inputs produce exactly ceil(N/B) outputs.
pub struct SampleStage<T> {
    batch_size: usize,
    pool: Vec<T>,
}

impl<T> SampleStage<T> {
    /// Create a new sample stage with the given batch size
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: normalize_batch_size(batch_size),
            pool: Vec::new(),
        }
    }
}

impl<T> Default for SampleStage<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl<T: Send + 'static> SampleStage<T> {
    fn emit_pick(&mut self, out: &mut Emitter<T>) {
        let idx = rand::rng().random_range(0..self.pool.len());
        let pick = self.pool.swap_remove(idx);
        self.pool.clear();
        out.emit(pick);
    }
}

impl<T: Send + 'static> Stage for SampleStage<T> {
    type In = T;
    type Out = T;

    fn process(&mut self, item: T, out: &mut Emitter<T>) -> Result<()> {
        self.pool.push(item);
        if self.pool.len() >= self.batch_size {
            self.emit_pick(out);
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Emitter<T>) -> Result<()> {
        if !self.pool.is_empty() {
            self.emit_pick(out);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "sample"
    }
}

/// A stage that partitions the stream into fixed-size batches and emits every
/// item of each batch in a uniformly random order (Fisher-Yates).
///
/// The output is a permutation of the input multiset, and the permutation is
/// strictly batch-local: items never cross batch boundaries.
pub struct ShuffleStage<T> {
    batch_size: usize,
    pool: Vec<T>,
}

impl<T> ShuffleStage<T> {
    /// Create a new shuffle stage with the given batch size
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: normalize_batch_size(batch_size),
            pool: Vec::new(),
        }
    }
}

impl<T> Default for ShuffleStage<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl<T: Send + 'static> ShuffleStage<T> {
    fn emit_shuffled(&mut self, out: &mut Emitter<T>) {
        self.pool.shuffle(&mut rand::rng());
        for item in self.pool.drain(..) {
            out.emit(item);
        }
    }
}

impl<T: Send + 'static> Stage for ShuffleStage<T> {
    type In = T;
    type Out = T;

    fn process(&mut self, item: T, out: &mut Emitter<T>) -> Result<()> {
        self.pool.push(item);
        if self.pool.len() >= self.batch_size {
            self.emit_shuffled(out);
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Emitter<T>) -> Result<()> {
        if !self.pool.is_empty() {
            self.emit_shuffled(out);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "shuffle"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Message, RingBuffer};
    use crate::metrics::StageMetrics;

    fn drain<T: Send>(buffer: &RingBuffer<Message<T>>) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(Message::Item(item)) = buffer.pop() {
            items.push(item);
        }
        items
    }

    #[test]
    fn test_zero_batch_size_normalized() {
        let stage: SampleStage<i32> = SampleStage::new(0);
        assert_eq!(stage.batch_size, DEFAULT_BATCH_SIZE);
        let stage: ShuffleStage<i32> = ShuffleStage::new(0);
        assert_eq!(stage.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_sample_one_pick_per_batch() {
        let buffer = RingBuffer::new(64);
        let mut out = Emitter::new(buffer.clone(), StageMetrics::new());
        let mut stage = SampleStage::new(5);

        for i in 0..20 {
            stage.process(i, &mut out).unwrap();
        }
        stage.flush(&mut out).unwrap();

        let picks = drain(&buffer);
        assert_eq!(picks.len(), 4);
        // Each pick comes from its own batch
        for (batch, pick) in picks.iter().enumerate() {
            let lo = (batch * 5) as i32;
            assert!((lo..lo + 5).contains(pick));
        }
    }

    #[test]
    fn test_sample_short_final_batch() {
        let buffer = RingBuffer::new(64);
        let mut out = Emitter::new(buffer.clone(), StageMetrics::new());
        let mut stage = SampleStage::new(10);

        for i in 0..13 {
            stage.process(i, &mut out).unwrap();
        }
        stage.flush(&mut out).unwrap();

        let picks = drain(&buffer);
        assert_eq!(picks.len(), 2);
        assert!((0..10).contains(&picks[0]));
        assert!((10..13).contains(&picks[1]));
    }

    #[test]
    fn test_sample_pool_cleared_between_batches() {
        let buffer = RingBuffer::new(64);
        let mut out = Emitter::new(buffer.clone(), StageMetrics::new());
        let mut stage = SampleStage::new(3);

        for i in 0..6 {
            stage.process(i, &mut out).unwrap();
        }
        assert!(stage.pool.is_empty());
    }

    #[test]
    fn test_shuffle_batch_local_permutation() {
        let buffer = RingBuffer::new(128);
        let mut out = Emitter::new(buffer.clone(), StageMetrics::new());
        let mut stage = ShuffleStage::new(10);

        for i in 0..35 {
            stage.process(i, &mut out).unwrap();
        }
        stage.flush(&mut out).unwrap();

        let output = drain(&buffer);
        assert_eq!(output.len(), 35);

        // Every batch of output is a permutation of the matching input batch,
        // including the short final one
        for (batch, chunk) in output.chunks(10).enumerate() {
            let mut sorted = chunk.to_vec();
            sorted.sort_unstable();
            let lo = (batch * 10) as i32;
            let expected: Vec<i32> = (lo..lo + chunk.len() as i32).collect();
            assert_eq!(sorted, expected);
        }
    }

    #[test]
    fn test_shuffle_empty_flush_emits_nothing() {
        let buffer = RingBuffer::new(8);
        let mut out = Emitter::new(buffer.clone(), StageMetrics::new());
        let mut stage: ShuffleStage<i32> = ShuffleStage::new(10);
        stage.flush(&mut out).unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sample_is_roughly_uniform() {
        // Over many single-batch runs, every position should get picked at
        // least once. Structural check only, no exact sequences.
        let mut seen = [false; 5];
        for _ in 0..500 {
            let buffer = RingBuffer::new(8);
            let mut out = Emitter::new(buffer.clone(), StageMetrics::new());
            let mut stage = SampleStage::new(5);
            for i in 0..5usize {
                stage.process(i, &mut out).unwrap();
            }
            if let Some(Message::Item(pick)) = buffer.pop() {
                seen[pick] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }
}
