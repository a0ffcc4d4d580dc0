use crate::buffer::{Message, RingBuffer, DEFAULT_CHANNEL_CAPACITY};
use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use crate::source::SourceAdapter;
use crate::stage::{Stage, StageRunner};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The output end of a running chain of stages.
///
/// A `Producer` is both sides of the composition contract: it can be pulled
/// from ([`recv`](Self::recv), or the `Iterator` impl), or connected into a
/// further stage with [`pipe`](Self::pipe). Each `pipe` spawns the stage on
/// its own thread behind a bounded channel, so backpressure from the new
/// stage reaches the existing chain transparently.
///
/// End-of-stream travels through every stage in order, after each stage's
/// flush, so [`finish`](Self::finish) and [`wait`](Self::wait) only return
/// once all buffered items everywhere have been fully processed.
pub struct Producer<T: Send + 'static> {
    buffer: RingBuffer<Message<T>>,
    capacity: usize,
    handles: Vec<JoinHandle<Result<()>>>,
    stages: Vec<(String, StageMetrics)>,
    done: bool,
}

impl<T: Send + 'static> Producer<T> {
    pub(crate) fn from_source(source: SourceAdapter<T>, capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CHANNEL_CAPACITY
        } else {
            capacity
        };
        let buffer = RingBuffer::new(capacity);
        let out = buffer.clone();
        let handle = thread::spawn(move || {
            source.run(out);
            Ok(())
        });
        Self {
            buffer,
            capacity,
            handles: vec![handle],
            stages: Vec::new(),
            done: false,
        }
    }

    /// Connect this producer's output to a stage's input.
    ///
    /// The stage runs on its own thread; at most one of its inputs is in
    /// flight at any time. Returns the producer for the stage's output.
    pub fn pipe<S>(self, stage: S) -> Producer<S::Out>
    where
        S: Stage<In = T>,
    {
        let output = RingBuffer::new(self.capacity);
        let metrics = StageMetrics::new();
        let name = stage.name().to_string();
        let runner = StageRunner::new(self.buffer, output.clone(), metrics.clone());

        let mut handles = self.handles;
        handles.push(thread::spawn(move || runner.run(stage)));

        let mut stages = self.stages;
        stages.push((name, metrics));

        Producer {
            buffer: output,
            capacity: self.capacity,
            handles,
            stages,
            done: false,
        }
    }

    /// Pull the next available item, blocking until one arrives.
    /// Returns `None` once end-of-stream has been observed.
    pub fn recv(&mut self) -> Option<T> {
        if self.done {
            return None;
        }
        loop {
            match self.buffer.pop() {
                Some(Message::Item(item)) => return Some(item),
                Some(Message::End) => {
                    self.done = true;
                    return None;
                }
                None => thread::sleep(Duration::from_micros(10)),
            }
        }
    }

    /// Drain every remaining item, then join all stage threads.
    /// The first stage failure, if any, is returned.
    pub fn finish(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.recv() {
            items.push(item);
        }
        self.join_all()?;
        Ok(items)
    }

    /// Run the chain to completion, discarding output.
    /// This is the "processing complete" signal for a connected chain.
    pub fn wait(mut self) -> Result<()> {
        while self.recv().is_some() {}
        self.join_all()
    }

    fn join_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for handle in self.handles.drain(..) {
            let result = handle
                .join()
                .map_err(|_| PipelineError::ThreadError("stage thread join failed".into()))
                .and_then(|r| r);
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Get metrics for the stage at `index` (0 = first piped stage)
    pub fn stage_metrics(&self, index: usize) -> Option<&StageMetrics> {
        self.stages.get(index).map(|(_, metrics)| metrics)
    }

    /// Get a summary of all stage metrics
    pub fn metrics_summary(&self) -> String {
        let mut summary = String::from("Pipeline Metrics Summary:\n");
        for (name, metrics) in &self.stages {
            summary.push_str(&format!("  {}: {}\n", name, metrics.snapshot().format()));
        }
        summary
    }
}

impl<T: Send + 'static> Iterator for Producer<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::to_stream;
    use crate::stage::Emitter;
    use crate::transform::MapStage;

    #[test]
    fn test_pull_yields_items_then_none() {
        let mut stream = to_stream(vec![1, 2, 3]);
        assert_eq!(stream.recv(), Some(1));
        assert_eq!(stream.recv(), Some(2));
        assert_eq!(stream.recv(), Some(3));
        assert_eq!(stream.recv(), None);
        assert_eq!(stream.recv(), None);
    }

    #[test]
    fn test_pipe_collects_metrics() {
        let stream = to_stream(0..100).pipe(MapStage::new(
            "id",
            |x: i32, out: &mut Emitter<i32>| {
                out.emit(x);
                Ok(())
            },
        ));
        let metrics = stream.stage_metrics(0).unwrap().clone();
        let items = stream.finish().unwrap();
        assert_eq!(items.len(), 100);
        assert_eq!(metrics.total_processed(), 100);
        assert_eq!(metrics.total_emitted(), 100);
    }

    #[test]
    fn test_metrics_summary_names_stages() {
        let stream = to_stream(0..10).pipe(MapStage::new(
            "tagged",
            |x: i32, out: &mut Emitter<i32>| {
                out.emit(x);
                Ok(())
            },
        ));
        assert!(stream.metrics_summary().contains("tagged"));
        stream.wait().unwrap();
    }
}
