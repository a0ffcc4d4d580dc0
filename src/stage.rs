use crate::buffer::{Message, RingBuffer};
use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Trait for a processing stage in a pipeline.
///
/// A stage consumes exactly one input at a time, strictly in arrival order;
/// the runner does not hand it the next item until `process` returns. State
/// held by the stage value (pool, accumulator, table) is therefore never
/// touched by two items at once.
pub trait Stage: Send + 'static {
    /// Item type consumed from upstream
    type In: Send + 'static;
    /// Item type forwarded downstream
    type Out: Send + 'static;

    /// Process one input item, emitting zero, one, or many outputs
    fn process(&mut self, item: Self::In, out: &mut Emitter<Self::Out>) -> Result<()>;

    /// Called once at end-of-input, before end-of-stream is forwarded.
    /// Batching and aggregating stages emit their buffered results here.
    fn flush(&mut self, _out: &mut Emitter<Self::Out>) -> Result<()> {
        Ok(())
    }

    /// Get a human-readable name for this stage
    fn name(&self) -> &str {
        "stage"
    }
}

/// Handle through which a stage forwards items downstream.
///
/// Each `emit` pushes into the downstream channel immediately, in call
/// order, blocking while the channel is full.
pub struct Emitter<T> {
    out: RingBuffer<Message<T>>,
    metrics: StageMetrics,
}

impl<T> Emitter<T> {
    pub(crate) fn new(out: RingBuffer<Message<T>>, metrics: StageMetrics) -> Self {
        Self { out, metrics }
    }

    /// Forward one item downstream
    pub fn emit(&mut self, item: T) {
        self.out.push(Message::Item(item));
        self.metrics.record_emitted();
    }
}

/// Runs a stage on its own thread: pulls from the input channel, processes,
/// and pushes to the output channel. `End` is forwarded downstream exactly
/// once, after the stage's flush, on success, failure, and panic alike.
pub struct StageRunner<S: Stage> {
    input: RingBuffer<Message<S::In>>,
    output: RingBuffer<Message<S::Out>>,
    metrics: StageMetrics,
    saw_end: bool,
}

impl<S: Stage> StageRunner<S> {
    /// Create a new stage runner
    pub fn new(
        input: RingBuffer<Message<S::In>>,
        output: RingBuffer<Message<S::Out>>,
        metrics: StageMetrics,
    ) -> Self {
        Self {
            input,
            output,
            metrics,
            saw_end: false,
        }
    }

    /// Run the stage until end-of-stream. Blocks the calling thread.
    pub fn run(mut self, stage: S) -> Result<()> {
        let output = self.output.clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_loop(stage)));
        output.push(Message::End);
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.drain_input();
                Err(e)
            }
            Err(payload) => {
                let message = panic_message(payload);
                error!(%message, "stage panicked");
                self.drain_input();
                Err(PipelineError::StagePanicked(message))
            }
        }
    }

    /// After a failure, discard the rest of the input so blocked upstream
    /// producers can run to completion and be joined.
    fn drain_input(&mut self) {
        while !self.saw_end {
            match self.input.pop() {
                Some(Message::End) => return,
                Some(Message::Item(_)) => {}
                None => thread::sleep(Duration::from_micros(10)),
            }
        }
    }

    fn run_loop(&mut self, mut stage: S) -> Result<()> {
        debug!(stage = stage.name(), "stage started");
        let mut emitter = Emitter::new(self.output.clone(), self.metrics.clone());

        loop {
            match self.input.pop() {
                Some(Message::Item(item)) => {
                    let start = Instant::now();
                    if let Err(e) = stage.process(item, &mut emitter) {
                        error!(stage = stage.name(), error = %e, "stage failed");
                        return Err(e);
                    }
                    self.metrics.record_latency(start.elapsed().as_nanos() as u64);
                    self.metrics.record_processed();
                }
                Some(Message::End) => {
                    self.saw_end = true;
                    stage.flush(&mut emitter)?;
                    debug!(stage = stage.name(), "stage finished");
                    return Ok(());
                }
                None => {
                    // No item available, sleep briefly to reduce CPU usage
                    thread::sleep(Duration::from_micros(10));
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
