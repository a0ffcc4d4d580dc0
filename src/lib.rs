//! Composable, order-preserving, backpressure-aware stream stages for
//! in-memory object pipelines.
//!
//! This crate turns a finite in-memory sequence into a push-based stream and
//! transforms it through chained stages, each processing one item at a time
//! in strict arrival order. Items are opaque to the library; each stage owns
//! its state and runs on its own thread behind a bounded channel, so a slow
//! stage transparently slows everything upstream.
//!
//! # Stages
//!
//! - [`to_stream`] — source adapter over an ordered sequence
//! - [`MapStage`] — per-item transform, zero or more outputs per input
//! - [`ReduceStage`] — fold the whole stream into one value
//! - [`SampleStage`] — one uniform random pick per fixed-size batch
//! - [`ShuffleStage`] — batch-local uniform random permutation
//! - [`GroupByStage`] — accumulate items by string key, flush one record per key
//!
//! # Example
//!
//! ```ignore
//! use stream_stages::{to_stream, Emitter, MapStage, ReduceStage};
//!
//! let total = to_stream(0..1000i64)
//!     .pipe(MapStage::new("double", |x, out: &mut Emitter<i64>| {
//!         out.emit(x * 2);
//!         Ok(())
//!     }))
//!     .pipe(ReduceStage::new("sum", 0i64, |acc, x| Ok(Some(acc + x))))
//!     .finish()?;
//! assert_eq!(total, vec![999_000]);
//! ```

pub mod backpressure;
pub mod batch;
pub mod buffer;
pub mod error;
pub mod group;
pub mod metrics;
pub mod pipeline;
pub mod source;
pub mod stage;
pub mod transform;

// Re-exports for convenience
pub use backpressure::BackpressureController;
pub use batch::{SampleStage, ShuffleStage, DEFAULT_BATCH_SIZE};
pub use buffer::{Message, RingBuffer, DEFAULT_CHANNEL_CAPACITY};
pub use error::{PipelineError, Result};
pub use group::{GroupByStage, GroupRecord, DEFAULT_KEY_FIELD, DEFAULT_VALUE_FIELD};
pub use metrics::{MetricsSnapshot, StageMetrics};
pub use pipeline::Producer;
pub use source::{to_stream, to_stream_with_capacity, SourceAdapter};
pub use stage::{Emitter, Stage, StageRunner};
pub use transform::{MapStage, ReduceStage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
