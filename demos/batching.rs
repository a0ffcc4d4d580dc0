//! Batch sampling and shuffling demo
//!
//! Streams 0..100 through a sample stage and a shuffle stage and prints
//! what comes out of each.
//!
//! Usage: cargo run --example batching

use stream_stages::{to_stream, Result, SampleStage, ShuffleStage};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let picks = to_stream(0..100).pipe(SampleStage::new(10)).finish()?;
    println!("one pick per batch of 10: {:?}", picks);

    let shuffled = to_stream(0..100).pipe(ShuffleStage::new(10)).finish()?;
    println!("batch-local shuffle:      {:?}", shuffled);

    Ok(())
}
