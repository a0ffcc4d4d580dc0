use crate::error::Result;
use crate::stage::{Emitter, Stage};
use std::marker::PhantomData;

/// A stage that applies a per-item transformation, preserving order.
///
/// The mapper is invoked exactly once per input and may emit zero or more
/// outputs before returning; each emit is forwarded downstream immediately.
/// The next input is not taken until the mapper returns. A mapper error or
/// panic is not handled here: it aborts the pipeline.
pub struct MapStage<I, O, F>
where
    F: FnMut(I, &mut Emitter<O>) -> Result<()> + Send + 'static,
{
    name: String,
    mapper: F,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O, F> MapStage<I, O, F>
where
    F: FnMut(I, &mut Emitter<O>) -> Result<()> + Send + 'static,
{
    /// Create a new map stage
    pub fn new(name: impl Into<String>, mapper: F) -> Self {
        Self {
            name: name.into(),
            mapper,
            _marker: PhantomData,
        }
    }
}

impl<I, O, F> Stage for MapStage<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I, &mut Emitter<O>) -> Result<()> + Send + 'static,
{
    type In = I;
    type Out = O;

    fn process(&mut self, item: I, out: &mut Emitter<O>) -> Result<()> {
        (self.mapper)(item, out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A stage that folds the whole stream into a single accumulated value.
///
/// The reducer sees the current accumulator and the next item. Returning
/// `Ok(Some(v))` replaces the accumulator with `v`; returning `Ok(None)`
/// leaves it unchanged, so a reducer that never hands back a value observes
/// the initializer for every item. The final accumulator is emitted exactly
/// once, at end-of-input; an empty input emits the initializer.
pub struct ReduceStage<I, A, F>
where
    F: FnMut(&A, I) -> Result<Option<A>> + Send + 'static,
{
    name: String,
    accum: Option<A>,
    reducer: F,
    _marker: PhantomData<fn(I)>,
}

impl<I, A, F> ReduceStage<I, A, F>
where
    F: FnMut(&A, I) -> Result<Option<A>> + Send + 'static,
{
    /// Create a new reduce stage seeded with `initial`
    pub fn new(name: impl Into<String>, initial: A, reducer: F) -> Self {
        Self {
            name: name.into(),
            accum: Some(initial),
            reducer,
            _marker: PhantomData,
        }
    }
}

impl<I, A, F> Stage for ReduceStage<I, A, F>
where
    I: Send + 'static,
    A: Send + 'static,
    F: FnMut(&A, I) -> Result<Option<A>> + Send + 'static,
{
    type In = I;
    type Out = A;

    fn process(&mut self, item: I, _out: &mut Emitter<A>) -> Result<()> {
        if let Some(acc) = self.accum.as_ref() {
            if let Some(next) = (self.reducer)(acc, item)? {
                self.accum = Some(next);
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Emitter<A>) -> Result<()> {
        if let Some(acc) = self.accum.take() {
            out.emit(acc);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
