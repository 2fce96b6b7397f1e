use crate::beat::Flit;
use crate::dataflow::Stream;

/// Streaming per-packet accumulation.
///
/// Each consumed item updates a running state; when an item closes its
/// packet the state is pushed to `out` and reset to `init`.
#[derive(Debug)]
pub struct Fold<I, S> {
    init: S,
    state: S,
    out: Stream<S>,
    _input: std::marker::PhantomData<fn(I)>,
}

impl<I: Flit, S: Clone> Fold<I, S> {
    pub fn new(init: S, out: Stream<S>) -> Self {
        Self {
            state: init.clone(),
            init,
            out,
            _input: std::marker::PhantomData,
        }
    }

    /// Completed states.
    #[inline]
    pub fn out(&self) -> &Stream<S> {
        &self.out
    }

    /// State accumulated so far for the packet in flight.
    #[inline]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Consume at most one item, applying `accumulate` to the running state.
    ///
    /// No-op while the output is full, so a closing item is never consumed
    /// without room for its result.
    pub fn step<F>(&mut self, input: &Stream<I>, accumulate: F) -> bool
    where
        F: FnOnce(&mut S, &I),
    {
        if input.is_empty() || self.out.is_full() {
            return false;
        }
        let Some(item) = input.try_read() else {
            return false;
        };

        accumulate(&mut self.state, &item);

        if item.is_last() {
            let done = std::mem::replace(&mut self.state, self.init.clone());
            // Output was checked for room above.
            let _ = self.out.try_write(done);
        }
        true
    }
}
