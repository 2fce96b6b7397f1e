use crate::beat::{Beat, IndexedBeat};
use crate::dataflow::Stream;

/// Numbers each beat with its position inside the current packet.
///
/// The counter restarts at 0 after every `last` beat. Beats are neither
/// dropped nor reordered.
#[derive(Debug, Default)]
pub struct Enumerator {
    counter: u32,
}

impl Enumerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position the next beat will receive.
    #[inline]
    pub fn next_index(&self) -> u32 {
        self.counter
    }

    /// Consume at most one beat. Returns `true` if a beat moved.
    pub fn step<const W: usize>(
        &mut self,
        input: &Stream<Beat<W>>,
        out: &Stream<IndexedBeat<W>>,
    ) -> bool {
        if input.is_empty() || out.is_full() {
            return false;
        }
        let Some(beat) = input.try_read() else {
            return false;
        };

        let indexed = IndexedBeat { index: self.counter, beat };
        if out.try_write(indexed).is_err() {
            return false;
        }

        self.counter = if beat.last { 0 } else { self.counter.saturating_add(1) };
        true
    }
}
