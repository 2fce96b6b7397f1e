use crate::beat::IndexedBeat;
use crate::dataflow::{Fold, Stream};
use crate::parser::fields::FieldLayout;
use crate::parser::metadata::Metadata;

/// Scatter the bytes of one beat into every field they overlap.
///
/// Field offsets are absolute within the packet; the beat covers
/// `[index * W, index * W + valid_len)`. Fields split across beats are
/// assembled over successive calls. A field is marked read once its final
/// byte lands.
pub fn scatter<const W: usize>(layout: &FieldLayout, metadata: &mut Metadata, indexed: &IndexedBeat<W>) {
    let beat = &indexed.beat;
    let beat_start = (indexed.index as usize).saturating_mul(W);
    let beat_end = beat_start.saturating_add(beat.valid_len());

    for spec in layout.specs() {
        let start = spec.offset.max(beat_start);
        let end = spec.end().min(beat_end);
        if start >= end {
            continue;
        }

        for pos in start..end {
            metadata.set_field_byte(spec.field, pos - spec.offset, beat.data[pos - beat_start]);
        }
        if end == spec.end() {
            metadata.mark_read(spec.field);
        }
    }
}

/// Streaming header extractor: a fold over indexed beats that emits one
/// `Metadata` per packet on its `last` beat.
#[derive(Debug)]
pub struct HeaderExtractor<const W: usize> {
    layout: FieldLayout,
    fold: Fold<IndexedBeat<W>, Metadata>,
}

impl<const W: usize> HeaderExtractor<W> {
    pub fn new(layout: FieldLayout, depth: usize) -> Self {
        Self {
            layout,
            fold: Fold::new(Metadata::new(), Stream::new("metadata", depth)),
        }
    }

    #[inline]
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Completed records.
    #[inline]
    pub fn out(&self) -> &Stream<Metadata> {
        self.fold.out()
    }

    /// Record being built for the packet in flight.
    #[inline]
    pub fn in_progress(&self) -> &Metadata {
        self.fold.state()
    }

    /// Consume at most one indexed beat.
    pub fn step(&mut self, input: &Stream<IndexedBeat<W>>) -> bool {
        let layout = &self.layout;
        self.fold.step(input, |metadata, indexed| scatter(layout, metadata, indexed))
    }
}
