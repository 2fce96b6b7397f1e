use crate::beat::{Beat, IndexedBeat};
use crate::dataflow::{link, Enumerator, Stream};
use crate::parser::extract::HeaderExtractor;
use crate::parser::fields::FieldLayout;
use crate::parser::metadata::Metadata;

/// Enumerator → HeaderExtractor, with one beat stream in and one metadata
/// stream out.
///
/// The only buffering is the single in-flight indexed beat between the two
/// stages.
#[derive(Debug)]
pub struct Pipeline<const W: usize> {
    enumerator: Enumerator,
    indexed: Stream<IndexedBeat<W>>,
    extractor: HeaderExtractor<W>,
    out: Stream<Metadata>,
}

impl<const W: usize> Pipeline<W> {
    /// Default Ethernet/IPv4/UDP layout.
    pub fn new(depth: usize) -> Self {
        Self::with_layout(FieldLayout::default(), depth)
    }

    pub fn with_layout(layout: FieldLayout, depth: usize) -> Self {
        Self {
            enumerator: Enumerator::new(),
            indexed: Stream::new("indexed", 1),
            extractor: HeaderExtractor::new(layout, 1),
            out: Stream::new("pipeline_out", depth),
        }
    }

    /// One metadata record per packet, in arrival order.
    #[inline]
    pub fn out(&self) -> &Stream<Metadata> {
        &self.out
    }

    #[inline]
    pub fn layout(&self) -> &FieldLayout {
        self.extractor.layout()
    }

    /// No beat or record held inside the pipeline.
    pub fn is_idle(&self) -> bool {
        self.indexed.is_empty() && self.extractor.out().is_empty()
    }

    /// Advance every internal stage once. Returns `true` if anything moved.
    pub fn step(&mut self, input: &Stream<Beat<W>>) -> bool {
        let mut progressed = self.enumerator.step(input, &self.indexed);
        progressed |= self.extractor.step(&self.indexed);
        progressed |= link(self.extractor.out(), &self.out);
        progressed
    }
}
