use thiserror::Error;

use crate::{
    beat::BeatError,
    capture::CaptureError,
    parser::LayoutError,
};

/// Unified stream error covering the codec, capture I/O, layouts and the
/// dataflow driver.
/// - `From<T>` impls enable `?` across the pipeline.
/// - Messages aim to be stable and contextual for logs.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Beat-level error (encoding, keep-mask validation, reassembly).
    #[error("beat error: {0}")]
    Beat(#[from] BeatError),

    /// Capture container error (open, parse, write, sync).
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Field layout table rejected.
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// A packet completed in the decoder with no paired decision.
    #[error("classification stream underrun: packet of {len} bytes completed with no decision")]
    ClassificationUnderrun { len: usize },

    /// A bounded stream could not accept the write.
    #[error("stream '{stream}' is full")]
    StreamFull { stream: &'static str },

    /// The scheduler ran out of ticks before the work drained.
    #[error("pipeline did not drain within {ticks} ticks")]
    Stalled { ticks: u64 },

    /// A rule register command did not complete or was refused.
    #[error("rule command failed: {0}")]
    RuleCommand(String),

    /// Generic high-level validation with a descriptive message.
    #[error("validation error: {0}")]
    Validation(String),
}
