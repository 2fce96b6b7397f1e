//! beatflow-core
//!
//! Packets as streams of fixed-width beats: encoder, decoder, incremental
//! header parser and a reference classification stage, driven tick by tick
//! over bounded streams. Captures come in and go out as legacy pcap.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod config;

// Codec and dataflow
pub mod beat;
pub mod dataflow;
pub mod parser;
pub mod classify;

// Edges
pub mod capture;
pub mod session;
pub mod telemetry;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::beat::{Beat, DecodeEvent, Decoder, Encoder, IndexedBeat, KeepMask};
    pub use crate::capture::{CaptureRange, CaptureReader, CaptureWriter};
    pub use crate::classify::{Classifier, Firewall, Rule, RuleTable};
    pub use crate::config::PipelineConfig;
    pub use crate::dataflow::{Scheduler, Stream, Tick};
    pub use crate::parser::{FieldLayout, Metadata, Pipeline};
    pub use crate::session::{FilterSession, InspectSession};
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::types::StreamError;
}
