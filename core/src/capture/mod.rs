//! Capture container I/O (legacy pcap).
//!
//! Responsibilities:
//! - Read packet records, skipping truncated captures and records outside
//!   the requested ordinal range
//! - Write reconstructed packets and make the file durable
//!
//! Non-responsibilities:
//! - Beats, parsing, classification

use std::io;
use std::ops::Range;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod reader;
pub mod writer;

pub use reader::{CapturedPacket, CaptureReader, CaptureStats};
pub use writer::CaptureWriter;

/// Ordinal window `[start, end)` of packets to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRange {
    pub start: u64,
    pub end: u64,
}

impl CaptureRange {
    pub const ALL: CaptureRange = CaptureRange { start: 0, end: u64::MAX };

    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn contains(&self, ordinal: u64) -> bool {
        ordinal >= self.start && ordinal < self.end
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl Default for CaptureRange {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<Range<u64>> for CaptureRange {
    fn from(r: Range<u64>) -> Self {
        Self { start: r.start, end: r.end }
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot open capture {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("capture I/O failed")]
    Io(#[from] io::Error),

    #[error("capture parse error: {0}")]
    Parse(String),

    #[error("unsupported capture format: {0}")]
    Unsupported(&'static str),

    #[error("packet of {len} bytes exceeds capture snaplen {snaplen}")]
    PacketTooLong { len: usize, snaplen: u32 },
}
