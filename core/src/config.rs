//! Pipeline configuration.
//!
//! Every field has a default from `constants`; a JSON file may override any
//! subset of them.

use serde::{Deserialize, Serialize};

use crate::capture::CaptureRange;
use crate::constants::{DEFAULT_RULE_CAPACITY, DEFAULT_STREAM_DEPTH, MAX_PACKET_LEN};
use crate::types::StreamError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of every inter-stage stream.
    pub stream_depth: usize,
    /// Tick limit for a session; `None` runs until drained.
    pub tick_budget: Option<u64>,
    /// Ordinals of well-formed capture records to process.
    pub range: CaptureRange,
    /// Longest packet the encoder and decoder accept.
    pub max_packet_len: usize,
    /// Decision for packets that match no rule.
    pub default_drop: bool,
    pub rule_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stream_depth: DEFAULT_STREAM_DEPTH,
            tick_budget: None,
            range: CaptureRange::ALL,
            max_packet_len: MAX_PACKET_LEN,
            default_drop: false,
            rule_capacity: DEFAULT_RULE_CAPACITY,
        }
    }
}

impl PipelineConfig {
    pub fn with_range(mut self, range: CaptureRange) -> Self {
        self.range = range;
        self
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.stream_depth == 0 {
            return Err(StreamError::Validation("stream_depth must be at least 1".into()));
        }
        if self.max_packet_len == 0 || self.max_packet_len > MAX_PACKET_LEN {
            return Err(StreamError::Validation(format!(
                "max_packet_len must be in 1..={MAX_PACKET_LEN}, got {}",
                self.max_packet_len
            )));
        }
        if self.range.is_empty() {
            return Err(StreamError::Validation(format!(
                "empty capture range {}..{}",
                self.range.start, self.range.end
            )));
        }
        if self.tick_budget == Some(0) {
            return Err(StreamError::Validation("tick_budget must be non-zero".into()));
        }
        Ok(())
    }
}
