//! telemetry/counters.rs
//! Mutable counters updated while a session runs.
//!
//! Converted into an immutable `TelemetrySnapshot` when the session ends.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::capture::CaptureStats;

/// Deterministic counters collected during a session.
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub packets_read: u64,
    pub packets_malformed: u64,
    pub packets_out_of_range: u64,
    pub packets_forwarded: u64,
    pub packets_dropped: u64,
    pub beats_encoded: u64,
    pub beats_decoded: u64,
    pub metadata_records: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub ticks: u64,
}

impl TelemetryCounters {
    /// Record one packet loaded into the encoder.
    pub fn add_packet_in(&mut self, len: usize) {
        self.packets_read += 1;
        self.bytes_in += len as u64;
    }

    /// Record one packet written to the output capture.
    pub fn add_forwarded(&mut self, len: usize) {
        self.packets_forwarded += 1;
        self.bytes_out += len as u64;
    }

    pub fn add_dropped(&mut self) {
        self.packets_dropped += 1;
    }

    pub fn add_beat_encoded(&mut self) {
        self.beats_encoded += 1;
    }

    pub fn add_beat_decoded(&mut self) {
        self.beats_decoded += 1;
    }

    pub fn add_metadata(&mut self) {
        self.metadata_records += 1;
    }

    /// Fold in what the capture reader skipped.
    pub fn merge_capture(&mut self, stats: &CaptureStats) {
        self.packets_malformed += stats.malformed;
        self.packets_out_of_range += stats.out_of_range;
    }

    /// Packets that reached a decision.
    pub fn packets_decided(&self) -> u64 {
        self.packets_forwarded + self.packets_dropped
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        *self += other.clone();
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.packets_read         += rhs.packets_read;
        self.packets_malformed    += rhs.packets_malformed;
        self.packets_out_of_range += rhs.packets_out_of_range;
        self.packets_forwarded    += rhs.packets_forwarded;
        self.packets_dropped      += rhs.packets_dropped;

        self.beats_encoded        += rhs.beats_encoded;
        self.beats_decoded        += rhs.beats_decoded;
        self.metadata_records     += rhs.metadata_records;

        self.bytes_in             += rhs.bytes_in;
        self.bytes_out            += rhs.bytes_out;
        self.ticks                += rhs.ticks;
    }
}
