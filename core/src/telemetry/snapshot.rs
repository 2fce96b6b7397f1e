//! telemetry/snapshot.rs
//! Immutable end-of-session view of counters and timers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub counters: TelemetryCounters,
    /// Forwarded packets over decided packets; 0 when nothing was decided.
    pub forward_ratio: f64,
    pub throughput_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
}

impl TelemetrySnapshot {
    pub fn from(counters: &TelemetryCounters, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();

        let decided = counters.packets_decided();
        let forward_ratio = if decided > 0 {
            counters.packets_forwarded as f64 / decided as f64
        } else {
            0.0
        };

        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_in as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            counters: counters.clone(),
            forward_ratio,
            throughput_bytes_per_sec: throughput,
            elapsed,
            stage_times: timer.stage_times.clone(),
        }
    }

    pub fn total_stage_time(&self) -> Duration {
        self.stage_times.total()
    }

    /// Internal consistency:
    /// - every packet read was either forwarded or dropped
    /// - forward ratio within [0, 1]
    /// - stage time does not exceed elapsed time
    pub fn sanity_check(&self) -> bool {
        let c = &self.counters;
        c.packets_read == c.packets_decided()
            && (0.0..=1.0).contains(&self.forward_ratio)
            && self.total_stage_time() <= self.elapsed
    }

    /// One-line human summary for logs.
    pub fn summary(&self) -> String {
        let c = &self.counters;
        format!(
            "read={} fwd={} drop={} malformed={} skipped={} beats={}/{} ticks={} elapsed={:?}",
            c.packets_read,
            c.packets_forwarded,
            c.packets_dropped,
            c.packets_malformed,
            c.packets_out_of_range,
            c.beats_encoded,
            c.beats_decoded,
            c.ticks,
            self.elapsed,
        )
    }
}
