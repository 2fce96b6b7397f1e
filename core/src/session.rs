//! End-to-end sessions over a capture.
//!
//! ## Filter
//! capture → Encoder → Firewall → Decoder → capture writer
//!
//! ## Inspect
//! capture → Encoder → Pipeline → callback
//!
//! Both are driven by a `Scheduler`: every tick steps each stage once, in
//! pipeline order, and the run ends when the capture is exhausted and every
//! stream has drained.

use std::collections::VecDeque;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::beat::{Beat, DecodeEvent, Decoder, Encoder};
use crate::capture::{CaptureReader, CaptureWriter, CapturedPacket};
use crate::classify::{Firewall, Rule, RuleOpcode, RuleRegisters, RuleStatus, RuleTable};
use crate::config::PipelineConfig;
use crate::constants::{DEFAULT_BEAT_WIDTH, RULE_COMMAND_TICKS};
use crate::dataflow::{Scheduler, Stream, Tick};
use crate::parser::{FieldLayout, Metadata, Pipeline};
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::StreamError;

// -----------------------------------------------------------------------------
// Shared
// -----------------------------------------------------------------------------

/// Pull the next packet the encoder can carry.
///
/// Zero-length records and records longer than `max_len` cannot be carried
/// as beats; they are skipped and counted as malformed.
fn next_loadable<R: Read>(
    reader: &mut CaptureReader<R>,
    max_len: usize,
    counters: &mut TelemetryCounters,
) -> Result<Option<CapturedPacket>, StreamError> {
    while let Some(packet) = reader.next_packet()? {
        if packet.data.is_empty() {
            warn!(ordinal = packet.ordinal, "skipping empty capture record");
            counters.packets_malformed += 1;
            continue;
        }
        if packet.data.len() > max_len {
            warn!(ordinal = packet.ordinal, len = packet.data.len(), max_len, "skipping oversized capture record");
            counters.packets_malformed += 1;
            continue;
        }
        return Ok(Some(packet));
    }
    Ok(None)
}

fn stalled(ticks: u64) -> StreamError {
    warn!(ticks, "session did not drain within its tick budget");
    StreamError::Stalled { ticks }
}

// -----------------------------------------------------------------------------
// Filter
// -----------------------------------------------------------------------------

/// Classify every packet of a capture and write the survivors.
#[derive(Debug, Clone)]
pub struct FilterSession<const W: usize = DEFAULT_BEAT_WIDTH> {
    config: PipelineConfig,
    rules: Vec<Rule>,
}

impl<const W: usize> FilterSession<W> {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, rules: Vec::new() }
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Filter `input` into `output` and sync the output file.
    ///
    /// On error the partially written output file is removed.
    pub fn run_files(&self, input: &Path, output: &Path) -> Result<TelemetrySnapshot, StreamError> {
        let mut reader = CaptureReader::open(input, self.config.range)?;
        let mut writer = CaptureWriter::create(output)?;
        let result = self.run(&mut reader, &mut writer).and_then(|snapshot| {
            writer.finish_durable()?;
            Ok(snapshot)
        });
        match result {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                if let Err(rm) = fs::remove_file(output) {
                    warn!(path = %output.display(), error = %rm, "cannot remove partial output");
                }
                Err(e)
            }
        }
    }

    /// Install every rule through the register interface.
    fn install_rules(
        &self,
        firewall: &mut Firewall<W>,
        regs: &mut RuleRegisters,
        input: &Stream<Beat<W>>,
        output: &Stream<Beat<W>>,
        decisions: &Stream<bool>,
    ) -> Result<(), StreamError> {
        for rule in &self.rules {
            regs.issue(RuleOpcode::Add, rule.key(), rule.drop);
            let status = firewall.command(regs, input, output, decisions, RULE_COMMAND_TICKS)?;
            if status != RuleStatus::Ok {
                return Err(StreamError::RuleCommand(format!(
                    "adding {}:{} -> {}:{} returned {status:?}",
                    rule.ip_source, rule.udp_source, rule.ip_dest, rule.udp_dest
                )));
            }
        }
        debug!(rules = self.rules.len(), "rules installed");
        Ok(())
    }

    /// Run the session. The writer is left open; the caller finishes it.
    pub fn run<R: Read, O: Write>(
        &self,
        reader: &mut CaptureReader<R>,
        writer: &mut CaptureWriter<O>,
    ) -> Result<TelemetrySnapshot, StreamError> {
        self.config.validate()?;
        let depth = self.config.stream_depth;
        let max_len = self.config.max_packet_len;

        let mut timer = TelemetryTimer::new();
        let mut counters = TelemetryCounters::default();

        let encoded: Stream<Beat<W>> = Stream::new("encoded", depth);
        let classified: Stream<Beat<W>> = Stream::new("classified", depth);
        let decisions: Stream<bool> = Stream::new("decisions", depth);

        let mut encoder = Encoder::<W>::new(max_len);
        let mut decoder = Decoder::<W>::new(max_len);
        let table = RuleTable::new(self.config.rule_capacity, self.config.default_drop);
        let mut firewall = Firewall::<W>::with_rule_table(table, depth);
        let mut regs = RuleRegisters::default();

        self.install_rules(&mut firewall, &mut regs, &encoded, &classified, &decisions)?;

        let mut capture_done = false;
        let mut scheduler = Scheduler::new(self.config.tick_budget);

        let report = scheduler.run(|_| -> Result<Tick, StreamError> {
            // ---- Read ----
            if encoder.is_idle() && !capture_done {
                let next = timer.time(Stage::Read, || next_loadable(reader, max_len, &mut counters))?;
                match next {
                    Some(packet) => {
                        counters.add_packet_in(packet.data.len());
                        encoder.load(packet.data)?;
                    }
                    None => capture_done = true,
                }
            }

            // ---- Encode ----
            if timer.time(Stage::Encode, || encoder.step(&encoded)) {
                counters.add_beat_encoded();
            }

            // ---- Classify ----
            timer.time(Stage::Classify, || {
                firewall.step(&encoded, &classified, &decisions, &mut regs)
            })?;

            // ---- Decode / Write ----
            match timer.time(Stage::Decode, || decoder.step(&classified, &decisions))? {
                DecodeEvent::Idle => {}
                DecodeEvent::Buffered => counters.add_beat_decoded(),
                DecodeEvent::Dropped { .. } => {
                    counters.add_beat_decoded();
                    counters.add_dropped();
                }
                DecodeEvent::Forwarded(packet) => {
                    counters.add_beat_decoded();
                    timer.time(Stage::Write, || writer.write_packet(&packet))?;
                    counters.add_forwarded(packet.len());
                }
            }

            let drained = capture_done
                && encoder.is_idle()
                && encoded.is_empty()
                && firewall.is_idle()
                && classified.is_empty()
                && decisions.is_empty()
                && decoder.buffered() == 0;
            Ok(if drained { Tick::Idle } else { Tick::Busy })
        })?;

        if !report.drained {
            return Err(stalled(report.ticks));
        }
        decoder.finish()?;

        let (hits, misses) = firewall.classifier().stats();
        counters.metadata_records = hits + misses;
        counters.ticks = report.ticks;
        counters.merge_capture(&reader.stats());
        timer.finish();

        let snapshot = TelemetrySnapshot::from(&counters, &timer);
        info!(summary = %snapshot.summary(), "filter session done");
        Ok(snapshot)
    }
}

// -----------------------------------------------------------------------------
// Inspect
// -----------------------------------------------------------------------------

/// Parse every packet of a capture and report its metadata.
#[derive(Debug, Clone)]
pub struct InspectSession<const W: usize = DEFAULT_BEAT_WIDTH> {
    config: PipelineConfig,
    layout: FieldLayout,
}

impl<const W: usize> InspectSession<W> {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, layout: FieldLayout::default() }
    }

    pub fn with_layout(mut self, layout: FieldLayout) -> Self {
        self.layout = layout;
        self
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run_file<F>(&self, input: &Path, on_metadata: F) -> Result<TelemetrySnapshot, StreamError>
    where
        F: FnMut(u64, &Metadata),
    {
        let mut reader = CaptureReader::open(input, self.config.range)?;
        self.run(&mut reader, on_metadata)
    }

    /// Run the session, calling `on_metadata(ordinal, metadata)` once per
    /// packet in capture order.
    pub fn run<R, F>(&self, reader: &mut CaptureReader<R>, mut on_metadata: F) -> Result<TelemetrySnapshot, StreamError>
    where
        R: Read,
        F: FnMut(u64, &Metadata),
    {
        self.config.validate()?;
        let depth = self.config.stream_depth;
        let max_len = self.config.max_packet_len;

        let mut timer = TelemetryTimer::new();
        let mut counters = TelemetryCounters::default();

        let encoded: Stream<Beat<W>> = Stream::new("encoded", depth);
        let mut encoder = Encoder::<W>::new(max_len);
        let mut pipeline = Pipeline::<W>::with_layout(self.layout.clone(), depth);
        let mut ordinals: VecDeque<u64> = VecDeque::new();

        let mut capture_done = false;
        let mut scheduler = Scheduler::new(self.config.tick_budget);

        let report = scheduler.run(|_| -> Result<Tick, StreamError> {
            if encoder.is_idle() && !capture_done {
                let next = timer.time(Stage::Read, || next_loadable(reader, max_len, &mut counters))?;
                match next {
                    Some(packet) => {
                        counters.add_packet_in(packet.data.len());
                        ordinals.push_back(packet.ordinal);
                        encoder.load(packet.data)?;
                    }
                    None => capture_done = true,
                }
            }

            if timer.time(Stage::Encode, || encoder.step(&encoded)) {
                counters.add_beat_encoded();
            }

            timer.time(Stage::Classify, || pipeline.step(&encoded));

            if let Some(metadata) = pipeline.out().try_read() {
                counters.add_metadata();
                let ordinal = ordinals.pop_front().ok_or_else(|| {
                    StreamError::Validation("metadata record without a packet".into())
                })?;
                on_metadata(ordinal, &metadata);
            }

            let drained = capture_done
                && encoder.is_idle()
                && encoded.is_empty()
                && pipeline.is_idle()
                && pipeline.out().is_empty();
            Ok(if drained { Tick::Idle } else { Tick::Busy })
        })?;

        if !report.drained {
            return Err(stalled(report.ticks));
        }

        counters.ticks = report.ticks;
        counters.merge_capture(&reader.stats());
        timer.finish();

        let snapshot = TelemetrySnapshot::from(&counters, &timer);
        info!(records = counters.metadata_records, "inspect session done");
        Ok(snapshot)
    }
}
