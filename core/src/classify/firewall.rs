use tracing::{debug, trace, warn};

use crate::beat::Beat;
use crate::classify::rules::{Classifier, RuleOpcode, RuleRegisters, RuleStatus, RuleStore, RuleTable};
use crate::dataflow::Stream;
use crate::parser::{FieldLayout, Metadata, Pipeline};
use crate::types::StreamError;

/// Classification stage.
///
/// Beats from `input` are copied into an internal parser pipeline and
/// forwarded to `output`. The last beat of each packet is held back until the
/// packet's metadata has been classified and its decision written, so a
/// decoder downstream always finds the decision when the packet completes.
#[derive(Debug)]
pub struct Firewall<const W: usize, C = RuleTable> {
    parser: Pipeline<W>,
    parser_in: Stream<Beat<W>>,
    classifier: C,
    held: Option<Beat<W>>,
    decided: bool,
    seen_seq: u32,
    last_metadata: Option<Metadata>,
}

impl<const W: usize> Firewall<W, RuleTable> {
    pub fn with_rule_table(table: RuleTable, depth: usize) -> Self {
        Self::new(table, FieldLayout::default(), depth)
    }
}

impl<const W: usize, C> Firewall<W, C>
where
    C: Classifier + RuleStore,
{
    pub fn new(classifier: C, layout: FieldLayout, depth: usize) -> Self {
        Self {
            parser: Pipeline::with_layout(layout, depth),
            parser_in: Stream::new("parser_in", depth),
            classifier,
            held: None,
            decided: false,
            seen_seq: 0,
            last_metadata: None,
        }
    }

    #[inline]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Metadata of the most recently classified packet.
    #[inline]
    pub fn last_metadata(&self) -> Option<&Metadata> {
        self.last_metadata.as_ref()
    }

    /// Nothing held, nothing in flight inside the parser.
    pub fn is_idle(&self) -> bool {
        self.held.is_none()
            && self.parser_in.is_empty()
            && self.parser.is_idle()
            && self.parser.out().is_empty()
    }

    /// Execute a newly issued register command, if any.
    fn service_registers(&mut self, regs: &mut RuleRegisters) -> bool {
        if regs.seq == self.seen_seq {
            return false;
        }
        self.seen_seq = regs.seq;

        let status = match RuleOpcode::try_from(regs.opcode) {
            Ok(opcode) => self.classifier.execute(opcode, &mut regs.data),
            Err(_) => {
                warn!(opcode = regs.opcode, "unknown rule opcode");
                RuleStatus::Unsupported
            }
        };
        regs.data.status = status.into();
        regs.done = true;
        true
    }

    /// Produce the decision for the held packet, if its metadata is ready.
    fn decide(&mut self, decisions: &Stream<bool>) -> Result<bool, StreamError> {
        if decisions.is_full() {
            return Ok(false);
        }
        let Some(metadata) = self.parser.out().try_read() else {
            return Ok(false);
        };

        let drop = self.classifier.classify(&metadata);
        trace!(%metadata, drop, "packet classified");
        decisions
            .try_write(drop)
            .map_err(|_| StreamError::StreamFull { stream: decisions.name() })?;

        self.last_metadata = Some(metadata);
        self.decided = true;
        Ok(true)
    }

    /// One tick of the stage.
    ///
    /// Consumes at most one beat from `input`, writes at most one beat to
    /// `output` and at most one decision to `decisions`.
    pub fn step(
        &mut self,
        input: &Stream<Beat<W>>,
        output: &Stream<Beat<W>>,
        decisions: &Stream<bool>,
        regs: &mut RuleRegisters,
    ) -> Result<bool, StreamError> {
        let mut progressed = self.service_registers(regs);
        progressed |= self.parser.step(&self.parser_in);

        if let Some(beat) = self.held {
            if !self.decided {
                progressed |= self.decide(decisions)?;
            }
            if self.decided && output.try_write(beat).is_ok() {
                self.held = None;
                self.decided = false;
                progressed = true;
            }
            return Ok(progressed);
        }

        if input.is_empty() || output.is_full() || self.parser_in.is_full() {
            return Ok(progressed);
        }
        let Some(beat) = input.try_read() else {
            return Ok(progressed);
        };

        self.parser_in
            .try_write(beat)
            .map_err(|_| StreamError::StreamFull { stream: self.parser_in.name() })?;

        if beat.last {
            self.held = Some(beat);
        } else {
            output
                .try_write(beat)
                .map_err(|_| StreamError::StreamFull { stream: output.name() })?;
        }
        Ok(true)
    }

    /// Run one register command to completion, stepping with empty streams.
    ///
    /// The command must finish within `budget` ticks and report `Ok`.
    pub fn command(
        &mut self,
        regs: &mut RuleRegisters,
        idle_in: &Stream<Beat<W>>,
        idle_out: &Stream<Beat<W>>,
        idle_decisions: &Stream<bool>,
        budget: u64,
    ) -> Result<RuleStatus, StreamError> {
        for _ in 0..budget {
            self.step(idle_in, idle_out, idle_decisions, regs)?;
            if regs.done {
                let status = regs.status();
                debug!(?status, "rule command done");
                return Ok(status);
            }
        }
        Err(StreamError::RuleCommand(format!(
            "command {} not done after {budget} ticks",
            regs.opcode
        )))
    }
}
