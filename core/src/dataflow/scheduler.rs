//! Tick scheduler.
//!
//! Drives a set of stages by invoking one closure per tick until the closure
//! reports the work has drained, or the tick budget runs out.

use serde::{Deserialize, Serialize};

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Some stage still has work.
    Busy,
    /// Every stage is idle and every stream is empty.
    Idle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Ticks executed, including the one that reported idle.
    pub ticks: u64,
    /// Whether the work drained inside the budget.
    pub drained: bool,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    budget: Option<u64>,
    ticks: u64,
}

impl Scheduler {
    /// `None` means no budget: run until idle.
    pub fn new(budget: Option<u64>) -> Self {
        Self { budget, ticks: 0 }
    }

    /// Ticks executed so far, across every `run` call.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run ticks until `tick` reports [`Tick::Idle`] or the budget is used up.
    ///
    /// Errors from `tick` abort the run immediately.
    pub fn run<E, F>(&mut self, mut tick: F) -> Result<TickReport, E>
    where
        F: FnMut(u64) -> Result<Tick, E>,
    {
        let start = self.ticks;
        loop {
            if let Some(budget) = self.budget {
                if self.ticks - start >= budget {
                    return Ok(TickReport { ticks: self.ticks - start, drained: false });
                }
            }

            let state = tick(self.ticks)?;
            self.ticks += 1;

            if state == Tick::Idle {
                return Ok(TickReport { ticks: self.ticks - start, drained: true });
            }
        }
    }
}
