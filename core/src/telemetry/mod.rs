//! telemetry/mod.rs
//! Session telemetry: counters, stage timers and immutable snapshots.
//!
//! Counters live in the session that owns the stages; a snapshot is taken
//! once the session drains and is what callers (and `--report`) see.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
