//! Step-driven dataflow primitives.
//!
//! Responsibilities:
//! - Bounded, non-blocking streams between stages
//! - Per-packet beat numbering
//! - Per-packet streaming folds
//! - A tick scheduler with an explicit budget
//!
//! Non-responsibilities:
//! - Threads (everything here is single-threaded and cooperative)
//! - Header semantics

pub mod fifo;
pub mod enumerate;
pub mod fold;
pub mod scheduler;

pub use fifo::{Stream, link};
pub use enumerate::Enumerator;
pub use fold::Fold;
pub use scheduler::{Scheduler, Tick, TickReport};
