//! Reference classification stage.
//!
//! Sits between the beat codec's encoder and decoder: parses each packet's
//! headers, asks a `Classifier` whether to drop it, and emits one decision
//! per packet aligned with the forwarded beats. Rule tables are loaded over
//! a small command/response register interface.

pub mod rules;
pub mod firewall;

pub use rules::{
    Classifier,
    Rule,
    RuleData,
    RuleKey,
    RuleOpcode,
    RuleRegisters,
    RuleStatus,
    RuleStore,
    RuleTable,
};
pub use firewall::Firewall;
