use std::collections::HashMap;
use std::net::Ipv4Addr;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::DEFAULT_RULE_CAPACITY;
use crate::parser::Metadata;

/// Decides the fate of one packet from its metadata. `true` means drop.
pub trait Classifier {
    fn classify(&mut self, metadata: &Metadata) -> bool;
}

/// Accepts rule-table commands arriving over the register interface.
pub trait RuleStore {
    fn execute(&mut self, opcode: RuleOpcode, data: &mut RuleData) -> RuleStatus;
}

/// Exact-match key: UDP 4-tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleKey {
    pub ip_source: Ipv4Addr,
    pub ip_dest: Ipv4Addr,
    pub udp_source: u16,
    pub udp_dest: u16,
}

impl RuleKey {
    /// Key for a UDP packet; `None` for anything else.
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        if !metadata.valid_udp() {
            return None;
        }
        Some(Self {
            ip_source: metadata.ip_source_addr(),
            ip_dest: metadata.ip_dest_addr(),
            udp_source: metadata.udp_source,
            udp_dest: metadata.udp_dest,
        })
    }
}

impl Default for RuleKey {
    fn default() -> Self {
        Self {
            ip_source: Ipv4Addr::UNSPECIFIED,
            ip_dest: Ipv4Addr::UNSPECIFIED,
            udp_source: 0,
            udp_dest: 0,
        }
    }
}

/// A rule as written in a rules file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub ip_source: Ipv4Addr,
    pub ip_dest: Ipv4Addr,
    pub udp_source: u16,
    pub udp_dest: u16,
    /// Decision for matching packets (`true` = drop).
    #[serde(default)]
    pub drop: bool,
}

impl Rule {
    pub fn key(&self) -> RuleKey {
        RuleKey {
            ip_source: self.ip_source,
            ip_dest: self.ip_dest,
            udp_source: self.udp_source,
            udp_dest: self.udp_dest,
        }
    }
}

/// Register-interface opcodes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum RuleOpcode {
    Nop    = 0,
    Add    = 1,
    Remove = 2,
    Query  = 3,
    Clear  = 4,
}

/// Register-interface status codes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum RuleStatus {
    Pending     = 0,
    Ok          = 1,
    NotFound    = 2,
    TableFull   = 3,
    Unsupported = 4,
}

/// Data half of the register block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleData {
    pub key: RuleKey,
    /// Add: decision to install. Query: decision found.
    pub result: bool,
    /// Raw `RuleStatus` code.
    pub status: u8,
}

/// Command/response registers shared between a host and the firewall.
///
/// The host writes `opcode` and `data`, then bumps `seq`; the firewall
/// executes the command on its next step, writes `data.status` and sets
/// `done`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleRegisters {
    pub opcode: u8,
    pub seq: u32,
    pub data: RuleData,
    pub done: bool,
}

impl RuleRegisters {
    /// Issue a new command.
    pub fn issue(&mut self, opcode: RuleOpcode, key: RuleKey, result: bool) {
        self.opcode = opcode.into();
        self.data = RuleData { key, result, status: RuleStatus::Pending.into() };
        self.seq = self.seq.wrapping_add(1);
        self.done = false;
    }

    /// Decoded status; unknown codes read as `Unsupported`.
    pub fn status(&self) -> RuleStatus {
        RuleStatus::try_from(self.data.status).unwrap_or(RuleStatus::Unsupported)
    }
}

/// Exact-match rule table with a default decision for misses.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: HashMap<RuleKey, bool>,
    capacity: usize,
    default_drop: bool,
    hits: u64,
    misses: u64,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(DEFAULT_RULE_CAPACITY, false)
    }
}

impl RuleTable {
    pub fn new(capacity: usize, default_drop: bool) -> Self {
        Self {
            rules: HashMap::with_capacity(capacity),
            capacity,
            default_drop,
            hits: 0,
            misses: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[inline]
    pub fn lookup(&self, key: &RuleKey) -> Option<bool> {
        self.rules.get(key).copied()
    }

    /// (hits, misses) since construction.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

impl Classifier for RuleTable {
    fn classify(&mut self, metadata: &Metadata) -> bool {
        let found = RuleKey::from_metadata(metadata).and_then(|key| self.lookup(&key));
        match found {
            Some(drop) => {
                self.hits += 1;
                drop
            }
            None => {
                self.misses += 1;
                self.default_drop
            }
        }
    }
}

impl RuleStore for RuleTable {
    fn execute(&mut self, opcode: RuleOpcode, data: &mut RuleData) -> RuleStatus {
        let status = match opcode {
            RuleOpcode::Nop => RuleStatus::Ok,
            RuleOpcode::Add => {
                if !self.rules.contains_key(&data.key) && self.rules.len() >= self.capacity {
                    RuleStatus::TableFull
                } else {
                    self.rules.insert(data.key, data.result);
                    RuleStatus::Ok
                }
            }
            RuleOpcode::Remove => match self.rules.remove(&data.key) {
                Some(_) => RuleStatus::Ok,
                None => RuleStatus::NotFound,
            },
            RuleOpcode::Query => match self.rules.get(&data.key) {
                Some(drop) => {
                    data.result = *drop;
                    RuleStatus::Ok
                }
                None => RuleStatus::NotFound,
            },
            RuleOpcode::Clear => {
                self.rules.clear();
                RuleStatus::Ok
            }
        };
        debug!(?opcode, key = ?data.key, ?status, "rule command executed");
        status
    }
}
