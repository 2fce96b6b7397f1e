//! Beat codec.
//!
//! Responsibilities:
//! - Define the beat value type and its keep/last invariants
//! - Encode packets into beats
//! - Decode beats back into packets, honouring drop decisions
//!
//! Non-responsibilities:
//! - Header parsing
//! - Capture I/O
//! - Scheduling

pub mod types;
pub mod encode;
pub mod decode;

pub use types::{
    Beat,
    BeatError,
    Flit,
    IndexedBeat,
    KeepMask,
};
pub use encode::{
    beat_count,
    encode_into,
    encode_packet,
    BeatIter,
    Encoder,
};
pub use decode::{
    decode_all,
    DecodeEvent,
    Decoder,
};
