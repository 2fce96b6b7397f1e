use std::fmt;
use thiserror::Error;

use crate::constants::{DEFAULT_BEAT_WIDTH, MAX_BEAT_WIDTH};

/// Per-byte validity mask of a beat.
///
/// Bit `i` set means byte `i` of the beat is packet data. Final beats use the
/// leading-valid / trailing-pad convention: exactly bits `0..k` are set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeepMask(u64);

impl KeepMask {
    /// Mask with no byte kept.
    pub const EMPTY: KeepMask = KeepMask(0);

    /// Mask covering the first `count` bytes. `count` saturates at 64.
    #[inline]
    pub const fn leading(count: usize) -> Self {
        if count >= 64 {
            KeepMask(u64::MAX)
        } else {
            KeepMask((1u64 << count) - 1)
        }
    }

    /// Every byte of a `width`-byte beat kept.
    #[inline]
    pub const fn full(width: usize) -> Self {
        Self::leading(width)
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        KeepMask(bits)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_set(self, byte: usize) -> bool {
        byte < 64 && (self.0 >> byte) & 1 == 1
    }

    /// Number of kept bytes, wherever they sit.
    #[inline]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Number of kept bytes before the first padding byte.
    #[inline]
    pub const fn leading_valid(self) -> usize {
        self.0.trailing_ones() as usize
    }

    /// True when the kept bytes form one run starting at byte 0.
    #[inline]
    pub const fn is_leading_contiguous(self) -> bool {
        self.0 & self.0.wrapping_add(1) == 0
    }
}

impl fmt::Debug for KeepMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeepMask({:#x})", self.0)
    }
}

/// One fixed-width chunk of a packet byte stream.
///
/// Invariants (checked by [`Beat::validate`]):
/// - `last == false` → every keep bit of the `W` bytes is set
/// - `last == true`  → keep holds `k` leading bits, `1 <= k <= W`
/// - padding bytes are zero when produced by the encoder
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Beat<const W: usize = DEFAULT_BEAT_WIDTH> {
    pub data: [u8; W],
    pub keep: KeepMask,
    pub last: bool,
}

impl<const W: usize> Beat<W> {
    const WIDTH_OK: () = assert!(W > 0 && W <= MAX_BEAT_WIDTH, "beat width must be 1..=64 bytes");

    /// Construct a fully-validated beat.
    pub fn new(data: [u8; W], keep: KeepMask, last: bool) -> Result<Self, BeatError> {
        let () = Self::WIDTH_OK;
        let beat = Beat { data, keep, last };
        beat.validate()?;
        Ok(beat)
    }

    /// Non-final beat carrying `W` packet bytes.
    ///
    /// Caller guarantees `chunk.len() == W`.
    pub(crate) fn body(chunk: &[u8]) -> Self {
        let () = Self::WIDTH_OK;
        debug_assert_eq!(chunk.len(), W);
        let mut data = [0u8; W];
        data.copy_from_slice(chunk);
        Beat { data, keep: KeepMask::full(W), last: false }
    }

    /// Final beat carrying `1..=W` packet bytes, zero padded.
    pub(crate) fn tail(chunk: &[u8]) -> Self {
        let () = Self::WIDTH_OK;
        debug_assert!(!chunk.is_empty() && chunk.len() <= W);
        let mut data = [0u8; W];
        data[..chunk.len()].copy_from_slice(chunk);
        Beat { data, keep: KeepMask::leading(chunk.len()), last: true }
    }

    /// Check the keep/last invariants and return the valid byte count.
    pub fn validate(&self) -> Result<usize, BeatError> {
        let full = KeepMask::full(W);
        if !self.last {
            if self.keep != full {
                return Err(BeatError::TruncatedBeat { keep: self.keep.bits() });
            }
            return Ok(W);
        }

        let extra = self.keep.bits() & !full.bits();
        if self.keep == KeepMask::EMPTY || extra != 0 || !self.keep.is_leading_contiguous() {
            return Err(BeatError::InvalidKeep { keep: self.keep.bits(), width: W });
        }
        Ok(self.keep.leading_valid())
    }

    /// Count of leading valid bytes.
    #[inline]
    pub fn valid_len(&self) -> usize {
        self.keep.leading_valid().min(W)
    }

    /// The packet bytes carried by this beat.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.valid_len()]
    }

    /// Produce a concise debug summary of the beat
    pub fn summary(&self) -> String {
        format!(
            "Beat {{ width: {}, keep: {:#x}, last: {}, data: {} }}",
            W,
            self.keep.bits(),
            self.last,
            hex::encode(self.payload()),
        )
    }
}

impl<const W: usize> fmt::Debug for Beat<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// A beat tagged with its 0-based position inside its packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedBeat<const W: usize = DEFAULT_BEAT_WIDTH> {
    pub index: u32,
    pub beat: Beat<W>,
}

/// Anything carried on a stream that can close a packet.
pub trait Flit {
    fn is_last(&self) -> bool;
}

impl<const W: usize> Flit for Beat<W> {
    #[inline]
    fn is_last(&self) -> bool {
        self.last
    }
}

impl<const W: usize> Flit for IndexedBeat<W> {
    #[inline]
    fn is_last(&self) -> bool {
        self.beat.last
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BeatError {
    #[error("empty packet cannot be encoded")]
    EmptyPacket,

    #[error("packet of {len} bytes exceeds maximum of {max}")]
    PacketTooLong { len: usize, max: usize },

    #[error("non-final beat with partial keep mask {keep:#x}")]
    TruncatedBeat { keep: u64 },

    #[error("final beat keep mask {keep:#x} is not 1..={width} leading bytes")]
    InvalidKeep { keep: u64, width: usize },

    #[error("stream ended inside a packet ({buffered} bytes buffered)")]
    IncompletePacket { buffered: usize },

    #[error("encoder is still emitting the previous packet")]
    EncoderBusy,
}
