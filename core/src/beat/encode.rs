use bytes::Bytes;
use tracing::trace;

use crate::beat::types::{Beat, BeatError};
use crate::constants::MAX_PACKET_LEN;
use crate::dataflow::Stream;
use crate::types::StreamError;

fn check_len(len: usize, max: usize) -> Result<(), BeatError> {
    if len == 0 {
        return Err(BeatError::EmptyPacket);
    }
    if len > max {
        return Err(BeatError::PacketTooLong { len, max });
    }
    Ok(())
}

/// Number of beats a packet of `len` bytes occupies.
#[inline]
pub const fn beat_count(len: usize, width: usize) -> usize {
    len.div_ceil(width)
}

/// Lazy packet → beat conversion.
///
/// Yields `ceil(L / W)` beats; only the last one has `last` set.
#[derive(Debug, Clone)]
pub struct BeatIter<'a, const W: usize> {
    rest: &'a [u8],
}

impl<'a, const W: usize> BeatIter<'a, W> {
    pub fn new(packet: &'a [u8]) -> Result<Self, BeatError> {
        check_len(packet.len(), MAX_PACKET_LEN)?;
        Ok(Self { rest: packet })
    }
}

impl<'a, const W: usize> Iterator for BeatIter<'a, W> {
    type Item = Beat<W>;

    fn next(&mut self) -> Option<Beat<W>> {
        if self.rest.is_empty() {
            return None;
        }
        if self.rest.len() > W {
            let (chunk, rest) = self.rest.split_at(W);
            self.rest = rest;
            Some(Beat::body(chunk))
        } else {
            let chunk = std::mem::take(&mut self.rest);
            Some(Beat::tail(chunk))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = beat_count(self.rest.len(), W);
        (n, Some(n))
    }
}

impl<const W: usize> ExactSizeIterator for BeatIter<'_, W> {}

/// Encode a whole packet into beats.
pub fn encode_packet<const W: usize>(packet: &[u8]) -> Result<Vec<Beat<W>>, BeatError> {
    Ok(BeatIter::<W>::new(packet)?.collect())
}

/// Append every beat of `packet` to `out`.
///
/// Nothing is written unless the stream has room for the whole packet, so a
/// `StreamFull` error leaves the stream untouched and the call can be retried.
pub fn encode_into<const W: usize>(
    packet: &[u8],
    out: &Stream<Beat<W>>,
) -> Result<usize, StreamError> {
    let beats = BeatIter::<W>::new(packet)?;
    let needed = beats.len();
    if out.remaining() < needed {
        return Err(StreamError::StreamFull { stream: out.name() });
    }
    for beat in beats {
        out.try_write(beat)
            .map_err(|_| StreamError::StreamFull { stream: out.name() })?;
    }
    Ok(needed)
}

/// Step-driven encoder: one packet loaded at a time, one beat per step.
#[derive(Debug)]
pub struct Encoder<const W: usize> {
    current: Option<Bytes>,
    offset: usize,
    max_len: usize,
    beats_emitted: u64,
}

impl<const W: usize> Default for Encoder<W> {
    fn default() -> Self {
        Self::new(MAX_PACKET_LEN)
    }
}

impl<const W: usize> Encoder<W> {
    pub fn new(max_len: usize) -> Self {
        Self { current: None, offset: 0, max_len, beats_emitted: 0 }
    }

    /// True when no packet is in flight and `load` will accept one.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    /// Total beats written since construction.
    #[inline]
    pub fn beats_emitted(&self) -> u64 {
        self.beats_emitted
    }

    /// Start emitting `packet`.
    pub fn load(&mut self, packet: Bytes) -> Result<(), BeatError> {
        if !self.is_idle() {
            return Err(BeatError::EncoderBusy);
        }
        check_len(packet.len(), self.max_len)?;
        self.current = Some(packet);
        self.offset = 0;
        Ok(())
    }

    /// Emit at most one beat. Returns `true` if a beat was written.
    pub fn step(&mut self, out: &Stream<Beat<W>>) -> bool {
        let Some(packet) = self.current.as_ref() else {
            return false;
        };
        if out.is_full() {
            return false;
        }

        let rest = &packet[self.offset..];
        let beat = if rest.len() > W {
            Beat::body(&rest[..W])
        } else {
            Beat::tail(rest)
        };

        if out.try_write(beat).is_err() {
            return false;
        }
        self.beats_emitted += 1;

        if beat.last {
            trace!(len = packet.len(), "packet encoded");
            self.current = None;
            self.offset = 0;
        } else {
            self.offset += W;
        }
        true
    }
}
