use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::beat::types::{Beat, BeatError};
use crate::constants::MAX_PACKET_LEN;
use crate::dataflow::Stream;
use crate::types::StreamError;

/// What one decoder step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// Input was empty.
    Idle,
    /// A non-final beat was buffered.
    Buffered,
    /// A packet completed and its decision was "forward".
    Forwarded(Bytes),
    /// A packet completed and its decision was "drop".
    Dropped { len: usize },
}

/// Reassembles packets from beats, keeping or discarding each one according
/// to a parallel stream of drop decisions (`true` = drop).
#[derive(Debug)]
pub struct Decoder<const W: usize> {
    buffer: BytesMut,
    max_len: usize,
    beats_consumed: u64,
}

impl<const W: usize> Default for Decoder<W> {
    fn default() -> Self {
        Self::new(MAX_PACKET_LEN)
    }
}

impl<const W: usize> Decoder<W> {
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_len.min(MAX_PACKET_LEN)),
            max_len,
            beats_consumed: 0,
        }
    }

    /// Bytes of the packet currently being reassembled.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn beats_consumed(&self) -> u64 {
        self.beats_consumed
    }

    /// Drop the partial packet after a fatal error.
    fn abort(&mut self, err: impl Into<StreamError>) -> StreamError {
        self.buffer.clear();
        err.into()
    }

    /// Consume at most one beat.
    ///
    /// Errors are fatal: a truncated non-final beat, an invalid final keep
    /// mask, an oversized packet, or a packet completing with no decision.
    /// The partial packet is discarded with the error.
    pub fn step(
        &mut self,
        input: &Stream<Beat<W>>,
        drops: &Stream<bool>,
    ) -> Result<DecodeEvent, StreamError> {
        let Some(beat) = input.try_read() else {
            return Ok(DecodeEvent::Idle);
        };
        self.beats_consumed += 1;

        let valid = beat.validate().map_err(|e| self.abort(e))?;
        let len = self.buffer.len() + valid;
        if len > self.max_len {
            return Err(self.abort(BeatError::PacketTooLong { len, max: self.max_len }));
        }
        self.buffer.extend_from_slice(&beat.data[..valid]);

        if !beat.last {
            return Ok(DecodeEvent::Buffered);
        }

        let Some(drop) = drops.try_read() else {
            return Err(self.abort(StreamError::ClassificationUnderrun { len }));
        };

        let packet = self.buffer.split().freeze();
        debug_assert!(self.buffer.is_empty());

        if drop {
            debug!(len, "packet dropped");
            Ok(DecodeEvent::Dropped { len })
        } else {
            debug!(len, "packet forwarded");
            Ok(DecodeEvent::Forwarded(packet))
        }
    }

    /// Assert the stream ended on a packet boundary.
    pub fn finish(&self) -> Result<(), BeatError> {
        if !self.buffer.is_empty() {
            debug!(buffered = self.buffer.len(), "decoder finished mid-packet");
            return Err(BeatError::IncompletePacket { buffered: self.buffer.len() });
        }
        Ok(())
    }
}

/// Decode a beat slice with every decision `false` (forward).
pub fn decode_all<const W: usize>(beats: &[Beat<W>]) -> Result<Vec<Bytes>, StreamError> {
    let mut packets = Vec::new();
    let mut buffer = BytesMut::new();

    for beat in beats {
        let valid = beat.validate()?;
        buffer.extend_from_slice(&beat.data[..valid]);
        if beat.last {
            packets.push(buffer.split().freeze());
        }
    }

    if !buffer.is_empty() {
        return Err(BeatError::IncompletePacket { buffered: buffer.len() }.into());
    }
    Ok(packets)
}
