use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

use bytes::Bytes;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{create_reader, PcapBlockOwned, PcapError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capture::{CaptureError, CaptureRange};
use crate::constants::pcap::READ_BUFFER;

/// One packet accepted from a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPacket {
    /// Position among well-formed records, starting at 0.
    pub ordinal: u64,
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub data: Bytes,
}

/// Record counts seen by a reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureStats {
    /// Every packet record in the file.
    pub records: u64,
    /// Captured length differed from on-wire length.
    pub malformed: u64,
    /// Well-formed but outside the requested range.
    pub out_of_range: u64,
    /// Handed to the caller.
    pub forwarded: u64,
}

/// Streaming legacy-pcap reader.
///
/// Truncated records (captured length != on-wire length) are skipped and do
/// not take an ordinal. Well-formed records outside `range` are consumed and
/// counted but never returned. A pcapng file is recognised and refused with
/// `CaptureError::Unsupported`.
pub struct CaptureReader<R: Read> {
    reader: Box<dyn PcapReaderIterator>,
    _source: PhantomData<fn() -> R>,
    range: CaptureRange,
    next_ordinal: u64,
    snaplen: Option<u32>,
    stats: CaptureStats,
    done: bool,
}

impl CaptureReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P, range: CaptureRange) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CaptureError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "capture opened");
        Self::new(BufReader::new(file), range)
    }
}

impl<R: Read + 'static> CaptureReader<R> {
    pub fn new(reader: R, range: CaptureRange) -> Result<Self, CaptureError> {
        let reader = create_reader(READ_BUFFER, reader)
            .map_err(|e| CaptureError::Parse(format!("not a pcap file: {e:?}")))?;
        Ok(Self {
            reader,
            _source: PhantomData,
            range,
            next_ordinal: 0,
            snaplen: None,
            stats: CaptureStats::default(),
            done: false,
        })
    }
}

impl<R: Read> CaptureReader<R> {

    #[inline]
    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Snaplen from the global header, once it has been read.
    #[inline]
    pub fn snaplen(&self) -> Option<u32> {
        self.snaplen
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Next packet inside the range, or `None` at end of capture.
    pub fn next_packet(&mut self) -> Result<Option<CapturedPacket>, CaptureError> {
        while !self.done {
            let block = match self.reader.next() {
                Ok((offset, block)) => {
                    let record = match block {
                        PcapBlockOwned::LegacyHeader(ref header) => {
                            self.snaplen = Some(header.snaplen);
                            None
                        }
                        PcapBlockOwned::Legacy(ref pkt) => Some((
                            pkt.caplen,
                            pkt.origlen,
                            pkt.ts_sec,
                            pkt.ts_usec,
                            Bytes::copy_from_slice(pkt.data),
                        )),
                        PcapBlockOwned::NG(_) => {
                            warn!("pcapng capture refused");
                            return Err(CaptureError::Unsupported("pcapng"));
                        }
                    };
                    drop(block);
                    self.reader.consume(offset);
                    record
                }
                Err(PcapError::Eof) => {
                    self.done = true;
                    return Ok(None);
                }
                Err(PcapError::Incomplete(_)) => {
                    if self.reader.reader_exhausted() {
                        warn!("capture ends inside a record");
                        self.done = true;
                        return Ok(None);
                    }
                    self.reader
                        .refill()
                        .map_err(|e| CaptureError::Parse(format!("refill failed: {e:?}")))?;
                    continue;
                }
                Err(PcapError::UnexpectedEof) => {
                    warn!("capture ends inside a record");
                    self.done = true;
                    return Ok(None);
                }
                Err(e) => return Err(CaptureError::Parse(format!("{e:?}"))),
            };

            let Some((caplen, origlen, ts_sec, ts_usec, data)) = block else {
                continue;
            };
            self.stats.records += 1;

            if caplen != origlen {
                self.stats.malformed += 1;
                warn!(caplen, origlen, "skipping truncated capture record");
                continue;
            }

            let ordinal = self.next_ordinal;
            self.next_ordinal += 1;

            if !self.range.contains(ordinal) {
                self.stats.out_of_range += 1;
                continue;
            }

            self.stats.forwarded += 1;
            return Ok(Some(CapturedPacket { ordinal, ts_sec, ts_usec, data }));
        }
        Ok(None)
    }
}

impl<R: Read> Iterator for CaptureReader<R> {
    type Item = Result<CapturedPacket, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_packet().transpose()
    }
}
