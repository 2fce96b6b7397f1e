use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::debug;

use crate::capture::CaptureError;
use crate::constants::pcap::{LINKTYPE_ETHERNET, MAGIC_USEC, SNAPLEN, VERSION_MAJOR, VERSION_MINOR};

/// Legacy-pcap writer.
///
/// Every record carries a zero timestamp and `caplen == len`.
pub struct CaptureWriter<W: Write> {
    out: W,
    packets: u64,
    bytes: u64,
}

impl CaptureWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| CaptureError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "capture created");
        Self::new(BufWriter::new(file))
    }

    /// Flush and push the file contents to the storage device.
    pub fn finish_durable(self) -> Result<(), CaptureError> {
        let buffered = self.finish()?;
        let file = buffered.into_inner().map_err(|e| CaptureError::Io(e.into_error()))?;
        file.sync_data()?;
        Ok(())
    }
}

impl<W: Write> CaptureWriter<W> {
    /// Wrap `out` and emit the global header.
    pub fn new(mut out: W) -> Result<Self, CaptureError> {
        out.write_u32::<LittleEndian>(MAGIC_USEC)?;
        out.write_u16::<LittleEndian>(VERSION_MAJOR)?;
        out.write_u16::<LittleEndian>(VERSION_MINOR)?;
        out.write_i32::<LittleEndian>(0)?; // thiszone
        out.write_u32::<LittleEndian>(0)?; // sigfigs
        out.write_u32::<LittleEndian>(SNAPLEN)?;
        out.write_u32::<LittleEndian>(LINKTYPE_ETHERNET)?;
        Ok(Self { out, packets: 0, bytes: 0 })
    }

    pub fn write_packet(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let len = u32::try_from(data.len())
            .ok()
            .filter(|len| *len <= SNAPLEN)
            .ok_or(CaptureError::PacketTooLong { len: data.len(), snaplen: SNAPLEN })?;

        self.out.write_u32::<LittleEndian>(0)?; // ts_sec
        self.out.write_u32::<LittleEndian>(0)?; // ts_usec
        self.out.write_u32::<LittleEndian>(len)?;
        self.out.write_u32::<LittleEndian>(len)?;
        self.out.write_all(data)?;

        self.packets += 1;
        self.bytes += data.len() as u64;
        Ok(())
    }

    #[inline]
    pub fn packets_written(&self) -> u64 {
        self.packets
    }

    /// Payload bytes written, headers excluded.
    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W, CaptureError> {
        self.out.flush()?;
        debug!(packets = self.packets, bytes = self.bytes, "capture finished");
        Ok(self.out)
    }
}
