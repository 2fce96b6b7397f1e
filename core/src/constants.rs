/// Default beat width in bytes (one 256-bit bus word).
pub const DEFAULT_BEAT_WIDTH: usize = 32;
/// Widest beat a `KeepMask` can describe (one bit per byte in a `u64`).
pub const MAX_BEAT_WIDTH: usize = 64;

/// Defaults when a config field is not supplied
pub const DEFAULT_STREAM_DEPTH: usize = 16;
/// Largest packet the codec will carry (classic pcap snaplen).
pub const MAX_PACKET_LEN: usize = 65_535;
/// Rule table slots available to the reference firewall.
pub const DEFAULT_RULE_CAPACITY: usize = 256;
/// Ticks allowed for one register command to complete.
pub const RULE_COMMAND_TICKS: u64 = 15;

/// EtherType values (mirrored in `Metadata::valid_ip`).
///
/// See: https://www.iana.org/assignments/ieee-802-numbers/ieee-802-numbers.xhtml.
pub mod ether_types {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16  = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const IPV6: u16 = 0x86dd;
}

/// IP protocol numbers.
pub mod ip_protocols {
    pub const ICMP: u8 = 1;
    pub const TCP: u8  = 6;
    pub const UDP: u8  = 17;
}

/// Legacy pcap container constants.
pub mod pcap {
    /// Microsecond-resolution magic, written little-endian.
    pub const MAGIC_USEC: u32       = 0xa1b2_c3d4;
    pub const VERSION_MAJOR: u16    = 2;
    pub const VERSION_MINOR: u16    = 4;
    pub const SNAPLEN: u32          = 65_535;
    pub const LINKTYPE_ETHERNET: u32 = 1;
    /// Global header length in bytes.
    pub const GLOBAL_HEADER_LEN: usize = 24;
    /// Per-record header length in bytes.
    pub const RECORD_HEADER_LEN: usize = 16;
    /// Read buffer handed to the pcap-parser reader; holds a full-snaplen record.
    pub const READ_BUFFER: usize = 1 << 17;
}
