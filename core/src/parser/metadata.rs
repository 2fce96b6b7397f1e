use std::fmt;
use std::net::Ipv4Addr;

use crate::constants::{ether_types, ip_protocols};
use crate::parser::fields::HeaderField;

bitflags::bitflags! {
    /// Header fields whose every byte has been read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HeaderFields: u8 {
        const ETHER_TYPE  = 0b0000_0001;
        const IP_PROTOCOL = 0b0000_0010;
        const IP_SOURCE   = 0b0000_0100;
        const IP_DEST     = 0b0000_1000;
        const UDP_SOURCE  = 0b0001_0000;
        const UDP_DEST    = 0b0010_0000;
    }
}

/// Per-packet header summary.
///
/// Starts all-zero; fields not covered by the packet's bytes keep their zero
/// default and stay out of `fields`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Metadata {
    pub ether_type: u16,
    pub ip_protocol: u8,
    pub ip_source: u32,
    pub ip_dest: u32,
    pub udp_source: u16,
    pub udp_dest: u16,
    pub fields: HeaderFields,
}

/// Replace byte `index` (0 = most significant) of a `width`-byte big-endian value.
#[inline]
fn splice(value: u32, width: usize, index: usize, byte: u8) -> u32 {
    debug_assert!(index < width && width <= 4);
    let shift = 8 * (width - 1 - index);
    (value & !(0xffu32 << shift)) | (u32::from(byte) << shift)
}

impl Metadata {
    /// Fresh record: every field zero, nothing read.
    pub const fn new() -> Self {
        Self {
            ether_type: 0,
            ip_protocol: 0,
            ip_source: 0,
            ip_dest: 0,
            udp_source: 0,
            udp_dest: 0,
            fields: HeaderFields::empty(),
        }
    }

    /// EtherType fully read and equal to IPv4.
    pub fn valid_ip(&self) -> bool {
        self.fields.contains(HeaderFields::ETHER_TYPE) && self.ether_type == ether_types::IPV4
    }

    /// IPv4 and the protocol byte read as UDP.
    pub fn valid_udp(&self) -> bool {
        self.valid_ip()
            && self.fields.contains(HeaderFields::IP_PROTOCOL)
            && self.ip_protocol == ip_protocols::UDP
    }

    #[inline]
    pub fn ip_source_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.ip_source)
    }

    #[inline]
    pub fn ip_dest_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.ip_dest)
    }

    /// Current value of `field`, widened to `u32`.
    pub fn field(&self, field: HeaderField) -> u32 {
        match field {
            HeaderField::EtherType  => u32::from(self.ether_type),
            HeaderField::IpProtocol => u32::from(self.ip_protocol),
            HeaderField::IpSource   => self.ip_source,
            HeaderField::IpDest     => self.ip_dest,
            HeaderField::UdpSource  => u32::from(self.udp_source),
            HeaderField::UdpDest    => u32::from(self.udp_dest),
        }
    }

    /// Write byte `index` of `field` in network order.
    pub fn set_field_byte(&mut self, field: HeaderField, index: usize, byte: u8) {
        let width = field.width();
        let value = splice(self.field(field), width, index, byte);
        match field {
            HeaderField::EtherType  => self.ether_type = value as u16,
            HeaderField::IpProtocol => self.ip_protocol = value as u8,
            HeaderField::IpSource   => self.ip_source = value,
            HeaderField::IpDest     => self.ip_dest = value,
            HeaderField::UdpSource  => self.udp_source = value as u16,
            HeaderField::UdpDest    => self.udp_dest = value as u16,
        }
    }

    /// Mark `field` as completely read.
    #[inline]
    pub fn mark_read(&mut self, field: HeaderField) {
        self.fields |= field.flag();
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid_udp() {
            write!(
                f,
                "udp {}:{} -> {}:{}",
                self.ip_source_addr(),
                self.udp_source,
                self.ip_dest_addr(),
                self.udp_dest,
            )
        } else if self.valid_ip() {
            write!(
                f,
                "ipv4 proto {} {} -> {}",
                self.ip_protocol,
                self.ip_source_addr(),
                self.ip_dest_addr(),
            )
        } else {
            write!(f, "ethertype {:#06x}", self.ether_type)
        }
    }
}
