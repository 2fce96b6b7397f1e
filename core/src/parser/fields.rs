use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::metadata::HeaderFields;

/// Header fields the extractor knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderField {
    EtherType,
    IpProtocol,
    IpSource,
    IpDest,
    UdpSource,
    UdpDest,
}

impl HeaderField {
    pub const ALL: [HeaderField; 6] = [
        HeaderField::EtherType,
        HeaderField::IpProtocol,
        HeaderField::IpSource,
        HeaderField::IpDest,
        HeaderField::UdpSource,
        HeaderField::UdpDest,
    ];

    /// Natural width in bytes.
    pub const fn width(self) -> usize {
        match self {
            HeaderField::EtherType  => 2,
            HeaderField::IpProtocol => 1,
            HeaderField::IpSource   => 4,
            HeaderField::IpDest     => 4,
            HeaderField::UdpSource  => 2,
            HeaderField::UdpDest    => 2,
        }
    }

    pub const fn flag(self) -> HeaderFields {
        match self {
            HeaderField::EtherType  => HeaderFields::ETHER_TYPE,
            HeaderField::IpProtocol => HeaderFields::IP_PROTOCOL,
            HeaderField::IpSource   => HeaderFields::IP_SOURCE,
            HeaderField::IpDest     => HeaderFields::IP_DEST,
            HeaderField::UdpSource  => HeaderFields::UDP_SOURCE,
            HeaderField::UdpDest    => HeaderFields::UDP_DEST,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            HeaderField::EtherType  => "ether_type",
            HeaderField::IpProtocol => "ip_protocol",
            HeaderField::IpSource   => "ip_source",
            HeaderField::IpDest     => "ip_dest",
            HeaderField::UdpSource  => "udp_source",
            HeaderField::UdpDest    => "udp_dest",
        }
    }
}

/// One row of a layout: `width` bytes at absolute packet `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: HeaderField,
    pub offset: usize,
    pub width: usize,
}

impl FieldSpec {
    pub const fn new(field: HeaderField, offset: usize) -> Self {
        Self { field, offset, width: field.width() }
    }

    /// First byte past the field.
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }
}

/// Untagged Ethernet II / IPv4 (no options) / UDP.
///
/// ```text
/// [ 12..14 ] ether_type
/// [ 23..24 ] ip_protocol
/// [ 26..30 ] ip_source
/// [ 30..34 ] ip_dest
/// [ 34..36 ] udp_source
/// [ 36..38 ] udp_dest
/// ```
pub const ETHERNET_IPV4_UDP: [FieldSpec; 6] = [
    FieldSpec::new(HeaderField::EtherType, 12),
    FieldSpec::new(HeaderField::IpProtocol, 23),
    FieldSpec::new(HeaderField::IpSource, 26),
    FieldSpec::new(HeaderField::IpDest, 30),
    FieldSpec::new(HeaderField::UdpSource, 34),
    FieldSpec::new(HeaderField::UdpDest, 36),
];

/// Validated table of fields to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    specs: Vec<FieldSpec>,
    span: usize,
}

impl FieldLayout {
    pub fn new(specs: impl Into<Vec<FieldSpec>>) -> Result<Self, LayoutError> {
        let specs = specs.into();
        if specs.is_empty() {
            return Err(LayoutError::Empty);
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if spec.width != spec.field.width() {
                return Err(LayoutError::WidthMismatch {
                    field: spec.field.name(),
                    expected: spec.field.width(),
                    actual: spec.width,
                });
            }
            if !seen.insert(spec.field) {
                return Err(LayoutError::DuplicateField(spec.field.name()));
            }
        }

        let span = specs.iter().map(FieldSpec::end).max().unwrap_or(0);
        Ok(Self { specs, span })
    }

    pub fn ethernet_ipv4_udp() -> Self {
        Self {
            specs: ETHERNET_IPV4_UDP.to_vec(),
            span: 38,
        }
    }

    #[inline]
    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    /// Packet bytes needed to fill every field.
    #[inline]
    pub fn span(&self) -> usize {
        self.span
    }

    /// Beats of width `width` that can carry field bytes.
    #[inline]
    pub fn beats_touched(&self, width: usize) -> usize {
        self.span.div_ceil(width)
    }
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self::ethernet_ipv4_udp()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout has no fields")]
    Empty,

    #[error("field {field} has width {actual}, expected {expected}")]
    WidthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("field {0} appears more than once")]
    DuplicateField(&'static str),
}
