//! Incremental header parsing over beat streams.
//!
//! Responsibilities:
//! - Declare which header fields live at which packet offsets
//! - Fold indexed beats into one `Metadata` record per packet
//! - Wire enumerator and extractor into a single pipeline
//!
//! Non-responsibilities:
//! - Deciding what happens to a packet
//! - Variable-length headers (IP options, VLAN tags, IPv6)

pub mod fields;
pub mod metadata;
pub mod extract;
pub mod pipeline;

pub use fields::{
    FieldLayout,
    FieldSpec,
    HeaderField,
    LayoutError,
    ETHERNET_IPV4_UDP,
};
pub use metadata::{HeaderFields, Metadata};
pub use extract::{scatter, HeaderExtractor};
pub use pipeline::Pipeline;
