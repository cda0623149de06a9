use crate::duration::Duration;
use pcap_parser::{InterfaceDescriptionBlock, Linktype};

/// pcap parsing context
#[derive(Clone, Default)]
pub struct ParseContext {
    pub interfaces: Vec<InterfaceInfo>,
    /// Timestamp of first packet seen
    pub first_packet_ts: Duration,
    /// Relative timestamp of current packet
    pub rel_ts: Duration,
    /// Index of current packet in pcap file
    pub pcap_index: usize,
}

/// Information related to a network interface used for capture
#[derive(Clone, Debug)]
pub struct InterfaceInfo {
    /// The `Linktype` used for data format
    pub link_type: Linktype,
    /// Timestamp units per second
    pub ts_unit: u64,
    /// Time offset, in seconds
    pub ts_offset: u64,
    /// Maximum number of octets captured from each packet
    pub snaplen: u32,
}

impl Default for InterfaceInfo {
    fn default() -> Self {
        InterfaceInfo {
            link_type: Linktype(0),
            ts_unit: 1_000_000,
            ts_offset: 0,
            snaplen: 0,
        }
    }
}

pub fn pcapng_build_interface(idb: &InterfaceDescriptionBlock) -> InterfaceInfo {
    let ts_unit = match pcap_parser::build_ts_resolution(idb.if_tsresol) {
        Some(unit) => unit,
        None => {
            warn!("Invalid if_tsresol {}, using microseconds", idb.if_tsresol);
            1_000_000
        }
    };
    InterfaceInfo {
        link_type: idb.linktype,
        ts_unit,
        ts_offset: idb.if_tsoffset as u64,
        snaplen: idb.snaplen,
    }
}
