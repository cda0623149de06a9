use crate::duration::Duration;
use pcap_parser::data::PacketData;

/// One captured unit of network data, with its link-layer framing resolved
///
/// The bytes are borrowed from the acquisition buffer, which may be reused as
/// soon as the frame has been processed.
pub struct CapturedFrame<'a> {
    /// Index of the capture interface (pcap-ng), 0 otherwise
    pub interface: u32,
    /// Capture timestamp, null if the source did not provide one
    pub ts: Duration,
    pub data: PacketData<'a>,
    /// Number of bytes present in the capture
    pub caplen: u32,
    /// Length of the frame on the wire
    pub origlen: u32,
    /// Index of the frame in the capture file
    pub pcap_index: usize,
}

fn data_len(data: &PacketData) -> usize {
    match data {
        PacketData::L2(d) | PacketData::L3(_, d) | PacketData::L4(_, d) => d.len(),
        PacketData::Unsupported(d) => d.len(),
    }
}

impl<'a> CapturedFrame<'a> {
    /// Build a frame from already-resolved packet data. Capture and wire lengths
    /// are both set to the data length.
    pub fn new(data: PacketData<'a>, ts: Duration) -> Self {
        let len = u32::try_from(data_len(&data)).unwrap_or(u32::MAX);
        CapturedFrame {
            interface: 0,
            ts,
            data,
            caplen: len,
            origlen: len,
            pcap_index: 0,
        }
    }

    /// Build a frame holding an Ethernet II frame
    pub fn ethernet(data: &'a [u8], ts: Duration) -> Self {
        CapturedFrame::new(PacketData::L2(data), ts)
    }

    /// Test if the capture holds fewer bytes than the frame had on the wire
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.caplen < self.origlen
    }
}
