use crate::error::DecodeError;
use libpcap_tools::Duration;
use pnet_base::MacAddr;
use pnet_packet::ethernet::EtherType;
use pnet_packet::ip::IpNextHeaderProtocol;
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::ipv6::Ipv6Packet;
use pnet_packet::tcp::TcpPacket;

/// Link layer of a frame. Carried along, never interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkLayer {
    Ethernet {
        source: MacAddr,
        destination: MacAddr,
        /// Outermost 802.1Q VLAN identifier, if tagged
        vlan: Option<u16>,
    },
    /// Network data without link header (raw IP, or a header stripped by the capture)
    Raw,
    Unsupported,
}

#[derive(Debug)]
pub enum NetworkLayer<'a> {
    Ipv4(Ipv4Packet<'a>),
    Ipv6(Ipv6Packet<'a>),
    Other(EtherType),
}

#[derive(Debug)]
pub enum TransportLayer<'a> {
    Tcp(TcpPacket<'a>),
    Other(IpNextHeaderProtocol),
}

/// A frame split into typed layers, as produced by the layer decoder
///
/// Layers borrow from the captured data. A layer is `None` when the decoder did
/// not reach it.
#[derive(Debug)]
pub struct DecodedFrame<'a> {
    /// Capture timestamp, null if unknown
    pub timestamp: Duration,
    pub link: LinkLayer,
    pub network: Option<NetworkLayer<'a>>,
    pub transport: Option<TransportLayer<'a>>,
    /// Data following the transport header, if not empty
    pub application: Option<&'a [u8]>,
    /// Set if decoding stopped on an error
    pub error: Option<DecodeError>,
}

impl<'a> DecodedFrame<'a> {
    pub fn new(timestamp: Duration) -> Self {
        DecodedFrame {
            timestamp,
            link: LinkLayer::Unsupported,
            network: None,
            transport: None,
            application: None,
            error: None,
        }
    }
}
