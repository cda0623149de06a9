use crate::decoder::decode_frame;
use crate::error::ParseError;
use crate::flags::TcpFlagSet;
use crate::layers::*;
use crate::options::{format_options, parse_tcp_options, SynOptions, TcpOption};
use libpcap_tools::{CapturedFrame, Duration, FiveTuple, ToFiveTuple};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::ipv6::Ipv6Packet;
use pnet_packet::tcp::TcpPacket;
use pnet_packet::Packet;
use std::cmp::min;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, trace};

/// Size of the fixed IPv6 header
pub const IPV6_HEADER_LEN: u16 = 40;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ipv4Header {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    /// Internet Header Length, in 32-bit words
    pub ihl: u8,
    /// Length of the datagram (header and data)
    pub total_length: u16,
    pub identification: u16,
    pub ttl: u8,
}

impl Ipv4Header {
    fn from_packet(ip: &Ipv4Packet) -> Self {
        Ipv4Header {
            source: ip.get_source(),
            destination: ip.get_destination(),
            ihl: ip.get_header_length(),
            total_length: ip.get_total_length(),
            identification: ip.get_identification(),
            ttl: ip.get_ttl(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ipv6Header {
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
    /// Length of the data following the fixed header
    pub payload_length: u16,
    pub hop_limit: u8,
    pub flow_label: u32,
}

impl Ipv6Header {
    fn from_packet(ip: &Ipv6Packet) -> Self {
        Ipv6Header {
            source: ip.get_source(),
            destination: ip.get_destination(),
            payload_length: ip.get_payload_length(),
            hop_limit: ip.get_hop_limit(),
            flow_label: ip.get_flow_label(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkHeader {
    Ipv4(Ipv4Header),
    Ipv6(Ipv6Header),
}

impl NetworkHeader {
    pub fn version(&self) -> u8 {
        match self {
            NetworkHeader::Ipv4(_) => 4,
            NetworkHeader::Ipv6(_) => 6,
        }
    }

    pub fn source(&self) -> IpAddr {
        match self {
            NetworkHeader::Ipv4(ip) => IpAddr::V4(ip.source),
            NetworkHeader::Ipv6(ip) => IpAddr::V6(ip.source),
        }
    }

    pub fn destination(&self) -> IpAddr {
        match self {
            NetworkHeader::Ipv4(ip) => IpAddr::V4(ip.destination),
            NetworkHeader::Ipv6(ip) => IpAddr::V6(ip.destination),
        }
    }

    /// IP header length in bytes (fixed for IPv6)
    pub fn header_length(&self) -> u16 {
        match self {
            NetworkHeader::Ipv4(ip) => u16::from(ip.ihl) * 4,
            NetworkHeader::Ipv6(_) => IPV6_HEADER_LEN,
        }
    }

    /// Declared length: total length for IPv4, payload length for IPv6
    pub fn total_length(&self) -> u16 {
        match self {
            NetworkHeader::Ipv4(ip) => ip.total_length,
            NetworkHeader::Ipv6(ip) => ip.payload_length,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence: u32,
    pub acknowledgement: u32,
    /// Header length, in bytes
    pub data_offset: u16,
    pub flags: TcpFlagSet,
    pub window: u16,
    pub checksum: u16,
    pub urgent_ptr: u16,
    pub options: Vec<TcpOption>,
}

impl TcpHeader {
    fn from_packet(tcp: &TcpPacket) -> Self {
        let data_offset = u16::from(tcp.get_data_offset()) * 4;
        let raw = tcp.packet();
        let options_end = min(usize::from(data_offset), raw.len());
        let options = raw
            .get(TcpPacket::minimum_packet_size()..options_end)
            .map(parse_tcp_options)
            .unwrap_or_default();
        TcpHeader {
            source_port: tcp.get_source(),
            destination_port: tcp.get_destination(),
            sequence: tcp.get_sequence(),
            acknowledgement: tcp.get_acknowledgement(),
            data_offset,
            flags: TcpFlagSet::from_bits(u16::from(tcp.get_flags())),
            window: tcp.get_window(),
            checksum: tcp.get_checksum(),
            urgent_ptr: tcp.get_urgent_ptr(),
            options,
        }
    }
}

/// Declared IP length smaller than the observed headers and payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LengthAnomaly {
    /// Length declared by the IP header
    pub declared: u16,
    /// Headers and payload actually seen, counted as the declared length is
    pub observed: u64,
}

impl fmt::Display for LengthAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "declared length {} < observed {} ({} bytes in excess)",
            self.declared,
            self.observed,
            self.observed.saturating_sub(u64::from(self.declared))
        )
    }
}

/// Why a frame produced no record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NoNetworkLayer,
    /// Network layer is neither IPv4 nor IPv6 (ethertype)
    UnsupportedNetwork(u16),
    NoTransportLayer,
    /// Transport layer is not TCP (IP protocol number)
    UnsupportedTransport(u8),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SkipReason::NoNetworkLayer => f.write_str("no network layer"),
            SkipReason::UnsupportedNetwork(t) => write!(f, "unsupported network layer (ethertype 0x{:04x})", t),
            SkipReason::NoTransportLayer => f.write_str("no transport layer"),
            SkipReason::UnsupportedTransport(p) => write!(f, "unsupported transport layer (protocol {})", p),
        }
    }
}

/// Result of a successful parse
#[derive(Clone, Debug, PartialEq)]
pub enum ParseOutcome {
    /// TCP over IPv4 or IPv6, all fields populated
    Full(PacketRecord),
    /// Valid frame, but not a TCP/IP packet
    Skip(SkipReason),
}

impl ParseOutcome {
    pub fn is_full(&self) -> bool {
        matches!(self, ParseOutcome::Full(_))
    }

    pub fn record(&self) -> Option<&PacketRecord> {
        match self {
            ParseOutcome::Full(record) => Some(record),
            ParseOutcome::Skip(_) => None,
        }
    }

    pub fn into_record(self) -> Option<PacketRecord> {
        match self {
            ParseOutcome::Full(record) => Some(record),
            ParseOutcome::Skip(_) => None,
        }
    }
}

/// Normalized view of a TCP/IP packet
///
/// Built once from a decoded frame, then read-only. The record owns a copy of
/// the payload, and keeps no reference to the capture buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct PacketRecord {
    timestamp: OffsetDateTime,
    link: LinkLayer,
    network: NetworkHeader,
    tcp: TcpHeader,
    payload: Vec<u8>,
    lost_bytes: u16,
    length_anomaly: Option<LengthAnomaly>,
}

/// Decode a captured frame and build its packet record
pub fn parse(frame: &CapturedFrame) -> Result<ParseOutcome, ParseError> {
    let decoded = decode_frame(frame);
    PacketRecord::parse(&decoded)
}

fn resolve_timestamp(ts: Duration) -> OffsetDateTime {
    if ts.is_null() {
        return OffsetDateTime::now_utc();
    }
    OffsetDateTime::from_unix_timestamp(i64::from(ts.secs))
        .ok()
        .and_then(|t| t.checked_add(time::Duration::microseconds(i64::from(ts.micros))))
        .unwrap_or_else(OffsetDateTime::now_utc)
}

/// Bytes implied by the declared IP length but missing from the capture
///
/// IPv6 payload length does not count the fixed header, so only the TCP header
/// is subtracted. A null declared length (segmentation offload, jumbogram) is
/// replaced by the captured length: nothing is lost.
fn compute_loss(
    network: &NetworkHeader,
    data_offset: u16,
    payload_len: usize,
) -> (u16, Option<LengthAnomaly>) {
    let headers = match network {
        NetworkHeader::Ipv4(_) => u64::from(data_offset) + u64::from(network.header_length()),
        NetworkHeader::Ipv6(_) => u64::from(data_offset),
    };
    let observed = headers + payload_len as u64;
    let declared = network.total_length();
    if declared == 0 {
        return (0, None);
    }
    let loss = i128::from(declared) - i128::from(observed);
    match u16::try_from(loss) {
        Ok(lost) => (lost, None),
        Err(_) => (0, Some(LengthAnomaly { declared, observed })),
    }
}

impl PacketRecord {
    /// Build a packet record from a decoded frame
    ///
    /// A decoder error is returned first, before looking at any layer. Frames
    /// without an IPv4/IPv6 network layer or a TCP transport layer are skipped.
    pub fn parse(frame: &DecodedFrame) -> Result<ParseOutcome, ParseError> {
        if let Some(e) = &frame.error {
            return Err(ParseError::from(e));
        }
        let timestamp = resolve_timestamp(frame.timestamp);
        let network = match &frame.network {
            Some(NetworkLayer::Ipv4(ip)) => NetworkHeader::Ipv4(Ipv4Header::from_packet(ip)),
            Some(NetworkLayer::Ipv6(ip)) => NetworkHeader::Ipv6(Ipv6Header::from_packet(ip)),
            Some(NetworkLayer::Other(ethertype)) => {
                trace!("skipping frame: ethertype 0x{:04x}", ethertype.0);
                return Ok(ParseOutcome::Skip(SkipReason::UnsupportedNetwork(ethertype.0)));
            }
            None => return Ok(ParseOutcome::Skip(SkipReason::NoNetworkLayer)),
        };
        let tcp = match &frame.transport {
            Some(TransportLayer::Tcp(tcp)) => TcpHeader::from_packet(tcp),
            Some(TransportLayer::Other(proto)) => {
                trace!("skipping frame: IP protocol {}", proto.0);
                return Ok(ParseOutcome::Skip(SkipReason::UnsupportedTransport(proto.0)));
            }
            None => return Ok(ParseOutcome::Skip(SkipReason::NoTransportLayer)),
        };
        let payload = frame.application.map(<[u8]>::to_vec).unwrap_or_default();
        let (lost_bytes, length_anomaly) = compute_loss(&network, tcp.data_offset, payload.len());
        if let Some(anomaly) = &length_anomaly {
            debug!(
                "{}:{} -> {}:{}: {}",
                network.source(),
                tcp.source_port,
                network.destination(),
                tcp.destination_port,
                anomaly
            );
        }
        Ok(ParseOutcome::Full(PacketRecord {
            timestamp,
            link: frame.link,
            network,
            tcp,
            payload,
            lost_bytes,
            length_anomaly,
        }))
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn link(&self) -> &LinkLayer {
        &self.link
    }

    pub fn network(&self) -> &NetworkHeader {
        &self.network
    }

    pub fn tcp(&self) -> &TcpHeader {
        &self.tcp
    }

    /// IP version (4 or 6)
    pub fn ip_version(&self) -> u8 {
        self.network.version()
    }

    pub fn source_address(&self) -> IpAddr {
        self.network.source()
    }

    pub fn destination_address(&self) -> IpAddr {
        self.network.destination()
    }

    pub fn source_port(&self) -> u16 {
        self.tcp.source_port
    }

    pub fn destination_port(&self) -> u16 {
        self.tcp.destination_port
    }

    pub fn source_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.source_address(), self.tcp.source_port)
    }

    pub fn destination_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.destination_address(), self.tcp.destination_port)
    }

    /// Source address and port, for ex. `10.0.0.1:80` or `[2001:db8::1]:80`
    pub fn source_socket(&self) -> String {
        self.source_socket_addr().to_string()
    }

    pub fn destination_socket(&self) -> String {
        self.destination_socket_addr().to_string()
    }

    /// Connection identity of this packet
    pub fn five_tuple(&self) -> FiveTuple {
        FiveTuple {
            proto: IpNextHeaderProtocols::Tcp.0,
            src: self.source_address(),
            dst: self.destination_address(),
            src_port: self.tcp.source_port,
            dst_port: self.tcp.destination_port,
        }
    }

    /// IP header length, in bytes (40 for IPv6)
    pub fn ip_header_length(&self) -> u16 {
        self.network.header_length()
    }

    /// Declared IP length (total length for IPv4, payload length for IPv6)
    pub fn total_length(&self) -> u16 {
        self.network.total_length()
    }

    /// TCP header length, in bytes
    pub fn data_offset(&self) -> u16 {
        self.tcp.data_offset
    }

    pub fn flags(&self) -> TcpFlagSet {
        self.tcp.flags
    }

    pub fn options(&self) -> &[TcpOption] {
        &self.tcp.options
    }

    /// MSS and window scale factor. Only SYN segments carry them: for other
    /// segments, both values are 0.
    pub fn syn_options(&self) -> SynOptions {
        if !self.tcp.flags.syn() {
            return SynOptions::default();
        }
        SynOptions::scan(&self.tcp.options)
    }

    /// Set flags, in fixed order, for ex. `SYN, ACK`
    pub fn flags_summary(&self) -> String {
        self.tcp.flags.summary()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Bytes implied by the declared IP length, but missing from the capture
    pub fn lost_bytes(&self) -> u16 {
        self.lost_bytes
    }

    /// Test if the capture of this packet is incomplete
    pub fn is_truncated(&self) -> bool {
        self.lost_bytes > 0
    }

    /// Set if the declared IP length is smaller than the headers and payload seen
    pub fn length_anomaly(&self) -> Option<&LengthAnomaly> {
        self.length_anomaly.as_ref()
    }

    /// Multi-line, human-readable description of the packet
    pub fn describe(&self) -> String {
        self.to_string()
    }

    fn format_timestamp(&self) -> String {
        let format = format_description!(
            "[month repr:short] [day padding:space] [hour]:[minute]:[second].[subsecond digits:9]"
        );
        self.timestamp
            .format(format)
            .unwrap_or_else(|_| self.timestamp.unix_timestamp().to_string())
    }
}

impl ToFiveTuple for PacketRecord {
    fn get_five_tuple(&self) -> FiveTuple {
        self.five_tuple()
    }
}

impl fmt::Display for PacketRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Time: {}", self.format_timestamp())?;
        writeln!(f, "Source: {}", self.source_socket())?;
        writeln!(f, "Destination: {}", self.destination_socket())?;
        writeln!(f, "IHL: {}", self.ip_header_length())?;
        writeln!(f, "Total Length: {}", self.total_length())?;
        writeln!(f, "Sequence: {}", self.tcp.sequence)?;
        writeln!(f, "Acknowledgment: {}", self.tcp.acknowledgement)?;
        writeln!(f, "DataOffset: {}", self.tcp.data_offset)?;
        writeln!(f, "Window: {}", self.tcp.window)?;
        writeln!(f, "Flag: {}", self.flags_summary())?;
        writeln!(f, "Options: {}", format_options(&self.tcp.options))?;
        writeln!(f, "Data Size: {}", self.payload.len())?;
        write!(f, "Lost Data: {}", self.lost_bytes)?;
        if let Some(anomaly) = &self.length_anomaly {
            write!(f, "\nLength Anomaly: {}", anomaly)?;
        }
        Ok(())
    }
}
