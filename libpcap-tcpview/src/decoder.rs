//! Layer decoder: split a captured frame into typed layers
//!
//! Header fields are decoded by `pnet_packet`. This module only locates each
//! layer in the captured data and checks that the declared header lengths are
//! consistent with it, so that no later access can go out of bounds.

use crate::error::DecodeError;
use crate::layers::*;
use libpcap_tools::{CapturedFrame, PacketData};
use pnet_packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::ipv6::Ipv6Packet;
use pnet_packet::tcp::TcpPacket;
use pnet_packet::vlan::VlanPacket;
use std::cmp::min;
use tracing::trace;

const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_HEADER_LEN: usize = 4;
const IPV4_MIN_HEADER_LEN: usize = 20;
const IPV6_HEADER_LEN: usize = 40;
const TCP_MIN_HEADER_LEN: usize = 20;

type DecodeResult = Result<(), DecodeError>;

fn failure(details: String) -> DecodeError {
    DecodeError::Failure(details)
}

/// Decode all layers of a captured frame
///
/// Never fails: decoding stops at the first error, which is stored in
/// `DecodedFrame::error` along with the layers decoded so far.
pub fn decode_frame<'a>(frame: &CapturedFrame<'a>) -> DecodedFrame<'a> {
    let mut decoded = DecodedFrame::new(frame.ts);
    let res = match frame.data {
        PacketData::L2(data) => decode_ethernet(&mut decoded, data),
        PacketData::L3(ethertype, data) => {
            decoded.link = LinkLayer::Raw;
            decode_l3(&mut decoded, EtherType(ethertype), data)
        }
        PacketData::L4(proto, _) => {
            trace!("frame {}: L4 data (proto {}) without network layer", frame.pcap_index, proto);
            decoded.link = LinkLayer::Raw;
            Ok(())
        }
        PacketData::Unsupported(_) => {
            trace!("frame {}: unsupported link layer", frame.pcap_index);
            Ok(())
        }
    };
    if let Err(e) = res {
        trace!("frame {}: {}", frame.pcap_index, e);
        decoded.error = Some(e);
    }
    decoded
}

fn decode_ethernet<'a>(decoded: &mut DecodedFrame<'a>, data: &'a [u8]) -> DecodeResult {
    let eth = EthernetPacket::new(data)
        .ok_or_else(|| failure(format!("Ethernet header truncated ({} bytes)", data.len())))?;
    let mut ethertype = eth.get_ethertype();
    let mut offset = ETHERNET_HEADER_LEN;
    let mut vlan = None;
    while matches!(
        ethertype,
        EtherTypes::Vlan | EtherTypes::PBridge | EtherTypes::QinQ
    ) {
        let tag = data
            .get(offset..)
            .and_then(|d| VlanPacket::new(d))
            .ok_or_else(|| failure(format!("VLAN tag truncated at offset {}", offset)))?;
        vlan.get_or_insert(tag.get_vlan_identifier());
        ethertype = tag.get_ethertype();
        offset += VLAN_HEADER_LEN;
    }
    decoded.link = LinkLayer::Ethernet {
        source: eth.get_source(),
        destination: eth.get_destination(),
        vlan,
    };
    decode_l3(decoded, ethertype, data.get(offset..).unwrap_or(&[]))
}

fn decode_l3<'a>(decoded: &mut DecodedFrame<'a>, ethertype: EtherType, data: &'a [u8]) -> DecodeResult {
    match ethertype {
        EtherTypes::Ipv4 => decode_ipv4(decoded, data),
        EtherTypes::Ipv6 => decode_ipv6(decoded, data),
        _ => {
            trace!("unsupported ethertype 0x{:04x}", ethertype.0);
            decoded.network = Some(NetworkLayer::Other(ethertype));
            Ok(())
        }
    }
}

fn decode_ipv4<'a>(decoded: &mut DecodedFrame<'a>, data: &'a [u8]) -> DecodeResult {
    let header = Ipv4Packet::new(data)
        .ok_or_else(|| failure(format!("IPv4 header truncated ({} bytes)", data.len())))?;
    if header.get_version() != 4 {
        return Err(DecodeError::Layer(format!(
            "IPv4 ethertype, but IP version is {}",
            header.get_version()
        )));
    }
    let ihl = usize::from(header.get_header_length()) * 4;
    if ihl < IPV4_MIN_HEADER_LEN {
        return Err(failure(format!("IPv4 header length too small ({} bytes)", ihl)));
    }
    if ihl > data.len() {
        return Err(failure(format!(
            "IPv4 header length {} exceeds captured data ({} bytes)",
            ihl,
            data.len()
        )));
    }
    let total_length = usize::from(header.get_total_length());
    let end = match total_length {
        // segmentation offload: length is filled by the NIC
        0 => data.len(),
        l if l < ihl => {
            return Err(failure(format!(
                "IPv4 total length {} smaller than header length {}",
                l, ihl
            )))
        }
        // remove padding
        l => min(l, data.len()),
    };
    let data = &data[..end];
    let ipv4 = Ipv4Packet::new(data)
        .ok_or_else(|| failure(format!("IPv4 packet truncated ({} bytes)", data.len())))?;
    let l4_proto = ipv4.get_next_level_protocol();
    let fragment_offset = ipv4.get_fragment_offset();
    decoded.network = Some(NetworkLayer::Ipv4(ipv4));
    if fragment_offset != 0 {
        trace!("IPv4 fragment (offset {}), no transport layer", fragment_offset);
        return Ok(());
    }
    decode_l4(decoded, l4_proto, &data[ihl..])
}

fn decode_ipv6<'a>(decoded: &mut DecodedFrame<'a>, data: &'a [u8]) -> DecodeResult {
    let header = Ipv6Packet::new(data)
        .ok_or_else(|| failure(format!("IPv6 header truncated ({} bytes)", data.len())))?;
    if header.get_version() != 6 {
        return Err(DecodeError::Layer(format!(
            "IPv6 ethertype, but IP version is {}",
            header.get_version()
        )));
    }
    let payload_length = usize::from(header.get_payload_length());
    let available = data.len() - IPV6_HEADER_LEN;
    // a null payload length (jumbogram, offload) keeps all captured bytes
    let end = if payload_length != 0 && payload_length < available {
        IPV6_HEADER_LEN + payload_length
    } else {
        data.len()
    };
    let data = &data[..end];
    let ipv6 = Ipv6Packet::new(data)
        .ok_or_else(|| failure(format!("IPv6 packet truncated ({} bytes)", data.len())))?;
    let next_header = ipv6.get_next_header();
    decoded.network = Some(NetworkLayer::Ipv6(ipv6));
    decode_l4(decoded, next_header, &data[IPV6_HEADER_LEN..])
}

fn decode_l4<'a>(
    decoded: &mut DecodedFrame<'a>,
    proto: IpNextHeaderProtocol,
    data: &'a [u8],
) -> DecodeResult {
    match proto {
        IpNextHeaderProtocols::Tcp => decode_tcp(decoded, data),
        _ => {
            decoded.transport = Some(TransportLayer::Other(proto));
            Ok(())
        }
    }
}

fn decode_tcp<'a>(decoded: &mut DecodedFrame<'a>, data: &'a [u8]) -> DecodeResult {
    let tcp = TcpPacket::new(data)
        .ok_or_else(|| failure(format!("TCP header truncated ({} bytes)", data.len())))?;
    let data_offset = usize::from(tcp.get_data_offset()) * 4;
    if data_offset < TCP_MIN_HEADER_LEN {
        return Err(failure(format!("TCP data offset too small ({} bytes)", data_offset)));
    }
    if data_offset > data.len() {
        return Err(failure(format!(
            "TCP data offset {} exceeds segment length {}",
            data_offset,
            data.len()
        )));
    }
    decoded.transport = Some(TransportLayer::Tcp(tcp));
    let payload = &data[data_offset..];
    if !payload.is_empty() {
        decoded.application = Some(payload);
    }
    Ok(())
}
