use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// Connection identity: layer 4 protocol, addresses and ports
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub struct FiveTuple {
    /// Layer 4 protocol (e.g TCP, UDP)
    pub proto: u8,
    pub src: IpAddr,
    pub dst: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
}

pub trait ToFiveTuple {
    fn get_five_tuple(&self) -> FiveTuple;
}

impl FiveTuple {
    pub fn get_reverse(&self) -> FiveTuple {
        FiveTuple {
            proto: self.proto,
            src: self.dst,
            dst: self.src,
            src_port: self.dst_port,
            dst_port: self.src_port,
        }
    }

    /// Return the same tuple with endpoints sorted, so both directions of a
    /// connection share one key
    pub fn canonical(&self) -> FiveTuple {
        if (self.src, self.src_port) <= (self.dst, self.dst_port) {
            self.clone()
        } else {
            self.get_reverse()
        }
    }
}

impl Default for FiveTuple {
    fn default() -> Self {
        FiveTuple {
            proto: 0,
            src: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            dst: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            src_port: 0,
            dst_port: 0,
        }
    }
}

impl fmt::Display for FiveTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} [{}]",
            self.src, self.src_port, self.dst, self.dst_port, self.proto
        )
    }
}
