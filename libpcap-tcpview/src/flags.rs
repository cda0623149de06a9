use std::fmt;

/// Set of TCP control bits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TcpFlagSet(u16);

impl TcpFlagSet {
    pub const FIN: u16 = 0x01;
    pub const SYN: u16 = 0x02;
    pub const RST: u16 = 0x04;
    pub const PSH: u16 = 0x08;
    pub const ACK: u16 = 0x10;
    pub const URG: u16 = 0x20;
    pub const ECE: u16 = 0x40;
    pub const CWR: u16 = 0x80;

    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        TcpFlagSet(bits)
    }

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Test if all bits of `flags` are set
    #[inline]
    pub const fn contains(self, flags: u16) -> bool {
        self.0 & flags == flags
    }

    #[inline]
    pub const fn fin(self) -> bool {
        self.contains(Self::FIN)
    }
    #[inline]
    pub const fn syn(self) -> bool {
        self.contains(Self::SYN)
    }
    #[inline]
    pub const fn rst(self) -> bool {
        self.contains(Self::RST)
    }
    #[inline]
    pub const fn psh(self) -> bool {
        self.contains(Self::PSH)
    }
    #[inline]
    pub const fn ack(self) -> bool {
        self.contains(Self::ACK)
    }
    #[inline]
    pub const fn urg(self) -> bool {
        self.contains(Self::URG)
    }
    #[inline]
    pub const fn ece(self) -> bool {
        self.contains(Self::ECE)
    }
    #[inline]
    pub const fn cwr(self) -> bool {
        self.contains(Self::CWR)
    }

    /// Names of the set flags among FIN, SYN, RST, PSH, ACK and URG, in this
    /// order, separated by ", ". Empty if none is set.
    pub fn summary(self) -> String {
        const NAMES: [(u16, &str); 6] = [
            (TcpFlagSet::FIN, "FIN"),
            (TcpFlagSet::SYN, "SYN"),
            (TcpFlagSet::RST, "RST"),
            (TcpFlagSet::PSH, "PSH"),
            (TcpFlagSet::ACK, "ACK"),
            (TcpFlagSet::URG, "URG"),
        ];
        NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TcpFlagSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
