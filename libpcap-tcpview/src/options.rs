use pnet_packet::tcp::{TcpOptionNumber, TcpOptionNumbers};
use std::fmt;

/// Largest window scale shift allowed by RFC 7323
pub const MAX_WINDOW_SHIFT: u8 = 14;

/// A TCP option, as found in the header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpOption {
    pub kind: TcpOptionNumber,
    /// Declared length, including kind and length bytes. 1 for single-byte
    /// options, 0 if the length byte is missing.
    pub length: u8,
    pub data: Vec<u8>,
}

impl TcpOption {
    fn single(kind: TcpOptionNumber) -> Self {
        TcpOption {
            kind,
            length: 1,
            data: Vec::new(),
        }
    }
}

/// Split the option bytes of a TCP header into options
///
/// Parsing is permissive: it stops at the end-of-list option, after an option
/// with a missing or invalid length (kept, with no data), or after an option
/// overrunning the header (kept, with the available data).
pub fn parse_tcp_options(raw: &[u8]) -> Vec<TcpOption> {
    let mut options = Vec::new();
    let mut i = raw;
    while let Some((&kind, rest)) = i.split_first() {
        let kind = TcpOptionNumber(kind);
        match kind {
            TcpOptionNumbers::EOL => {
                options.push(TcpOption::single(kind));
                break;
            }
            TcpOptionNumbers::NOP => {
                options.push(TcpOption::single(kind));
                i = rest;
            }
            _ => {
                let (length, rest) = match rest.split_first() {
                    Some((&length, rest)) => (length, rest),
                    None => {
                        options.push(TcpOption {
                            kind,
                            length: 0,
                            data: Vec::new(),
                        });
                        break;
                    }
                };
                if length < 2 {
                    options.push(TcpOption {
                        kind,
                        length,
                        data: Vec::new(),
                    });
                    break;
                }
                let data_len = usize::from(length) - 2;
                if data_len > rest.len() {
                    options.push(TcpOption {
                        kind,
                        length,
                        data: rest.to_vec(),
                    });
                    break;
                }
                options.push(TcpOption {
                    kind,
                    length,
                    data: rest[..data_len].to_vec(),
                });
                i = &rest[data_len..];
            }
        }
    }
    options
}

/// Values advertised in the options of a SYN segment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SynOptions {
    /// Maximum Segment Size, 0 if not advertised
    pub mss: u16,
    /// Window scale factor (2^shift), 0 if not advertised. The shift is capped
    /// at `MAX_WINDOW_SHIFT`, so the factor never exceeds 2^14.
    pub window_scale: u16,
}

impl SynOptions {
    /// Scan all options. When an option is repeated, the last occurrence wins.
    ///
    /// Window scale shifts above 14 (invalid per RFC 7323) are read as 14.
    pub fn scan(options: &[TcpOption]) -> SynOptions {
        let mut syn_options = SynOptions::default();
        for option in options {
            match option.kind {
                TcpOptionNumbers::MSS => {
                    if let [hi, lo, ..] = option.data[..] {
                        syn_options.mss = u16::from_be_bytes([hi, lo]);
                    }
                }
                TcpOptionNumbers::WSCALE if option.length > 0 => {
                    if let Some(&shift) = option.data.first() {
                        syn_options.window_scale = 1 << shift.min(MAX_WINDOW_SHIFT);
                    }
                }
                _ => (),
            }
        }
        syn_options
    }
}

fn kind_name(kind: TcpOptionNumber) -> Option<&'static str> {
    match kind {
        TcpOptionNumbers::EOL => Some("EOL"),
        TcpOptionNumbers::NOP => Some("NOP"),
        TcpOptionNumbers::MSS => Some("MSS"),
        TcpOptionNumbers::WSCALE => Some("WS"),
        TcpOptionNumbers::SACK_PERMITTED => Some("SACK_PERM"),
        TcpOptionNumbers::SACK => Some("SACK"),
        TcpOptionNumbers::TIMESTAMPS => Some("TS"),
        _ => None,
    }
}

fn be_u32(d: &[u8]) -> u32 {
    u32::from_be_bytes([d[0], d[1], d[2], d[3]])
}

impl fmt::Display for TcpOption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let d = &self.data[..];
        match (self.kind, d.len()) {
            (TcpOptionNumbers::EOL, _) | (TcpOptionNumbers::NOP, _) => {
                f.write_str(kind_name(self.kind).unwrap_or_default())
            }
            (TcpOptionNumbers::SACK_PERMITTED, 0) => f.write_str("SACK_PERM"),
            (TcpOptionNumbers::MSS, 2) => write!(f, "MSS:{}", u16::from_be_bytes([d[0], d[1]])),
            (TcpOptionNumbers::WSCALE, 1) => write!(f, "WS:{}", d[0]),
            (TcpOptionNumbers::TIMESTAMPS, 8) => {
                write!(f, "TS:{}/{}", be_u32(&d[..4]), be_u32(&d[4..]))
            }
            (TcpOptionNumbers::SACK, n) if n > 0 && n % 8 == 0 => {
                let blocks: Vec<_> = d
                    .chunks_exact(8)
                    .map(|b| format!("{}-{}", be_u32(&b[..4]), be_u32(&b[4..])))
                    .collect();
                write!(f, "SACK:[{}]", blocks.join(","))
            }
            _ => {
                match kind_name(self.kind) {
                    Some(name) => f.write_str(name)?,
                    None => write!(f, "Opt({})", self.kind.0)?,
                }
                if !d.is_empty() {
                    f.write_str(":")?;
                    for b in d {
                        write!(f, "{:02x}", b)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Format an option list as `[opt opt ...]`
pub fn format_options(options: &[TcpOption]) -> String {
    let items: Vec<_> = options.iter().map(|o| o.to_string()).collect();
    format!("[{}]", items.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    // MSS 1460, NOP, WS 7, SACK permitted, EOL, padding
    const SYN_OPTIONS: &[u8] = &[
        0x02, 0x04, 0x05, 0xb4, 0x01, 0x03, 0x03, 0x07, 0x04, 0x02, 0x00, 0x00,
    ];

    fn option(kind: TcpOptionNumber, data: &[u8]) -> TcpOption {
        TcpOption {
            kind,
            length: data.len() as u8 + 2,
            data: data.to_vec(),
        }
    }

    #[test]
    fn options_parse_syn() {
        let options = parse_tcp_options(SYN_OPTIONS);
        let kinds: Vec<_> = options.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TcpOptionNumbers::MSS,
                TcpOptionNumbers::NOP,
                TcpOptionNumbers::WSCALE,
                TcpOptionNumbers::SACK_PERMITTED,
                TcpOptionNumbers::EOL,
            ]
        );
        assert_eq!(options[0].data, vec![0x05, 0xb4]);
        assert_eq!(options[2].length, 3);
        assert_eq!(format_options(&options), "[MSS:1460 NOP WS:7 SACK_PERM EOL]");
    }

    #[test]
    fn options_parse_malformed() {
        // missing length byte
        let options = parse_tcp_options(&[0x01, 0x02]);
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].length, 0);
        // invalid length: parsing stops
        let options = parse_tcp_options(&[0x03, 0x00, 0x02, 0x04, 0x05, 0xb4]);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].kind, TcpOptionNumbers::WSCALE);
        assert!(options[0].data.is_empty());
        // overrun: data is truncated
        let options = parse_tcp_options(&[0x08, 0x0a, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].data, vec![0x00, 0x00, 0x00, 0x01]);
        assert!(parse_tcp_options(&[]).is_empty());
    }

    #[test]
    fn syn_options_values() {
        let options = parse_tcp_options(SYN_OPTIONS);
        let syn = SynOptions::scan(&options);
        assert_eq!(syn.mss, 1460);
        assert_eq!(syn.window_scale, 128);
    }

    #[test]
    fn syn_options_last_wins() {
        let options = vec![
            option(TcpOptionNumbers::MSS, &[0x05, 0xb4]),
            option(TcpOptionNumbers::WSCALE, &[0x02]),
            option(TcpOptionNumbers::MSS, &[0x02, 0x18]),
            option(TcpOptionNumbers::WSCALE, &[0x08]),
        ];
        let syn = SynOptions::scan(&options);
        assert_eq!(syn.mss, 536);
        assert_eq!(syn.window_scale, 256);
    }

    #[test]
    fn syn_options_tolerates_bad_options() {
        let options = vec![
            // zero declared length: ignored
            TcpOption {
                kind: TcpOptionNumbers::WSCALE,
                length: 0,
                data: vec![0x07],
            },
            // MSS without enough data: ignored
            option(TcpOptionNumbers::MSS, &[0x05]),
            // unknown option: ignored
            option(TcpOptionNumber(30), &[0xff, 0xff]),
        ];
        assert_eq!(SynOptions::scan(&options), SynOptions::default());
        // shift is clamped
        let options = vec![option(TcpOptionNumbers::WSCALE, &[0x20])];
        assert_eq!(SynOptions::scan(&options).window_scale, 1 << 14);
    }

    #[test]
    fn options_display() {
        let ts = option(TcpOptionNumbers::TIMESTAMPS, &[0, 0, 0, 1, 0, 0, 0, 2]);
        assert_eq!(ts.to_string(), "TS:1/2");
        let sack = option(TcpOptionNumbers::SACK, &[0, 0, 0, 10, 0, 0, 0, 20]);
        assert_eq!(sack.to_string(), "SACK:[10-20]");
        let unknown = option(TcpOptionNumber(30), &[0xab, 0x01]);
        assert_eq!(unknown.to_string(), "Opt(30):ab01");
        let short_mss = option(TcpOptionNumbers::MSS, &[0x05]);
        assert_eq!(short_mss.to_string(), "MSS:05");
    }
}
