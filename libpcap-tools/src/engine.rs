use crate::analyzer::PcapAnalyzer;
use crate::config::Config;
use crate::context::*;
use crate::duration::Duration;
use crate::error::Error;
use crate::packet::CapturedFrame;
use pcap_parser::data::get_packetdata;
use pcap_parser::*;
use std::cmp::min;
use std::io::Read;

/// pcap/pcap-ng reading engine
///
/// Reads all blocks from the input, resolves link-layer framing and timestamps,
/// and hands every frame to the analyzer.
pub struct PcapEngine<A: PcapAnalyzer> {
    analyzer: A,
    buffer_initial_capacity: usize,
    skip_index: usize,
}

fn ng_timestamp(if_info: &InterfaceInfo, ts_high: u32, ts_low: u32) -> Duration {
    if if_info.ts_unit == 0 {
        return Duration::default();
    }
    let ts = (u64::from(ts_high) << 32) | u64::from(ts_low);
    let secs = (ts / if_info.ts_unit).wrapping_add(if_info.ts_offset);
    let frac = ts % if_info.ts_unit;
    Duration::from_fraction(secs as u32, frac, if_info.ts_unit)
}

impl<A: PcapAnalyzer> PcapEngine<A> {
    /// Build a new PcapEngine, taking ownership of the analyzer
    pub fn new(analyzer: A, config: &Config) -> Self {
        let buffer_initial_capacity = config
            .get_usize("buffer_initial_capacity")
            .unwrap_or(128 * 1024);
        let skip_index = config.get_usize("skip_index").unwrap_or(0);
        PcapEngine {
            analyzer,
            buffer_initial_capacity,
            skip_index,
        }
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    pub fn into_analyzer(self) -> A {
        self.analyzer
    }

    /// Main function: given a reader, read all pcap data and call analyzer for each frame
    pub fn run<R: Read + Send>(&mut self, f: &mut R) -> Result<(), Error> {
        let mut reader = pcap_parser::create_reader(self.buffer_initial_capacity, f)?;

        self.analyzer.init()?;
        let mut ctx = ParseContext::default();
        let mut legacy_nanos = false;
        let mut last_incomplete_index = 0;

        while self.analyzer.wants_more() {
            match reader.next() {
                Ok((offset, block)) => {
                    let frame = match block {
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                            debug!("pcap-ng: new section");
                            ctx.interfaces = Vec::new();
                            reader.consume(offset);
                            continue;
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(ref idb)) => {
                            ctx.interfaces.push(pcapng_build_interface(idb));
                            reader.consume(offset);
                            continue;
                        }
                        PcapBlockOwned::LegacyHeader(ref hdr) => {
                            let if_info = InterfaceInfo {
                                link_type: hdr.network,
                                snaplen: hdr.snaplen,
                                ..InterfaceInfo::default()
                            };
                            legacy_nanos = hdr.is_nanosecond_precision();
                            debug!("Legacy pcap, link type: {}", hdr.network);
                            ctx.interfaces.push(if_info);
                            reader.consume(offset);
                            continue;
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(ref epb)) => {
                            let if_info = ctx
                                .interfaces
                                .get(epb.if_id as usize)
                                .ok_or(Error::Generic("EnhancedPacket: invalid interface ID"))?;
                            let ts = ng_timestamp(if_info, epb.ts_high, epb.ts_low);
                            let caplen = min(epb.caplen as usize, epb.data.len());
                            let data = get_packetdata(epb.data, if_info.link_type, caplen)
                                .ok_or(Error::Generic("Parsing PacketData failed (EnhancedPacket)"))?;
                            CapturedFrame {
                                interface: epb.if_id,
                                ts,
                                data,
                                caplen: caplen as u32,
                                origlen: epb.origlen,
                                pcap_index: ctx.pcap_index,
                            }
                        }
                        PcapBlockOwned::NG(Block::SimplePacket(ref spb)) => {
                            let if_info = ctx
                                .interfaces
                                .first()
                                .ok_or(Error::Generic("SimplePacket: no interface"))?;
                            let mut caplen = min(spb.origlen as usize, spb.data.len());
                            if if_info.snaplen > 0 {
                                caplen = min(caplen, if_info.snaplen as usize);
                            }
                            let data = get_packetdata(spb.data, if_info.link_type, caplen)
                                .ok_or(Error::Generic("Parsing PacketData failed (SimplePacket)"))?;
                            CapturedFrame {
                                interface: 0,
                                ts: Duration::default(),
                                data,
                                caplen: caplen as u32,
                                origlen: spb.origlen,
                                pcap_index: ctx.pcap_index,
                            }
                        }
                        PcapBlockOwned::Legacy(ref b) => {
                            let if_info = ctx
                                .interfaces
                                .first()
                                .ok_or(Error::Generic("Legacy packet without header"))?;
                            let ts = if legacy_nanos {
                                Duration::from_fraction(b.ts_sec, u64::from(b.ts_usec), 1_000_000_000)
                            } else {
                                Duration::new(b.ts_sec, b.ts_usec)
                            };
                            let caplen = min(b.caplen as usize, b.data.len());
                            let data = get_packetdata(b.data, if_info.link_type, caplen)
                                .ok_or(Error::Generic("Parsing PacketData failed (Legacy Packet)"))?;
                            CapturedFrame {
                                interface: 0,
                                ts,
                                data,
                                caplen: caplen as u32,
                                origlen: b.origlen,
                                pcap_index: ctx.pcap_index,
                            }
                        }
                        _ => {
                            trace!("ignoring block");
                            reader.consume(offset);
                            continue;
                        }
                    };
                    ctx.pcap_index += 1;
                    if ctx.first_packet_ts.is_null() {
                        ctx.first_packet_ts = frame.ts;
                    }
                    // an underflow is weird but not critical
                    ctx.rel_ts = frame.ts - ctx.first_packet_ts;
                    if ctx.pcap_index > self.skip_index {
                        debug!("    time  : {} (rel {})", frame.ts, ctx.rel_ts);
                        self.analyzer.handle_packet(&frame, &ctx)?;
                    }
                    reader.consume(offset);
                }
                Err(PcapError::Eof) => break,
                Err(PcapError::Incomplete(_)) => {
                    if last_incomplete_index == ctx.pcap_index && ctx.pcap_index > 0 {
                        warn!("Could not read complete data block.");
                        warn!("Hint: the reader buffer size may be too small, or the input file may be truncated.");
                        break;
                    }
                    last_incomplete_index = ctx.pcap_index;
                    debug!("refill");
                    reader.refill()?;
                }
                Err(e) => {
                    error!("error while reading: {:?}", e);
                    return Err(e.into());
                }
            }
        }

        self.analyzer.teardown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ng_timestamp_resolution() {
        let if_info = InterfaceInfo {
            ts_unit: 1_000_000_000,
            ..InterfaceInfo::default()
        };
        // 1.5 s in nanoseconds
        let ts = ng_timestamp(&if_info, 0, 1_500_000_000);
        assert_eq!(ts, Duration::new(1, 500_000));
        let if_info = InterfaceInfo::default();
        let ts = ng_timestamp(&if_info, 1, 0);
        assert_eq!(ts.secs, ((1u64 << 32) / 1_000_000) as u32);
    }
}
