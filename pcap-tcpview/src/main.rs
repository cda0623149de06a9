#![warn(clippy::all)]

use clap::{crate_version, Parser};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use xz2::read::XzDecoder;

use libpcap_tcpview::{ParseOutcome, PacketRecord};
use libpcap_tools::{CapturedFrame, Config, Error, ParseContext, PcapAnalyzer, PcapEngine};

/// Show the TCP/IP packets of a pcap file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<String>,

    /// Number of packets to skip
    #[arg(short, long, default_value_t = 0)]
    skip: u32,

    /// Stop after this number of TCP packets
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Print one line per packet instead of the full description
    #[arg(long)]
    summary: bool,

    /// Be verbose
    #[arg(short, long)]
    verbose: bool,

    /// Input file, or "-" for stdin
    input: Option<String>,
}

#[derive(Debug, Default)]
struct Stats {
    frames: usize,
    tcp: usize,
    skipped: usize,
    malformed: usize,
    truncated: usize,
    anomalies: usize,
}

struct TcpView<W: Write> {
    out: W,
    summary: bool,
    max_packets: usize,
    stats: Stats,
}

impl<W: Write> TcpView<W> {
    fn new(out: W, config: &Config) -> Self {
        TcpView {
            out,
            summary: config.get_bool("output.summary").unwrap_or(false),
            max_packets: config.get_usize("max_packets").unwrap_or(0),
            stats: Stats::default(),
        }
    }

    fn write_record(
        &mut self,
        frame: &CapturedFrame,
        ctx: &ParseContext,
        record: &PacketRecord,
    ) -> io::Result<()> {
        if self.summary {
            let ts = record.timestamp();
            writeln!(
                self.out,
                "{} {}.{:06} +{} {} -> {} [{}] seq={} ack={} win={} len={} lost={}",
                frame.pcap_index,
                ts.unix_timestamp(),
                ts.microsecond(),
                ctx.rel_ts,
                record.source_socket(),
                record.destination_socket(),
                record.flags_summary(),
                record.tcp().sequence,
                record.tcp().acknowledgement,
                record.tcp().window,
                record.payload_len(),
                record.lost_bytes()
            )
        } else {
            writeln!(
                self.out,
                "Packet: {} (interface {}, +{})\n{}\n",
                frame.pcap_index, frame.interface, ctx.rel_ts, record
            )
        }
    }
}

impl<W: Write> PcapAnalyzer for TcpView<W> {
    fn handle_packet(&mut self, frame: &CapturedFrame, ctx: &ParseContext) -> Result<(), Error> {
        self.stats.frames += 1;
        if frame.is_truncated() {
            debug!(
                "frame {}: captured {} of {} bytes",
                frame.pcap_index, frame.caplen, frame.origlen
            );
        }
        match libpcap_tcpview::parse(frame) {
            Ok(ParseOutcome::Full(record)) => {
                self.stats.tcp += 1;
                if record.is_truncated() {
                    self.stats.truncated += 1;
                }
                if let Some(anomaly) = record.length_anomaly() {
                    self.stats.anomalies += 1;
                    warn!("frame {}: {}", frame.pcap_index, anomaly);
                }
                self.write_record(frame, ctx, &record)?;
            }
            Ok(ParseOutcome::Skip(reason)) => {
                self.stats.skipped += 1;
                debug!("frame {}: skipped, {}", frame.pcap_index, reason);
            }
            Err(e) => {
                self.stats.malformed += 1;
                warn!("frame {}: {}", frame.pcap_index, e);
            }
        }
        Ok(())
    }

    fn teardown(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!("could not flush output: {}", e);
        }
        info!(
            "{} frames: {} TCP ({} truncated, {} length anomalies), {} skipped, {} malformed",
            self.stats.frames,
            self.stats.tcp,
            self.stats.truncated,
            self.stats.anomalies,
            self.stats.skipped,
            self.stats.malformed
        );
    }

    fn wants_more(&self) -> bool {
        self.max_packets == 0 || self.stats.tcp < self.max_packets
    }
}

fn load_config(config: &mut Config, filename: &str) -> Result<(), io::Error> {
    debug!("Loading configuration {filename}");
    let path = Path::new(&filename);
    let file = File::open(path)?;
    config.load_config(file)
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    let env_filter = EnvFilter::try_from_env("PCAP_TCPVIEW_LOG")
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .compact()
        .init();

    info!("pcap-tcpview {}", crate_version!());

    // load config
    let mut config = Config::default();
    if let Some(filename) = args.config.as_ref() {
        load_config(&mut config, filename)?;
    }
    // override config options from command-line arguments
    config.set("skip_index", args.skip);
    if let Some(count) = args.count {
        config.set("max_packets", count);
    }
    if args.summary {
        config.set("output.summary", true);
    }

    let input_filename = match args.input.as_ref() {
        Some(s) => s.as_str(),
        None => {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "Input file name cannot be empty",
            ));
        }
    };

    let mut input_reader = if input_filename == "-" {
        Box::new(io::stdin())
    } else {
        let path = Path::new(input_filename);
        let file = File::open(path)?;
        if input_filename.ends_with(".gz") {
            Box::new(GzDecoder::new(file))
        } else if input_filename.ends_with(".xz") {
            Box::new(XzDecoder::new(file))
        } else {
            Box::new(file) as Box<dyn io::Read + Send>
        }
    };

    let stdout = io::stdout();
    let analyzer = TcpView::new(BufWriter::new(stdout.lock()), &config);
    let mut engine = PcapEngine::new(analyzer, &config);
    engine
        .run(&mut input_reader)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    info!("pcap-tcpview: done, exiting");
    Ok(())
}
