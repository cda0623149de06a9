use assert_cmd::Command;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

// little-endian, version 2.4, snaplen 65535, Ethernet
const PCAP_HEADER: [u8; 24] = [
    0xd4, 0xc3, 0xb2, 0xa1, 0x02, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
];

/// Ethernet + IPv4 + TCP (no options) from 10.0.0.1:`sport` to 10.0.0.2:80
fn tcp_frame(sport: u16, flags: u8, payload: &[u8], extra_declared: u16) -> Vec<u8> {
    let total_length = 40 + payload.len() as u16 + extra_declared;
    let mut frame = vec![
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0x08, 0x00,
    ];
    frame.extend_from_slice(&[0x45, 0x00]);
    frame.extend_from_slice(&total_length.to_be_bytes());
    frame.extend_from_slice(&[
        0x00, 0x01, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00,
        0x02,
    ]);
    frame.extend_from_slice(&sport.to_be_bytes());
    frame.extend_from_slice(&[
        0x00, 0x50, 0x00, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x50, flags, 0x20, 0x00,
        0x00, 0x00, 0x00, 0x00,
    ]);
    frame.extend_from_slice(payload);
    frame
}

fn arp_frame() -> Vec<u8> {
    let mut frame = vec![
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0x08, 0x06,
    ];
    frame.extend_from_slice(&[0u8; 28]);
    frame
}

fn pcap_file(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut data = PCAP_HEADER.to_vec();
    for (i, frame) in frames.iter().enumerate() {
        let len = frame.len() as u32;
        data.extend_from_slice(&1_600_000_000u32.to_le_bytes());
        data.extend_from_slice(&(i as u32 * 1000).to_le_bytes());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(frame);
    }
    data
}

fn write_temp(name: &str, data: &[u8]) -> PathBuf {
    let path = env::temp_dir().join(format!("pcap-tcpview-{}-{}", std::process::id(), name));
    fs::write(&path, data).unwrap();
    path
}

fn capture() -> Vec<u8> {
    pcap_file(&[
        tcp_frame(1234, 0x02, &[], 0),
        arp_frame(),
        tcp_frame(1234, 0x18, b"hello", 20),
    ])
}

#[test]
fn cli_help() {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.arg("--help").assert().success();
}

#[test]
fn cli_missing_input() {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.assert().failure();
}

#[test]
fn cli_describe() {
    let path = write_temp("describe.pcap", &capture());
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    let output = cmd.arg(&path).output().unwrap();
    fs::remove_file(&path).unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.matches("Source: 10.0.0.1:1234").count(), 2);
    assert!(stdout.contains("Destination: 10.0.0.2:80"));
    assert!(stdout.contains("Flag: SYN"));
    assert!(stdout.contains("Flag: PSH, ACK"));
    assert!(stdout.contains("Data Size: 5"));
    assert!(stdout.contains("Lost Data: 20"));
    assert!(stdout.contains("Packet: 2 (interface 0, +0.002000)"));
}

#[test]
fn cli_summary_and_count() {
    let path = write_temp("summary.pcap", &capture());
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    let output = cmd
        .arg("--summary")
        .args(["--count", "1"])
        .arg(&path)
        .output()
        .unwrap();
    fs::remove_file(&path).unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("1600000000.000000 +0.000000 10.0.0.1:1234 -> 10.0.0.2:80 [SYN]"));
    assert!(lines[0].ends_with("len=0 lost=0"));
}

#[test]
fn cli_skip_and_gzip_input() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&capture()).unwrap();
    let path = write_temp("skip.pcap.gz", &encoder.finish().unwrap());
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    let output = cmd
        .arg("--summary")
        .args(["--skip", "1"])
        .arg(&path)
        .output()
        .unwrap();
    fs::remove_file(&path).unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("[PSH, ACK]"));
    // relative to the first frame of the file, skipped or not
    assert!(lines[0].contains("1600000000.002000 +0.002000 "));
    assert!(lines[0].ends_with("len=5 lost=20"));
}
