//! Decode P4calc frames from a pcap / pcapng capture.
//!
//! Usage:
//!   decode_pcap [--topology single|cascade] [--verbose] [--frame N] CAPTURE
//!
//! Every EtherType 0x1234 frame is decoded with the topology's schema and printed;
//! `--verbose` adds a hexdump, `--frame=N` limits output to packet number N.

use clap::Parser;
use p4calc::capture::decode_capture;
use p4calc::dump::{hexdump, show_frame};
use p4calc::{Dispatcher, Topology};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "decode_pcap", about = "Decode P4calc frames from a pcap / pcapng capture")]
struct Args {
    /// Deployment topology selecting the packet schema.
    #[arg(long, default_value_t = Topology::SingleStage)]
    topology: Topology,

    /// Hexdump every shown payload.
    #[arg(short, long)]
    verbose: bool,

    /// Only show packet number N.
    #[arg(long, value_name = "N")]
    frame: Option<u64>,

    /// Capture file to read.
    capture: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let Args {
        topology,
        verbose,
        frame: frame_filter,
        capture: capture_path,
    } = Args::parse();

    let dispatcher = Dispatcher::for_topology(topology);
    let summary = decode_capture(&capture_path, &dispatcher)?;

    let mut decoded = 0u64;
    let mut failed = 0u64;
    for captured in &summary.frames {
        let shown = frame_filter.map_or(true, |n| n == captured.index);
        match &captured.decoded {
            Ok(values) => {
                decoded += 1;
                if shown {
                    println!("packet {}:", captured.index);
                    print!("{}", show_frame(&captured.frame, dispatcher.schema(), values));
                }
            }
            Err(e) => {
                failed += 1;
                if shown {
                    println!("packet {}: {}", captured.index, e);
                }
            }
        }
        if shown && verbose {
            print!("{}", hexdump(&captured.frame.payload));
        }
    }

    eprintln!("capture:  {}", capture_path.display());
    eprintln!("topology: {}", topology);
    eprintln!("packets:  {}", summary.packets);
    eprintln!("skipped (not 0x1234): {}", summary.skipped);
    eprintln!("decoded:  {}", decoded);
    eprintln!("failed:   {}", failed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_in_either_form() {
        let args = Args::try_parse_from([
            "decode_pcap",
            "--topology",
            "cascade",
            "-v",
            "--frame=3",
            "cap.pcap",
        ])
        .expect("args should parse");
        assert_eq!(args.topology, Topology::Cascade);
        assert!(args.verbose);
        assert_eq!(args.frame, Some(3));
        assert_eq!(args.capture, PathBuf::from("cap.pcap"));
    }

    #[test]
    fn defaults_to_single_stage_and_all_frames() {
        let args = Args::try_parse_from(["decode_pcap", "cap.pcap"]).unwrap();
        assert_eq!(args.topology, Topology::SingleStage);
        assert!(!args.verbose);
        assert_eq!(args.frame, None);
    }

    #[test]
    fn rejects_malformed_frame_number() {
        let err = Args::try_parse_from(["decode_pcap", "--frame=abc", "cap.pcap"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_unknown_topology() {
        let err = Args::try_parse_from(["decode_pcap", "--topology", "ring", "cap.pcap"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn requires_capture_path() {
        let err = Args::try_parse_from(["decode_pcap", "--topology", "cascade"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
