//! Offline decoding of captured exchanges (pcap / pcapng files).

use crate::codec::CodecError;
use crate::dispatch::Dispatcher;
use crate::frame::Frame;
use crate::value::Fields;
use pcap_parser::pcapng::Block as PcapNgBlock;
use pcap_parser::traits::{PcapNGPacketBlock, PcapReaderIterator};
use pcap_parser::{Linktype, PcapBlockOwned, PcapError};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];
const READER_CAPACITY: usize = 1 << 20;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("pcap: {0}")]
    Pcap(String),
}

/// One calculator frame found in a capture.
#[derive(Debug)]
pub struct CapturedFrame {
    /// 1-based packet number within the capture.
    pub index: u64,
    pub frame: Frame,
    pub decoded: Result<Fields, CodecError>,
}

#[derive(Debug, Default)]
pub struct CaptureSummary {
    pub packets: u64,
    /// Packets that were not Ethernet, were runts, or carried another EtherType.
    pub skipped: u64,
    pub frames: Vec<CapturedFrame>,
}

/// Raw Ethernet frames of a pcap or pcapng file, in capture order.
/// Packets on non-Ethernet interfaces are returned as `None`.
pub fn read_ethernet_frames(path: &Path) -> Result<Vec<Option<Vec<u8>>>, CaptureError> {
    let mut probe = [0u8; 4];
    File::open(path)?.read_exact(&mut probe)?;
    let file = File::open(path)?;
    if probe == PCAPNG_MAGIC {
        read_pcapng(file)
    } else {
        read_legacy(file)
    }
}

fn read_legacy<R: Read>(file: R) -> Result<Vec<Option<Vec<u8>>>, CaptureError> {
    let mut reader = pcap_parser::pcap::LegacyPcapReader::new(READER_CAPACITY, file)
        .map_err(|e| CaptureError::Pcap(format!("{:?}", e)))?;
    let mut linktype = Linktype::ETHERNET;
    let mut out = Vec::new();
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                match block {
                    PcapBlockOwned::LegacyHeader(h) => linktype = h.network,
                    PcapBlockOwned::Legacy(b) => {
                        out.push((linktype == Linktype::ETHERNET).then(|| b.data.to_vec()));
                    }
                    PcapBlockOwned::NG(_) => {}
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| CaptureError::Pcap(format!("refill: {:?}", e)))?;
            }
            Err(e) => return Err(CaptureError::Pcap(format!("{:?}", e))),
        }
    }
    Ok(out)
}

fn read_pcapng<R: Read>(file: R) -> Result<Vec<Option<Vec<u8>>>, CaptureError> {
    let mut reader = pcap_parser::pcapng::PcapNGReader::new(READER_CAPACITY, file)
        .map_err(|e| CaptureError::Pcap(format!("{:?}", e)))?;
    let mut if_linktypes: Vec<Linktype> = Vec::new();
    let mut out = Vec::new();
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                if let PcapBlockOwned::NG(b) = block {
                    match &b {
                        PcapNgBlock::InterfaceDescription(idb) => if_linktypes.push(idb.linktype),
                        PcapNgBlock::EnhancedPacket(epb) => {
                            let lt = if_linktypes.get(epb.if_id as usize).copied().unwrap_or(Linktype::ETHERNET);
                            out.push((lt == Linktype::ETHERNET).then(|| epb.packet_data().to_vec()));
                        }
                        PcapNgBlock::SimplePacket(spb) => {
                            let lt = if_linktypes.first().copied().unwrap_or(Linktype::ETHERNET);
                            out.push((lt == Linktype::ETHERNET).then(|| spb.packet_data().to_vec()));
                        }
                        _ => {}
                    }
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| CaptureError::Pcap(format!("refill: {:?}", e)))?;
            }
            Err(e) => return Err(CaptureError::Pcap(format!("{:?}", e))),
        }
    }
    Ok(out)
}

/// Decode every calculator frame of a capture with the dispatcher's schema.
pub fn decode_capture(path: &Path, dispatcher: &Dispatcher) -> Result<CaptureSummary, CaptureError> {
    let mut summary = CaptureSummary::default();
    for raw in read_ethernet_frames(path)? {
        summary.packets += 1;
        let frame = match raw.as_deref().map(Frame::parse) {
            Some(Ok(f)) if dispatcher.accepts(&f) => f,
            _ => {
                summary.skipped += 1;
                continue;
            }
        };
        let decoded = dispatcher.schema().decode(&frame.payload);
        summary.frames.push(CapturedFrame {
            index: summary.packets,
            frame,
            decoded,
        });
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Topology;
    use crate::frame::{EtherType, MacAddr};
    use crate::value::{fields, Value};
    use std::io::Write;

    fn legacy_pcap(frames: &[Vec<u8>]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let mut header = Vec::new();
        header.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
        header.extend_from_slice(&2u16.to_le_bytes());
        header.extend_from_slice(&4u16.to_le_bytes());
        header.extend_from_slice(&0i32.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&65535u32.to_le_bytes());
        header.extend_from_slice(&1u32.to_le_bytes());
        f.write_all(&header).unwrap();
        for (i, frame) in frames.iter().enumerate() {
            let mut rec = Vec::new();
            rec.extend_from_slice(&(i as u32).to_le_bytes());
            rec.extend_from_slice(&0u32.to_le_bytes());
            rec.extend_from_slice(&(frame.len() as u32).to_le_bytes());
            rec.extend_from_slice(&(frame.len() as u32).to_le_bytes());
            rec.extend_from_slice(frame);
            f.write_all(&rec).unwrap();
        }
        f.flush().unwrap();
        f
    }

    #[test]
    fn decodes_calculator_frames_and_skips_others() {
        let d = Dispatcher::for_topology(Topology::SingleStage);
        let req = d
            .wrap(MacAddr([0, 4, 0, 0, 0, 0]), MacAddr([2, 0, 0, 0, 0, 1]), &fields([("res", 7u64)]))
            .unwrap();
        let mut other = req.clone();
        other.ethertype = EtherType(0x0806);
        let file = legacy_pcap(&[other.to_bytes(), req.to_bytes(), vec![1, 2, 3]]);

        let summary = decode_capture(file.path(), &d).unwrap();
        assert_eq!(summary.packets, 3);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.frames.len(), 1);
        let captured = &summary.frames[0];
        assert_eq!(captured.index, 2);
        let decoded = captured.decoded.as_ref().unwrap();
        assert_eq!(decoded.get("res"), Some(&Value::U64(7)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_ethernet_frames(Path::new("/nonexistent/capture.pcap")).unwrap_err();
        assert!(matches!(err, CaptureError::Io(_)));
    }
}
