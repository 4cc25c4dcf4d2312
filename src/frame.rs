//! Ethernet II framing: addresses, EtherType and the header/payload split.

use byteorder::{ByteOrder, NetworkEndian};
use std::fmt;
use std::str::FromStr;

/// EtherType tagging a calculator payload.
pub const CALC_ETHERTYPE: EtherType = EtherType(0x1234);

/// Destination, source, EtherType.
pub const HEADER_LEN: usize = 14;

/// Shortest frame the wire accepts, without FCS. Shorter frames are zero-padded on send.
pub const MIN_FRAME_LEN: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame of {0} bytes is shorter than the ethernet header")]
    Truncated(usize),
    #[error("invalid link address {0:?}")]
    BadAddress(String),
}

/// A six-octet Ethernet II address.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = FrameError;

    fn from_str(src: &str) -> Result<Self, FrameError> {
        let bad = || FrameError::BadAddress(src.to_string());
        let mut parsed = [0u8; 6];
        let mut parts = src.split(|c: char| c == ':' || c == '-');
        for octet in parsed.iter_mut() {
            let part = parts.next().ok_or_else(bad)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(bad());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| bad())?;
        }
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(MacAddr(parsed))
    }
}

/// 16-bit link-layer payload type tag.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub struct EtherType(pub u16);

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// One Ethernet II frame. Transient: built per request, parsed per reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: EtherType,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Serialize, zero-padding to [`MIN_FRAME_LEN`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((HEADER_LEN + self.payload.len()).max(MIN_FRAME_LEN));
        out.extend_from_slice(self.dst.as_bytes());
        out.extend_from_slice(self.src.as_bytes());
        let mut ty = [0u8; 2];
        NetworkEndian::write_u16(&mut ty, self.ethertype.0);
        out.extend_from_slice(&ty);
        out.extend_from_slice(&self.payload);
        if out.len() < MIN_FRAME_LEN {
            out.resize(MIN_FRAME_LEN, 0);
        }
        out
    }

    /// Split a raw frame; everything after the header is payload, padding included.
    pub fn parse(bytes: &[u8]) -> Result<Frame, FrameError> {
        if bytes.len() < HEADER_LEN {
            return Err(FrameError::Truncated(bytes.len()));
        }
        let mut dst = [0u8; 6];
        let mut src = [0u8; 6];
        dst.copy_from_slice(&bytes[0..6]);
        src.copy_from_slice(&bytes[6..12]);
        Ok(Frame {
            dst: MacAddr(dst),
            src: MacAddr(src),
            ethertype: EtherType(NetworkEndian::read_u16(&bytes[12..14])),
            payload: bytes[HEADER_LEN..].to_vec(),
        })
    }
}
