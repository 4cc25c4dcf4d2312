//! Binds a payload schema to the calculator EtherType.
//!
//! The schema is chosen by deployment topology, never detected from wire data.

use crate::codec::CodecError;
use crate::frame::{EtherType, Frame, MacAddr, CALC_ETHERTYPE};
use crate::schema::PacketSchema;
use crate::value::Fields;
use std::fmt;
use std::str::FromStr;

/// Pad byte sent after the schema payload.
pub const TRAILER: u8 = b' ';

/// Which processing pipeline sits behind the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    #[default]
    SingleStage,
    Cascade,
}

impl Topology {
    pub fn schema(self) -> PacketSchema {
        match self {
            Topology::SingleStage => PacketSchema::single_stage(),
            Topology::Cascade => PacketSchema::cascade(),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Topology::SingleStage => "single",
            Topology::Cascade => "cascade",
        })
    }
}

impl FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "single" | "single-stage" | "a" => Ok(Topology::SingleStage),
            "cascade" | "two-stage" | "b" => Ok(Topology::Cascade),
            other => Err(format!("unknown topology {:?} (expected single or cascade)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    ethertype: EtherType,
    schema: PacketSchema,
}

impl Dispatcher {
    pub fn new(schema: PacketSchema) -> Self {
        Dispatcher {
            ethertype: CALC_ETHERTYPE,
            schema,
        }
    }

    pub fn for_topology(topology: Topology) -> Self {
        Self::new(topology.schema())
    }

    pub fn schema(&self) -> &PacketSchema {
        &self.schema
    }

    pub fn ethertype(&self) -> EtherType {
        self.ethertype
    }

    /// Encode `values` (absent fields take defaults) into a frame for `dst`.
    pub fn wrap(&self, dst: MacAddr, src: MacAddr, values: &Fields) -> Result<Frame, CodecError> {
        let mut payload = self.schema.encode_with_defaults(values)?;
        payload.push(TRAILER);
        Ok(Frame {
            dst,
            src,
            ethertype: self.ethertype,
            payload,
        })
    }

    pub fn accepts(&self, frame: &Frame) -> bool {
        frame.ethertype == self.ethertype
    }

    /// `Ok(None)` when the frame carries another EtherType.
    pub fn decode(&self, frame: &Frame) -> Result<Option<Fields>, CodecError> {
        if !self.accepts(frame) {
            return Ok(None);
        }
        self.schema.decode(&frame.payload).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{fields, Value};

    #[test]
    fn topology_names() {
        assert_eq!("single".parse::<Topology>().unwrap(), Topology::SingleStage);
        assert_eq!("cascade".parse::<Topology>().unwrap(), Topology::Cascade);
        assert!("ring".parse::<Topology>().is_err());
        assert_eq!(Topology::Cascade.to_string(), "cascade");
    }

    #[test]
    fn wrap_then_decode() {
        let d = Dispatcher::for_topology(Topology::Cascade);
        let f = d
            .wrap(MacAddr::BROADCAST, MacAddr::default(), &fields([("input_data", 0x11u64)]))
            .unwrap();
        assert_eq!(f.ethertype, CALC_ETHERTYPE);
        assert_eq!(f.payload.len(), d.schema().total_width() + 1);
        assert_eq!(f.payload.last(), Some(&TRAILER));
        let decoded = d.decode(&f).unwrap().unwrap();
        assert_eq!(decoded.get("input_data"), Some(&Value::U64(0x11)));
    }

    #[test]
    fn other_ethertype_is_not_a_candidate() {
        let d = Dispatcher::for_topology(Topology::SingleStage);
        let mut f = d.wrap(MacAddr::BROADCAST, MacAddr::default(), &Fields::new()).unwrap();
        f.ethertype = EtherType(0x0800);
        assert!(!d.accepts(&f));
        assert_eq!(d.decode(&f).unwrap(), None);
    }
}
