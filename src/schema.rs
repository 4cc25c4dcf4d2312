//! Packet schemas: ordered, fixed-layout field lists.
//!
//! A schema's payload is the concatenation of each field's encoding in declared order,
//! so its width is the sum of the field widths. Two schemas ship with the crate, one
//! per deployment topology; both open with the `"P"`, `"4"`, version preamble.

use crate::codec::{CodecError, FieldCodec};
use crate::value::{Fields, Value};
use std::collections::HashSet;

/// Name of the result field carried by both built-in schemas.
pub const RES: &str = "res";

/// Schema text for the single-stage topology.
pub const SINGLE_STAGE_SRC: &str = r#"
packet P4calc {
    P: str(1) = "P";
    Four: str(1) = "4";
    version: byte = 0x01;
    max_pool_index: int32 = 0;
    data: int40le = 0xF0F0F0F0F0;
    replication: int32 = 0;
    res: int64 = 0;
}
"#;

/// Schema text for the two-stage cascade topology.
pub const CASCADE_SRC: &str = r#"
packet P4calc {
    P: str(1) = "P";
    Four: str(1) = "4";
    version: byte = 0x01;
    switch1_max_pool_index: int32 = 4;
    switch1_replication: int32 = 3;
    input_data: int64 = 0;
    replication: int32 = 0;
    res: int64 = 0;
    index: int32 = 0;
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub codec: FieldCodec,
    pub default: Option<Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, codec: FieldCodec) -> Self {
        Field {
            name: name.into(),
            codec,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Immutable ordered field list describing one payload layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketSchema {
    name: String,
    fields: Vec<Field>,
}

impl PacketSchema {
    /// Fails on duplicate field names or a default the field's codec cannot encode.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Result<Self, String> {
        let name = name.into();
        let mut seen = HashSet::new();
        for f in &fields {
            if !seen.insert(f.name.as_str()) {
                return Err(format!("packet {}: duplicate field {}", name, f.name));
            }
            if let Some(ref d) = f.default {
                let mut scratch = Vec::new();
                f.codec
                    .encode(&f.name, d, &mut scratch)
                    .map_err(|e| format!("packet {}: bad default: {}", name, e))?;
            }
        }
        Ok(PacketSchema { name, fields })
    }

    /// Schema A: single-stage processing.
    pub fn single_stage() -> Self {
        PacketSchema {
            name: "P4calc".to_string(),
            fields: with_preamble(vec![
                Field::new("max_pool_index", FieldCodec::int32()).with_default(0u32),
                Field::new("data", FieldCodec::int40_le()).with_default(0xF0F0F0F0F0u64),
                Field::new("replication", FieldCodec::int32()).with_default(0u32),
                Field::new(RES, FieldCodec::int64()).with_default(0u64),
            ]),
        }
    }

    /// Schema B: two-stage cascade.
    pub fn cascade() -> Self {
        PacketSchema {
            name: "P4calc".to_string(),
            fields: with_preamble(vec![
                Field::new("switch1_max_pool_index", FieldCodec::int32()).with_default(4u32),
                Field::new("switch1_replication", FieldCodec::int32()).with_default(3u32),
                Field::new("input_data", FieldCodec::int64()).with_default(0u64),
                Field::new("replication", FieldCodec::int32()).with_default(0u32),
                Field::new(RES, FieldCodec::int64()).with_default(0u64),
                Field::new("index", FieldCodec::int32()).with_default(0u32),
            ]),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Sum of all field widths.
    pub fn total_width(&self) -> usize {
        self.fields.iter().map(|f| f.codec.width()).sum()
    }

    /// Mapping of every field that declares a default.
    pub fn defaults(&self) -> Fields {
        self.fields
            .iter()
            .filter_map(|f| f.default.clone().map(|d| (f.name.clone(), d)))
            .collect()
    }

    /// Encode with every field supplied by the caller.
    pub fn encode(&self, values: &Fields) -> Result<Vec<u8>, CodecError> {
        self.encode_inner(values, false)
    }

    /// Encode, filling absent fields from their declared defaults.
    pub fn encode_with_defaults(&self, values: &Fields) -> Result<Vec<u8>, CodecError> {
        self.encode_inner(values, true)
    }

    fn encode_inner(&self, values: &Fields, use_defaults: bool) -> Result<Vec<u8>, CodecError> {
        if let Some(unknown) = values.keys().find(|k| self.field(k).is_none()) {
            return Err(CodecError::UnknownField(unknown.clone()));
        }
        let mut out = Vec::with_capacity(self.total_width());
        for f in &self.fields {
            let v = match values.get(&f.name) {
                Some(v) => v,
                None if use_defaults => f
                    .default
                    .as_ref()
                    .ok_or_else(|| CodecError::MissingField(f.name.clone()))?,
                None => return Err(CodecError::MissingField(f.name.clone())),
            };
            f.codec.encode(&f.name, v, &mut out)?;
        }
        Ok(out)
    }

    /// Decode one payload. Bytes past `total_width()` are ignored.
    pub fn decode(&self, bytes: &[u8]) -> Result<Fields, CodecError> {
        let mut out = Fields::with_capacity(self.fields.len());
        let mut offset = 0;
        for f in &self.fields {
            let rest = bytes.get(offset..).unwrap_or(&[]);
            let v = f.codec.decode(&f.name, rest)?;
            offset += f.codec.width();
            out.insert(f.name.clone(), v);
        }
        Ok(out)
    }
}

fn with_preamble(mut rest: Vec<Field>) -> Vec<Field> {
    let mut fields = vec![
        Field::new("P", FieldCodec::FixedStr(1)).with_default("P"),
        Field::new("Four", FieldCodec::FixedStr(1)).with_default("4"),
        Field::new("version", FieldCodec::Byte).with_default(0x01u8),
    ];
    fields.append(&mut rest);
    fields
}
