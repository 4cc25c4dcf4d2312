//! Parse schema text into [`PacketSchema`] values using PEST.
//!
//! ```text
//! packet P4calc {
//!     P: str(1) = "P";
//!     version: byte = 0x01;
//!     data: int40le = 0xF0F0F0F0F0;
//!     res: int64;
//! }
//! ```
//!
//! Integer types: `byte`, `int32`, `int64` (network order), `int32le`, `int64le`,
//! `int40le`, `int40be`. Fixed strings: `str(n)`.

use crate::codec::{Endianness, FieldCodec, FixedWidthIntCodec};
use crate::schema::{Field, PacketSchema};
use crate::value::Value;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct SchemaParser;

/// Parse every packet block in `source`.
pub fn parse(source: &str) -> Result<Vec<PacketSchema>, String> {
    let pairs = SchemaParser::parse(Rule::schema, source)
        .map_err(|e| format!("Parse error: {}", e))?;
    let schema = pairs.into_iter().next().ok_or("Empty parse")?;
    let mut packets = Vec::new();
    for inner in schema.into_inner() {
        if inner.as_rule() == Rule::packet {
            packets.push(build_packet(inner)?);
        }
    }
    Ok(packets)
}

/// Parse source holding exactly one packet block.
pub fn parse_schema(source: &str) -> Result<PacketSchema, String> {
    let mut packets = parse(source)?;
    match packets.len() {
        1 => Ok(packets.remove(0)),
        n => Err(format!("expected one packet, found {}", n)),
    }
}

fn build_packet(pair: pest::iterators::Pair<Rule>) -> Result<PacketSchema, String> {
    let mut name = String::new();
    let mut fields = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::field => fields.push(build_field(inner)?),
            _ => {}
        }
    }
    PacketSchema::new(name, fields)
}

fn build_field(pair: pest::iterators::Pair<Rule>) -> Result<Field, String> {
    let mut name = String::new();
    let mut codec = None;
    let mut default = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::field_type => codec = Some(build_field_type(inner)?),
            Rule::literal => default = Some(inner),
            _ => {}
        }
    }
    let codec = codec.ok_or_else(|| format!("field {}: missing type", name))?;
    let default = match default {
        Some(lit) => Some(build_default(&name, &codec, lit)?),
        None => None,
    };
    Ok(Field {
        name,
        codec,
        default,
    })
}

fn build_field_type(pair: pest::iterators::Pair<Rule>) -> Result<FieldCodec, String> {
    let inner = pair.into_inner().next().ok_or("Empty field type")?;
    match inner.as_rule() {
        Rule::str_type => {
            let n: usize = inner
                .into_inner()
                .next()
                .and_then(|p| p.as_str().parse().ok())
                .ok_or("str(n) needs number")?;
            if n == 0 {
                return Err("str(n) needs n > 0".to_string());
            }
            Ok(FieldCodec::FixedStr(n))
        }
        Rule::int_type => parse_int_type(inner.as_str()),
        _ => Err("Unknown field type".to_string()),
    }
}

fn parse_int_type(s: &str) -> Result<FieldCodec, String> {
    Ok(match s {
        "byte" => FieldCodec::Byte,
        "int32" => FieldCodec::int32(),
        "int64" => FieldCodec::int64(),
        "int32le" => FieldCodec::Int(FixedWidthIntCodec::new(4, Endianness::Little)),
        "int64le" => FieldCodec::Int(FixedWidthIntCodec::new(8, Endianness::Little)),
        "int40le" => FieldCodec::int40_le(),
        "int40be" => FieldCodec::int40_be(),
        other => return Err(format!("Unknown int type: {}", other)),
    })
}

/// Convert a default literal to the value variant its codec decodes to.
fn build_default(
    field: &str,
    codec: &FieldCodec,
    pair: pest::iterators::Pair<Rule>,
) -> Result<Value, String> {
    let lit = pair.into_inner().next().ok_or("Empty literal")?;
    let text = lit.as_str();
    match (codec, lit.as_rule()) {
        (FieldCodec::FixedStr(_), Rule::string) => {
            Ok(Value::Bytes(text[1..text.len() - 1].as_bytes().to_vec()))
        }
        (FieldCodec::FixedStr(_), _) => Err(format!("field {}: default must be a string", field)),
        (_, Rule::string) => Err(format!("field {}: default must be a number", field)),
        (_, rule) => {
            let n = if rule == Rule::hex {
                u64::from_str_radix(&text[2..], 16)
            } else {
                text.parse::<u64>()
            }
            .map_err(|e| format!("field {}: bad number {}: {}", field, text, e))?;
            Ok(match codec {
                FieldCodec::Byte => Value::U8(
                    u8::try_from(n).map_err(|_| format!("field {}: {} does not fit a byte", field, text))?,
                ),
                FieldCodec::Int(c) if c.width <= 4 => Value::U32(
                    u32::try_from(n).map_err(|_| format!("field {}: {} does not fit {} bytes", field, text, c.width))?,
                ),
                _ => Value::U64(n),
            })
        }
    }
}
