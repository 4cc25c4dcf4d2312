//! Human-readable rendering of packets: field listing, hexdump, binary result.

use crate::frame::Frame;
use crate::schema::PacketSchema;
use crate::value::{Fields, Value};
use std::fmt::Write;

/// Render one value: integers in hex, byte strings quoted when printable.
pub fn format_value(v: &Value) -> String {
    match v {
        Value::U8(x) => format!("{:#04x}", x),
        Value::U32(x) => format!("{:#x}", x),
        Value::U64(x) => format!("{:#x}", x),
        Value::Bytes(b) => {
            if b.iter().all(|c| c.is_ascii_graphic() || *c == b' ') {
                format!("'{}'", String::from_utf8_lossy(b))
            } else {
                format!("0x{}", b.iter().map(|c| format!("{:02x}", c)).collect::<String>())
            }
        }
    }
}

/// Field-per-line listing in schema order.
pub fn show(schema: &PacketSchema, values: &Fields) -> String {
    let pad = schema.fields().iter().map(|f| f.name.len()).max().unwrap_or(0);
    let mut out = format!("###[ {} ]###\n", schema.name());
    for f in schema.fields() {
        let rendered = values
            .get(&f.name)
            .or(f.default.as_ref())
            .map(format_value)
            .unwrap_or_else(|| "<unset>".to_string());
        let _ = writeln!(out, "  {:<pad$} = {}", f.name, rendered, pad = pad);
    }
    out
}

/// Ethernet header line followed by [`show`] of the payload.
pub fn show_frame(frame: &Frame, schema: &PacketSchema, values: &Fields) -> String {
    format!(
        "###[ Ethernet ]###\n  dst  = {}\n  src  = {}\n  type = {}\n{}",
        frame.dst,
        frame.src,
        frame.ethertype,
        show(schema, values)
    )
}

/// Classic 16-bytes-per-line hexdump with an ASCII column.
pub fn hexdump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        let _ = writeln!(out, "{:04x}  {:<47}  {}", i * 16, hex.join(" "), ascii);
    }
    out
}

/// 64-bit zero-padded binary rendering of a result.
pub fn format_binary(res: u64) -> String {
    format!("{:064b}", res)
}
