//! Fixed-width field codecs.
//!
//! Every codec has a width fixed at construction: encode writes exactly `width` bytes,
//! decode reads exactly `width` bytes from the front of its input and never more.
//! Integer fields go through [`FixedWidthIntCodec`], which carries its byte order and
//! overflow policy explicitly so the two 40-bit layouts are chosen by name at the call
//! site (`int40_le` / `int40_be`) rather than by convention.

use crate::value::Value;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

/// What an integer codec does with a value wider than its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Fail with [`CodecError::Range`].
    Reject,
    /// Keep the low `width` bytes.
    Truncate,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("field {field}: value {value:#x} does not fit in {width} bytes")]
    Range {
        field: String,
        value: u64,
        width: usize,
    },
    #[error("field {field}: {len} bytes given for fixed length {width}")]
    Length {
        field: String,
        len: usize,
        width: usize,
    },
    #[error("field {field}: needs {needed} bytes, {remaining} remaining")]
    Truncated {
        field: String,
        needed: usize,
        remaining: usize,
    },
    #[error("missing field: {0}")]
    MissingField(String),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field {field}: expected {expected} value")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
}

/// Unsigned integer codec of 1..=8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWidthIntCodec {
    pub width: usize,
    pub endianness: Endianness,
    pub overflow: OverflowPolicy,
}

impl FixedWidthIntCodec {
    /// Codec rejecting out-of-range values.
    ///
    /// # Panics
    /// If `width` is not in `1..=8`.
    pub const fn new(width: usize, endianness: Endianness) -> Self {
        assert!(width >= 1 && width <= 8, "integer width must be 1..=8 bytes");
        FixedWidthIntCodec {
            width,
            endianness,
            overflow: OverflowPolicy::Reject,
        }
    }

    pub const fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Largest value representable in `width` bytes.
    pub fn max_value(&self) -> u64 {
        if self.width >= 8 {
            u64::MAX
        } else {
            (1u64 << (self.width * 8)) - 1
        }
    }

    pub fn encode(&self, field: &str, value: u64, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let max = self.max_value();
        let value = if value > max {
            match self.overflow {
                OverflowPolicy::Reject => {
                    return Err(CodecError::Range {
                        field: field.to_string(),
                        value,
                        width: self.width,
                    })
                }
                OverflowPolicy::Truncate => value & max,
            }
        } else {
            value
        };
        let mut buf = [0u8; 8];
        let span = &mut buf[..self.width];
        match self.endianness {
            Endianness::Big => BigEndian::write_uint(span, value, self.width),
            Endianness::Little => LittleEndian::write_uint(span, value, self.width),
        }
        out.extend_from_slice(span);
        Ok(())
    }

    pub fn decode(&self, field: &str, bytes: &[u8]) -> Result<u64, CodecError> {
        let span = take(field, bytes, self.width)?;
        Ok(match self.endianness {
            Endianness::Big => BigEndian::read_uint(span, self.width),
            Endianness::Little => LittleEndian::read_uint(span, self.width),
        })
    }
}

/// Codec for one schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCodec {
    /// Byte string of exactly n bytes; shorter input is zero-padded, longer is rejected.
    FixedStr(usize),
    Byte,
    Int(FixedWidthIntCodec),
}

impl FieldCodec {
    /// 32-bit, network order.
    pub const fn int32() -> Self {
        FieldCodec::Int(FixedWidthIntCodec::new(4, Endianness::Big))
    }

    /// 64-bit, network order.
    pub const fn int64() -> Self {
        FieldCodec::Int(FixedWidthIntCodec::new(8, Endianness::Big))
    }

    /// Low five bytes of the little-endian u64 representation.
    pub const fn int40_le() -> Self {
        FieldCodec::Int(FixedWidthIntCodec::new(5, Endianness::Little))
    }

    /// Five bytes, most significant first.
    pub const fn int40_be() -> Self {
        FieldCodec::Int(FixedWidthIntCodec::new(5, Endianness::Big))
    }

    pub fn width(&self) -> usize {
        match self {
            FieldCodec::FixedStr(n) => *n,
            FieldCodec::Byte => 1,
            FieldCodec::Int(c) => c.width,
        }
    }

    /// Append exactly `self.width()` bytes for `value`.
    pub fn encode(&self, field: &str, value: &Value, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            FieldCodec::FixedStr(n) => {
                let bytes = value.as_bytes().ok_or_else(|| CodecError::TypeMismatch {
                    field: field.to_string(),
                    expected: "bytes",
                })?;
                if bytes.len() > *n {
                    return Err(CodecError::Length {
                        field: field.to_string(),
                        len: bytes.len(),
                        width: *n,
                    });
                }
                out.extend_from_slice(bytes);
                out.resize(out.len() + (*n - bytes.len()), 0);
                Ok(())
            }
            FieldCodec::Byte => {
                let v = int_value(field, value)?;
                let b = u8::try_from(v).map_err(|_| CodecError::Range {
                    field: field.to_string(),
                    value: v,
                    width: 1,
                })?;
                out.push(b);
                Ok(())
            }
            FieldCodec::Int(c) => c.encode(field, int_value(field, value)?, out),
        }
    }

    /// Decode from the first `self.width()` bytes of `bytes`.
    pub fn decode(&self, field: &str, bytes: &[u8]) -> Result<Value, CodecError> {
        match self {
            FieldCodec::FixedStr(n) => Ok(Value::Bytes(take(field, bytes, *n)?.to_vec())),
            FieldCodec::Byte => Ok(Value::U8(take(field, bytes, 1)?[0])),
            FieldCodec::Int(c) => {
                let v = c.decode(field, bytes)?;
                // Widths up to 4 bytes are always within u32.
                Ok(if c.width <= 4 {
                    Value::U32(v as u32)
                } else {
                    Value::U64(v)
                })
            }
        }
    }
}

fn int_value(field: &str, value: &Value) -> Result<u64, CodecError> {
    value.as_u64().ok_or_else(|| CodecError::TypeMismatch {
        field: field.to_string(),
        expected: "integer",
    })
}

fn take<'a>(field: &str, bytes: &'a [u8], n: usize) -> Result<&'a [u8], CodecError> {
    bytes.get(..n).ok_or_else(|| CodecError::Truncated {
        field: field.to_string(),
        needed: n,
        remaining: bytes.len(),
    })
}
