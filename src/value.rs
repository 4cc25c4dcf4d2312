//! Runtime values for encoding/decoding (codec representation).

use std::collections::HashMap;

/// Decoded packet: field name to value.
pub type Fields = HashMap<String, Value>;

/// A single field value.
///
/// Integer variants compare by numeric value: `U64(14) == U32(14)`. Encoding accepts any
/// integer variant for an integer field, so a decoded mapping equals its input whichever
/// width the caller picked.
#[derive(Debug, Clone)]
pub enum Value {
    U8(u8),
    U32(u32),
    U64(u64),
    Bytes(Vec<u8>),
}

impl Value {
    /// Any integer variant widened to u64.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U8(x) => Some(*x as u64),
            Value::U32(x) => Some(*x as u64),
            Value::U64(x) => Some(*x),
            Value::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => match (self.as_u64(), other.as_u64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl Eq for Value {}

impl From<u8> for Value {
    fn from(x: u8) -> Self {
        Value::U8(x)
    }
}

impl From<u32> for Value {
    fn from(x: u32) -> Self {
        Value::U32(x)
    }
}

impl From<u64> for Value {
    fn from(x: u64) -> Self {
        Value::U64(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Bytes(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

/// Build a field mapping from `(name, value)` pairs.
pub fn fields<I, K, V>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_accessors() {
        assert_eq!(Value::U8(7).as_u64(), Some(7));
        assert_eq!(Value::U32(0xdead_beef).as_u64(), Some(0xdead_beef));
        assert_eq!(Value::from("P").as_u64(), None);
        assert_eq!(Value::from("P4").as_bytes(), Some(&b"P4"[..]));
    }

    #[test]
    fn integers_compare_by_value() {
        assert_eq!(Value::U64(14), Value::U32(14));
        assert_eq!(Value::U8(1), Value::U64(1));
        assert_ne!(Value::U32(14), Value::U32(15));
        assert_ne!(Value::U8(b'P'), Value::from("P"));
        assert_ne!(Value::from("P"), Value::from("4"));
    }

    #[test]
    fn fields_builder() {
        let m = fields([("a", 1u64), ("b", 2u64)]);
        assert_eq!(m.get("a"), Some(&Value::U64(1)));
        assert_eq!(m.len(), 2);
    }
}
