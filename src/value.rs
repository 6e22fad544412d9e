//! Value Codec
//!
//! Bidirectional conversion between host value types and the canonical
//! byte-string representation both backends exchange.

use bytes::Bytes;

/// A host-level value prior to encoding.
///
/// Text encodes as UTF-8, binary passes through unchanged, and numerics
/// encode as their decimal ASCII form. Encoding is total; there is no
/// failure mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Bin(Bytes),
    Int(i64),
    Float(f64),
}

impl Value {
    /// Encode into the canonical byte-string form.
    pub fn encode(&self) -> Bytes {
        match self {
            Value::Text(s) => Bytes::copy_from_slice(s.as_bytes()),
            Value::Bin(b) => b.clone(),
            Value::Int(n) => Bytes::from(n.to_string()),
            Value::Float(f) => Bytes::from(fmt_float(*f)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bin(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bin(Bytes::from(b))
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bin(Bytes::copy_from_slice(b))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// Pass an optional raw byte string through unchanged.
///
/// An absent value stays `None`; a present-but-empty value stays
/// `Some(empty)`. The two are distinct states.
pub fn decode_optional(raw: Option<Bytes>) -> Option<Bytes> {
    raw
}

/// Format a float the way the wire does: integral values render without
/// a fractional part.
pub fn fmt_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e17 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

/// Parse a decimal ASCII integer.
pub fn parse_int(raw: &[u8]) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

/// Parse a decimal ASCII float.
pub fn parse_float(raw: &[u8]) -> Option<f64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text() {
        assert_eq!(Value::from("héllo").encode().as_ref(), "héllo".as_bytes());
    }

    #[test]
    fn test_encode_binary_roundtrip() {
        let payload = vec![0u8, 159, 146, 150, 0, 255, 13, 10];
        let encoded = Value::from(payload.clone()).encode();
        assert_eq!(encoded.as_ref(), payload.as_slice());
        let decoded = decode_optional(Some(encoded)).unwrap();
        assert_eq!(decoded.as_ref(), payload.as_slice());
    }

    #[test]
    fn test_encode_numeric() {
        assert_eq!(Value::from(-42i64).encode().as_ref(), b"-42");
        assert_eq!(Value::from(1.5f64).encode().as_ref(), b"1.5");
        assert_eq!(Value::from(6.0f64).encode().as_ref(), b"6");
    }

    #[test]
    fn test_absent_is_not_empty() {
        assert_eq!(decode_optional(None), None);
        assert_eq!(decode_optional(Some(Bytes::new())), Some(Bytes::new()));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_int(b"123"), Some(123));
        assert_eq!(parse_int(b"12a"), None);
        assert_eq!(parse_float(b"6"), Some(6.0));
        assert_eq!(parse_float(b"1.25"), Some(1.25));
    }
}
