//! Shape-based classification of opaque leaf payloads
//!
//! Leaves carry no type information. The classifier guesses from content and
//! length only, and always produces exactly one [`DecodedValue`].

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// A float that may be non-finite. Non-finite values serialize as the
/// markers `"inf"`, `"-inf"` and `"nan"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum F32Value {
    Number(f64),
    Marker(&'static str),
}

impl F32Value {
    /// Round finite values to 6 decimal digits so output is stable
    pub fn from_f32(v: f32) -> Self {
        if v.is_nan() {
            F32Value::Marker("nan")
        } else if v.is_infinite() {
            F32Value::Marker(if v > 0.0 { "inf" } else { "-inf" })
        } else {
            F32Value::Number((f64::from(v) * 1e6).round() / 1e6)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// Printable ASCII after trailing padding is removed
    String(String),
    /// Any other 4-byte payload
    Scalar { u32: u32, i32: i32, f32: F32Value },
    /// 8, 12 or 16 bytes read as floats
    FloatVector(Vec<F32Value>),
    /// Up to 64 bytes, word aligned, read as u32 words
    U32Vector(Vec<u32>),
    Blob { size: usize },
}

impl DecodedValue {
    pub fn kind(&self) -> String {
        match self {
            DecodedValue::String(_) => "string".into(),
            DecodedValue::Scalar { .. } => "u32_f32".into(),
            DecodedValue::FloatVector(v) => format!("f32x{}", v.len()),
            DecodedValue::U32Vector(v) => format!("u32x{}", v.len()),
            DecodedValue::Blob { .. } => "blob".into(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// A classified leaf. The raw bytes are always kept alongside the guess.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub raw: Vec<u8>,
    pub value: DecodedValue,
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("raw_hex", &hex::encode(&self.raw))?;
        map.serialize_entry("kind", &self.value.kind())?;
        match &self.value {
            DecodedValue::String(s) => map.serialize_entry("value", s)?,
            DecodedValue::Scalar { u32, i32, f32 } => {
                map.serialize_entry("u32", u32)?;
                map.serialize_entry("i32", i32)?;
                map.serialize_entry("f32", f32)?;
            }
            DecodedValue::FloatVector(values) => map.serialize_entry("f32", values)?,
            DecodedValue::U32Vector(values) => map.serialize_entry("u32", values)?,
            DecodedValue::Blob { size } => map.serialize_entry("size", size)?,
        }
        map.end()
    }
}

/// Trailing bytes treated as padding when looking for text
fn is_padding(b: u8) -> bool {
    b == 0x00 || b == 0xBF
}

fn trim_padding(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| !is_padding(b)).map_or(0, |p| p + 1);
    &data[..end]
}

fn words(data: &[u8]) -> impl Iterator<Item = [u8; 4]> + '_ {
    data.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]])
}

/// Classify a leaf payload. Never fails.
pub fn classify(data: &[u8]) -> Payload {
    Payload {
        raw: data.to_vec(),
        value: classify_value(data),
    }
}

fn classify_value(data: &[u8]) -> DecodedValue {
    let trimmed = trim_padding(data);
    if !trimmed.is_empty() && trimmed.iter().all(|b| (0x20..=0x7E).contains(b)) {
        return DecodedValue::String(trimmed.iter().map(|&b| b as char).collect());
    }

    match data.len() {
        4 => {
            let bytes = [data[0], data[1], data[2], data[3]];
            DecodedValue::Scalar {
                u32: u32::from_le_bytes(bytes),
                i32: i32::from_le_bytes(bytes),
                f32: F32Value::from_f32(f32::from_le_bytes(bytes)),
            }
        }
        8 | 12 | 16 => DecodedValue::FloatVector(
            words(data)
                .map(|w| F32Value::from_f32(f32::from_le_bytes(w)))
                .collect(),
        ),
        n if n % 4 == 0 && n <= 64 => {
            DecodedValue::U32Vector(words(data).map(u32::from_le_bytes).collect())
        }
        n => DecodedValue::Blob { size: n },
    }
}
