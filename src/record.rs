//! In-memory spectrum record: the header store plus the decoded data series.
//!
//! A `SpectrumRecord` is built bottom-up by the decode pipeline (children
//! before parent) and is not modified afterwards; the cross-section
//! converter returns a new record with the derived series filled in.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Header keys in file order, lower-cased. Last write wins.
pub type Headers = IndexMap<String, HeaderValue>;

/// A header value coerced from its text form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeaderValue {
    Int(i64),
    Float(f64),
    Str(String),
    /// A successfully parsed `LONGDATE` field. When parsing fails the raw
    /// string is kept as `Str` instead.
    Timestamp(NaiveDateTime),
}

impl HeaderValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Int(v) => Some(*v as f64),
            HeaderValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Non-negative integral view of the value, if it has one.
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            HeaderValue::Int(v) if *v >= 0 => Some(*v as usize),
            HeaderValue::Float(v) if *v >= 0.0 && v.fract() == 0.0 => Some(*v as usize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderValue::Int(v) => write!(f, "{}", v),
            // Whole-number floats keep a trailing ".0" so written headers
            // keep the shape they were read with.
            HeaderValue::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{:.1}", v)
            }
            HeaderValue::Float(v) => write!(f, "{}", v),
            HeaderValue::Str(s) => write!(f, "{}", s),
            HeaderValue::Timestamp(t) => write!(f, "{}", t),
        }
    }
}

/// A decoded JCAMP-DX block: header metadata plus the x/y series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpectrumRecord {
    /// Parsed header fields, keyed by lower-cased label.
    pub headers: Headers,
    /// Abscissa values (wavenumber, wavelength, m/z, ...).
    pub x: Vec<f64>,
    /// Ordinate values (transmittance, absorbance, intensity, ...).
    pub y: Vec<f64>,
    /// Nested blocks of a compound (`link`) document; empty otherwise.
    pub children: Vec<SpectrumRecord>,
    /// Derived by `calc_xsec`, empty after decoding.
    pub wavenumbers: Vec<f64>,
    /// Derived by `calc_xsec`, empty after decoding.
    pub wavelengths: Vec<f64>,
    /// Derived by `calc_xsec`, empty after decoding.
    pub absorbance: Vec<f64>,
    /// Absorption cross-section in m^2, derived by `calc_xsec`.
    pub xsec: Vec<f64>,
}

impl SpectrumRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a header by its lower-cased key.
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.headers.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.headers.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.headers.get(key).and_then(HeaderValue::as_usize)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(HeaderValue::as_str)
    }

    /// The record's `TITLE` header, or an empty string.
    pub fn title(&self) -> &str {
        self.get_str("title").unwrap_or("")
    }

    /// Whether this record is a compound (`link`) container.
    pub fn is_link(&self) -> bool {
        let tag = self
            .get_str("data type")
            .or_else(|| self.get_str("datatype"));
        matches!(tag, Some(t) if t.eq_ignore_ascii_case("link"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_display() {
        assert_eq!(HeaderValue::Int(5).to_string(), "5");
        assert_eq!(HeaderValue::Float(1.0).to_string(), "1.0");
        assert_eq!(HeaderValue::Float(0.25).to_string(), "0.25");
        assert_eq!(HeaderValue::Str("transmittance".into()).to_string(), "transmittance");
    }

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(HeaderValue::Int(7).as_f64(), Some(7.0));
        assert_eq!(HeaderValue::Float(7.5).as_f64(), Some(7.5));
        assert_eq!(HeaderValue::Str("7".into()).as_f64(), None);
        assert_eq!(HeaderValue::Int(7).as_usize(), Some(7));
        assert_eq!(HeaderValue::Int(-7).as_usize(), None);
        assert_eq!(HeaderValue::Float(7.0).as_usize(), Some(7));
        assert_eq!(HeaderValue::Float(7.5).as_usize(), None);
    }

    #[test]
    fn test_is_link() {
        let mut rec = SpectrumRecord::new();
        assert!(!rec.is_link());
        rec.headers
            .insert("data type".into(), HeaderValue::Str("LINK".into()));
        assert!(rec.is_link());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut rec = SpectrumRecord::new();
        rec.headers
            .insert("title".into(), HeaderValue::Str("ethylene".into()));
        rec.headers.insert("npoints".into(), HeaderValue::Int(3));
        rec.x = vec![1.0, 2.0, 3.0];
        rec.y = vec![0.5, 0.6, 0.7];

        let json = serde_json::to_string(&rec).expect("serialize");
        let back: SpectrumRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.title(), "ethylene");
        assert_eq!(back.get_usize("npoints"), Some(3));
        assert_eq!(back.x, rec.x);
        assert_eq!(back.y, rec.y);
    }
}
