//! Core data types for weather readings
//!
//! This module defines the record types stored by the reading store:
//! - `Reading`: one sensor observation with six fixed fields
//! - `Visibility`: the ordered visibility scale
//! - `ColumnValue`: a single typed cell of a reading

use crate::storage::schema::Column;
use serde::{Deserialize, Serialize};

/// A single weather sensor observation
///
/// Readings are immutable once stored. The timestamp is not unique;
/// duplicate timestamps are stored as separate rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    /// Unix timestamp in seconds
    pub timestamp: i64,
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Rainfall in mm (never negative)
    pub rainfall: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Wind speed in mph (never negative)
    pub wind_speed: f64,
    /// Visibility category
    pub visibility: Visibility,
}

impl Reading {
    /// Create a reading from its six fields
    pub fn new(
        timestamp: i64,
        temperature: f64,
        rainfall: f64,
        humidity: f64,
        wind_speed: f64,
        visibility: Visibility,
    ) -> Self {
        Self {
            timestamp,
            temperature,
            rainfall,
            humidity,
            wind_speed,
            visibility,
        }
    }

    /// Get the value of a column
    pub fn value(&self, column: Column) -> ColumnValue {
        match column {
            Column::Timestamp => ColumnValue::Integer(self.timestamp),
            Column::Temperature => ColumnValue::Real(self.temperature),
            Column::Rainfall => ColumnValue::Real(self.rainfall),
            Column::Humidity => ColumnValue::Real(self.humidity),
            Column::WindSpeed => ColumnValue::Real(self.wind_speed),
            Column::Visibility => ColumnValue::Code(self.visibility),
        }
    }
}

/// A typed cell of a reading (also used as a filter operand)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Integer(i64),
    Real(f64),
    Code(Visibility),
}

impl ColumnValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            Self::Code(_) => None,
        }
    }

    /// Compare two values of the same column
    ///
    /// Numbers compare numerically (integers exactly), codes compare along the
    /// visibility scale. Mixed kinds are unordered.
    pub fn compare(&self, other: &ColumnValue) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Code(a), Self::Code(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }
}

impl std::fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Real(v) => write!(f, "{}", v),
            Self::Code(v) => write!(f, "{}", v),
        }
    }
}

/// Visibility scale, from very poor to excellent
///
/// The derived ordering follows the scale, so `VeryPoor < Excellent`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    #[serde(rename = "VP")]
    VeryPoor,
    #[serde(rename = "P")]
    Poor,
    #[serde(rename = "M")]
    Moderate,
    #[serde(rename = "G")]
    Good,
    #[serde(rename = "VG")]
    VeryGood,
    #[serde(rename = "E")]
    Excellent,
}

impl Visibility {
    /// Codes in scale order
    pub const CODES: &'static [&'static str] = &["VP", "P", "M", "G", "VG", "E"];

    /// All values in scale order
    pub fn all() -> &'static [Visibility] {
        &[
            Visibility::VeryPoor,
            Visibility::Poor,
            Visibility::Moderate,
            Visibility::Good,
            Visibility::VeryGood,
            Visibility::Excellent,
        ]
    }

    /// Parse an exact (case-sensitive) code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "VP" => Some(Self::VeryPoor),
            "P" => Some(Self::Poor),
            "M" => Some(Self::Moderate),
            "G" => Some(Self::Good),
            "VG" => Some(Self::VeryGood),
            "E" => Some(Self::Excellent),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::VeryPoor => "VP",
            Self::Poor => "P",
            Self::Moderate => "M",
            Self::Good => "G",
            Self::VeryGood => "VG",
            Self::Excellent => "E",
        }
    }

    /// Position on the scale (0 = very poor)
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Reading {
        Reading::new(1_700_000_000, 12.5, 0.4, 81.0, 6.2, Visibility::Good)
    }

    #[test]
    fn test_visibility_codes_roundtrip() {
        for v in Visibility::all() {
            assert_eq!(Visibility::from_code(v.code()), Some(*v));
        }
        assert_eq!(Visibility::from_code("g"), None);
        assert_eq!(Visibility::from_code("X"), None);
        assert_eq!(Visibility::from_code(""), None);
    }

    #[test]
    fn test_visibility_scale_order() {
        assert!(Visibility::VeryPoor < Visibility::Poor);
        assert!(Visibility::Good < Visibility::VeryGood);
        assert!(Visibility::VeryGood < Visibility::Excellent);
        assert_eq!(Visibility::VeryPoor.rank(), 0);
        assert_eq!(Visibility::Excellent.rank(), 5);
    }

    #[test]
    fn test_reading_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["timestamp"], 1_700_000_000);
        assert_eq!(json["wind_speed"], 6.2);
        assert_eq!(json["visibility"], "G");
    }

    #[test]
    fn test_reading_value_by_column() {
        let r = sample();
        assert_eq!(r.value(Column::Timestamp), ColumnValue::Integer(1_700_000_000));
        assert_eq!(r.value(Column::Rainfall), ColumnValue::Real(0.4));
        assert_eq!(r.value(Column::Visibility), ColumnValue::Code(Visibility::Good));
    }

    #[test]
    fn test_column_value_compare() {
        use std::cmp::Ordering;

        assert_eq!(
            ColumnValue::Real(10.0).compare(&ColumnValue::Real(20.0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            ColumnValue::Code(Visibility::Excellent).compare(&ColumnValue::Code(Visibility::Poor)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            ColumnValue::Code(Visibility::Good).compare(&ColumnValue::Real(1.0)),
            None
        );
    }
}
