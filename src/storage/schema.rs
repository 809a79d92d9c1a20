//! Reading schema
//!
//! Canonical definition of the six sensor columns: their names, value kinds,
//! closed code set (for the enum column) and lower bounds. Shared by the
//! ingestion normalizer and the query spec parser so both reject the same
//! things.

use crate::storage::types::Visibility;
use serde::{Deserialize, Serialize};

/// How values of a column are represented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Whole seconds since the Unix epoch
    Integer,
    /// Finite floating point number
    Real,
    /// One of a closed set of codes
    Enum,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Real => write!(f, "number"),
            Self::Enum => write!(f, "visibility code"),
        }
    }
}

/// A column of the readings table
///
/// Declaration order is the CSV column order and the order in which filter
/// clauses are compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Timestamp,
    Temperature,
    Rainfall,
    Humidity,
    WindSpeed,
    Visibility,
}

impl Column {
    /// All columns in CSV order
    pub const ALL: [Column; 6] = [
        Column::Timestamp,
        Column::Temperature,
        Column::Rainfall,
        Column::Humidity,
        Column::WindSpeed,
        Column::Visibility,
    ];

    /// Look up a column by its exact (case-sensitive) name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "timestamp" => Some(Self::Timestamp),
            "temperature" => Some(Self::Temperature),
            "rainfall" => Some(Self::Rainfall),
            "humidity" => Some(Self::Humidity),
            "wind_speed" => Some(Self::WindSpeed),
            "visibility" => Some(Self::Visibility),
            _ => None,
        }
    }

    /// Column name as used in CSV headers, JSON bodies and the store
    pub fn name(&self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Temperature => "temperature",
            Self::Rainfall => "rainfall",
            Self::Humidity => "humidity",
            Self::WindSpeed => "wind_speed",
            Self::Visibility => "visibility",
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Timestamp => ColumnKind::Integer,
            Self::Visibility => ColumnKind::Enum,
            _ => ColumnKind::Real,
        }
    }

    /// Whether values of this column can be compared and summed as numbers
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind(), ColumnKind::Integer | ColumnKind::Real)
    }

    /// Data columns are every column except the timestamp axis
    pub fn is_data_column(&self) -> bool {
        *self != Self::Timestamp
    }

    /// Closed set of valid codes for enum columns
    pub fn valid_codes(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::Visibility => Some(Visibility::CODES),
            _ => None,
        }
    }

    /// Inclusive lower bound enforced at ingestion
    ///
    /// Humidity is deliberately unbounded.
    pub fn minimum(&self) -> Option<f64> {
        match self {
            Self::Rainfall | Self::WindSpeed => Some(0.0),
            _ => None,
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
