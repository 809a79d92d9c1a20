//! CSV Ingestion
//!
//! Turns an uploaded CSV body into stored readings:
//!
//! ```text
//! CSV text → CsvDecoder → RawRow → normalizer → Reading → ReadingStore::append
//! ```
//!
//! A batch is all-or-nothing. Every row is decoded and validated before the
//! store is touched, and the store appends the batch in one transaction.

mod decoder;
mod ingestor;
mod normalizer;

pub use decoder::{CsvDecoder, RawRow};
pub use ingestor::{IngestSummary, Ingestor};
pub use normalizer::{normalize_batch, normalize_row};

use crate::error::ErrorClass;
use crate::storage::{Column, StorageError};

/// Errors that can occur while ingesting a CSV batch
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Empty or invalid CSV payload")]
    EmptyOrInvalidPayload,

    #[error("Line {line}: {message}")]
    Decode { line: usize, message: String },

    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: '{value}' is not a valid {} for '{column}'", .column.kind())]
    MalformedRow {
        line: usize,
        column: Column,
        value: String,
    },

    #[error("Line {line}: '{value}' is not a visibility code, expected one of VP, P, M, G, VG, E")]
    InvalidEnum { line: usize, value: String },

    #[error("Line {line}: '{column}' must not be negative, found {value}")]
    OutOfRange {
        line: usize,
        column: Column,
        value: f64,
    },

    #[error("Batch of {rows} rows exceeds the limit of {max}")]
    BatchTooLarge { rows: usize, max: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// Error class used for the client response
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::EmptyOrInvalidPayload | Self::Decode { .. } | Self::BatchTooLarge { .. } => {
                ErrorClass::Payload
            }
            Self::FieldCount { .. }
            | Self::MalformedRow { .. }
            | Self::InvalidEnum { .. }
            | Self::OutOfRange { .. } => ErrorClass::SchemaValidation,
            Self::Storage(_) => ErrorClass::Execution,
        }
    }

    /// Line of the offending record, if the error is tied to one
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Decode { line, .. }
            | Self::FieldCount { line, .. }
            | Self::MalformedRow { line, .. }
            | Self::InvalidEnum { line, .. }
            | Self::OutOfRange { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Result type for ingestion
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = IngestError::MalformedRow {
            line: 3,
            column: Column::Temperature,
            value: "warm".into(),
        };
        assert_eq!(err.to_string(), "Line 3: 'warm' is not a valid number for 'temperature'");

        let err = IngestError::OutOfRange {
            line: 7,
            column: Column::Rainfall,
            value: -0.5,
        };
        assert_eq!(err.to_string(), "Line 7: 'rainfall' must not be negative, found -0.5");
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(IngestError::EmptyOrInvalidPayload.class(), ErrorClass::Payload);
        assert_eq!(
            IngestError::InvalidEnum {
                line: 2,
                value: "X".into()
            }
            .class(),
            ErrorClass::SchemaValidation
        );
        assert_eq!(
            IngestError::Storage(StorageError::Lock("poisoned".into())).class(),
            ErrorClass::Execution
        );
    }

    #[test]
    fn test_error_line() {
        assert_eq!(
            IngestError::Decode {
                line: 5,
                message: "bad quote".into()
            }
            .line(),
            Some(5)
        );
        assert_eq!(IngestError::EmptyOrInvalidPayload.line(), None);
    }
}
