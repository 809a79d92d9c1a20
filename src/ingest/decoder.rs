//! CSV Decoder
//!
//! Splits a CSV body into raw string records. The first line is always a
//! header and is skipped whatever it contains; fields are matched by
//! position, never by header name.

use super::{IngestError, IngestResult};

/// One decoded data record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the payload (the header is line 1)
    pub line: usize,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(line: usize, fields: Vec<String>) -> Self {
        Self { line, fields }
    }

    /// Field at a position, empty when the record is short
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }
}

/// CSV decoder with configurable delimiter
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    delimiter: u8,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvDecoder {
    /// Create a comma-separated decoder
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Decode a CSV body into data records
    ///
    /// Every record must have as many fields as the header.
    pub fn decode(&self, input: &str) -> IngestResult<Vec<RawRow>> {
        if input.trim().is_empty() {
            return Err(IngestError::EmptyOrInvalidPayload);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .delimiter(self.delimiter)
            .from_reader(input.as_bytes());

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let fallback_line = index + 2;
            let record = result.map_err(|e| IngestError::Decode {
                line: e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line),
                message: decode_message(&e),
            })?;

            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(fallback_line);
            rows.push(RawRow::new(
                line,
                record.iter().map(str::to_string).collect(),
            ));
        }

        Ok(rows)
    }
}

fn decode_message(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {} fields, found {}", expected_len, len),
        csv::ErrorKind::Utf8 { .. } => "invalid UTF-8".to_string(),
        _ => err.to_string(),
    }
}
