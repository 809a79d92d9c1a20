//! Row normalization
//!
//! Converts positional string records into typed readings. Columns are read
//! in the fixed order `timestamp, temperature, rainfall, humidity,
//! wind_speed, visibility`.

use super::decoder::RawRow;
use super::{IngestError, IngestResult};
use crate::storage::{Column, Reading, Visibility};

/// Convert one record into a reading
pub fn normalize_row(row: &RawRow) -> IngestResult<Reading> {
    if row.fields.len() > Column::ALL.len() {
        return Err(IngestError::FieldCount {
            line: row.line,
            expected: Column::ALL.len(),
            found: row.fields.len(),
        });
    }

    let timestamp = parse_timestamp(row)?;
    let temperature = parse_real(row, Column::Temperature)?;
    let rainfall = parse_real(row, Column::Rainfall)?;
    let humidity = parse_real(row, Column::Humidity)?;
    let wind_speed = parse_real(row, Column::WindSpeed)?;
    let visibility = parse_visibility(row)?;

    Ok(Reading::new(
        timestamp,
        temperature,
        rainfall,
        humidity,
        wind_speed,
        visibility,
    ))
}

/// Convert every record, stopping at the first failure
pub fn normalize_batch(rows: &[RawRow]) -> IngestResult<Vec<Reading>> {
    rows.iter().map(normalize_row).collect()
}

fn raw(row: &RawRow, column: Column) -> IngestResult<&str> {
    row.fields
        .get(column as usize)
        .map(|s| s.trim())
        .ok_or_else(|| malformed(row, column, ""))
}

fn malformed(row: &RawRow, column: Column, value: &str) -> IngestError {
    IngestError::MalformedRow {
        line: row.line,
        column,
        value: value.to_string(),
    }
}

fn parse_timestamp(row: &RawRow) -> IngestResult<i64> {
    let value = raw(row, Column::Timestamp)?;
    value
        .parse::<i64>()
        .map_err(|_| malformed(row, Column::Timestamp, value))
}

fn parse_real(row: &RawRow, column: Column) -> IngestResult<f64> {
    let value = raw(row, column)?;
    let parsed = value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(row, column, value))?;

    if let Some(min) = column.minimum() {
        if parsed < min {
            return Err(IngestError::OutOfRange {
                line: row.line,
                column,
                value: parsed,
            });
        }
    }
    Ok(parsed)
}

fn parse_visibility(row: &RawRow) -> IngestResult<Visibility> {
    let value = raw(row, Column::Visibility)?;
    Visibility::from_code(value).ok_or_else(|| IngestError::InvalidEnum {
        line: row.line,
        value: value.to_string(),
    })
}
