//! Query Parser
//!
//! Validates an untyped JSON search body into a [`QuerySpec`].
//!
//! # Request Shape
//!
//! ```text
//! {
//!   "filters":   { <column>: { "gte"?: v, "lte"?: v, "eq"?: v }, ... },
//!   "sort":      { "column": <column>, "order"?: "asc" | "desc" | ... },
//!   "aggregate": { "column": <column>, "operator": "count" | "max" | ... }
//! }
//! ```
//!
//! Every clause is optional. Unknown top-level keys are ignored and a `null`
//! clause counts as absent. All checks run here, before any store access.

use serde_json::{Map, Value};

use crate::query::ast::*;
use crate::query::error::{QueryError, QueryResult};
use crate::storage::{Column, ColumnKind, ColumnValue, Visibility};

/// Parse a search request body
pub fn parse_query_spec(body: &Value) -> QueryResult<QuerySpec> {
    let body = body.as_object().ok_or_else(|| {
        QueryError::InvalidRequest(format!(
            "request body must be a JSON object, found {}",
            describe(body)
        ))
    })?;

    let mut builder = QuerySpec::builder();

    if let Some(filters) = clause(body, "filters")? {
        for (name, predicate) in filters {
            let column = Column::from_name(name).ok_or_else(|| QueryError::UnknownColumn {
                clause: "filters",
                column: name.clone(),
            })?;
            for (op, value) in parse_predicate(column, predicate)? {
                builder = builder.filter(column, op, value);
            }
        }
    }

    if let Some(sort) = clause(body, "sort")? {
        let column = required_column(sort, "sort")?;
        let order = SortOrder::from_request(sort.get("order").and_then(Value::as_str));
        builder = builder.sort(column, order);
    }

    if let Some(aggregate) = clause(body, "aggregate")? {
        let column = required_column(aggregate, "aggregate")?;
        let name = match aggregate.get("operator") {
            None | Some(Value::Null) => {
                return Err(QueryError::MissingField {
                    clause: "aggregate",
                    field: "operator",
                })
            }
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(QueryError::InvalidClause {
                    clause: "aggregate.operator".to_string(),
                    expected: "a string",
                    found: describe(other),
                })
            }
        };
        let op = AggregateOp::from_name(name)
            .ok_or_else(|| QueryError::UnknownAggregateOperator(name.clone()))?;
        builder = builder.aggregate(column, op);
    }

    builder.build()
}

/// Parse a search request from raw JSON text
pub fn parse_query_str(input: &str) -> QueryResult<QuerySpec> {
    let body: Value = serde_json::from_str(input)
        .map_err(|e| QueryError::InvalidRequest(format!("malformed JSON: {}", e)))?;
    parse_query_spec(&body)
}

/// Fetch an optional object-valued clause
fn clause<'a>(body: &'a Map<String, Value>, name: &str) -> QueryResult<Option<&'a Map<String, Value>>> {
    match body.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(QueryError::InvalidClause {
            clause: name.to_string(),
            expected: "an object",
            found: describe(other),
        }),
    }
}

/// Read the mandatory `column` field of a sort or aggregate clause
fn required_column(clause: &Map<String, Value>, name: &'static str) -> QueryResult<Column> {
    match clause.get("column") {
        None | Some(Value::Null) => Err(QueryError::MissingField {
            clause: name,
            field: "column",
        }),
        Some(Value::String(s)) => {
            let column = Column::from_name(s).ok_or_else(|| QueryError::UnknownColumn {
                clause: name,
                column: s.clone(),
            })?;
            if name == "aggregate" && !column.is_data_column() {
                return Err(QueryError::TimestampAggregate);
            }
            Ok(column)
        }
        Some(other) => Err(QueryError::InvalidClause {
            clause: format!("{}.column", name),
            expected: "a string",
            found: describe(other),
        }),
    }
}

fn parse_predicate(column: Column, predicate: &Value) -> QueryResult<Vec<(Comparison, ColumnValue)>> {
    let map = predicate.as_object().ok_or_else(|| QueryError::InvalidClause {
        clause: format!("filters.{}", column),
        expected: "an object",
        found: describe(predicate),
    })?;

    if map.is_empty() {
        return Err(QueryError::EmptyPredicate(column));
    }

    let mut out = Vec::with_capacity(map.len());
    for (key, operand) in map {
        let op = Comparison::from_key(key).ok_or_else(|| QueryError::UnknownOperator {
            column,
            operator: key.clone(),
        })?;
        out.push((op, parse_operand(column, op, operand)?));
    }
    Ok(out)
}

fn parse_operand(column: Column, op: Comparison, operand: &Value) -> QueryResult<ColumnValue> {
    let mismatch = |found: &str| QueryError::TypeMismatch {
        column,
        operator: op.key().to_string(),
        expected: column.kind(),
        found: found.to_string(),
    };

    match (column.kind(), operand) {
        (ColumnKind::Integer, Value::Number(n)) => n
            .as_i64()
            .map(ColumnValue::Integer)
            .ok_or_else(|| mismatch("non-integer number")),
        (ColumnKind::Real, Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(ColumnValue::Real)
            .ok_or_else(|| mismatch("non-finite number")),
        (ColumnKind::Enum, Value::String(code)) => Visibility::from_code(code)
            .map(ColumnValue::Code)
            .ok_or_else(|| QueryError::InvalidEnum {
                column,
                value: code.clone(),
            }),
        (_, other) => Err(mismatch(describe(other))),
    }
}

/// Human-readable JSON type name
fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
