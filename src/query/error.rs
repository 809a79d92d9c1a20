//! Query error types
//!
//! Defines all error conditions that can occur while parsing a search request
//! and executing its plan.

use thiserror::Error;

use crate::error::ErrorClass;
use crate::query::ast::AggregateOp;
use crate::storage::{Column, ColumnKind, StorageError};

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Request body is not a JSON object (or not JSON at all)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A clause has the wrong JSON shape
    #[error("'{clause}' must be {expected}, found {found}")]
    InvalidClause {
        clause: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A required field of a clause is missing
    #[error("'{clause}' is missing required field '{field}'")]
    MissingField {
        clause: &'static str,
        field: &'static str,
    },

    /// Referenced column does not exist
    #[error("Unknown column '{column}' in {clause}")]
    UnknownColumn { clause: &'static str, column: String },

    /// Filter operator other than gte, lte or eq
    #[error("Unknown operator '{operator}' for column '{column}', expected gte, lte or eq")]
    UnknownOperator { column: Column, operator: String },

    /// Filter object with no operators
    #[error("Filter on '{0}' has no operators")]
    EmptyPredicate(Column),

    /// Operand of the wrong type for the column
    #[error("'{column}.{operator}' expects a {expected}, found {found}")]
    TypeMismatch {
        column: Column,
        operator: String,
        expected: ColumnKind,
        found: String,
    },

    /// Code string outside the visibility scale
    #[error("Invalid {column} code '{value}', expected one of VP, P, M, G, VG, E")]
    InvalidEnum { column: Column, value: String },

    /// Aggregation over the timestamp axis
    #[error("Cannot aggregate over 'timestamp', choose a data column")]
    TimestampAggregate,

    /// Aggregate operator other than COUNT, MAX, MIN, SUM or AVG
    #[error("Unknown aggregate operator '{0}', expected COUNT, MAX, MIN, SUM or AVG")]
    UnknownAggregateOperator(String),

    /// Operator that does not apply to the column kind
    #[error("{op} is not supported on '{column}'")]
    UnsupportedAggregate { op: AggregateOp, column: Column },

    /// The store failed while running the plan
    #[error("Query execution failed: {0}")]
    ExecutionFailed(#[from] StorageError),
}

impl QueryError {
    /// Error class used for the client response
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidRequest(_) => ErrorClass::Payload,
            Self::ExecutionFailed(_) => ErrorClass::Execution,
            _ => ErrorClass::SchemaValidation,
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
