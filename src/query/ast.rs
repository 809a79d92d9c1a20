//! Query specification types
//!
//! A `QuerySpec` is the validated, typed form of a search request body:
//!
//! ```text
//! {
//!   "filters":   { "temperature": { "gte": 10, "lte": 20 }, "visibility": { "eq": "G" } },
//!   "sort":      { "column": "humidity", "order": "desc" },
//!   "aggregate": { "column": "rainfall", "operator": "avg" }
//! }
//! ```
//!
//! Filters are keyed by the closed `Column` enum and hold a small `Predicate`
//! per column; the aggregate operator is a tagged `AggregateOp`. Once built a
//! spec is immutable, and every operand already has the kind its column
//! expects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::query::error::{QueryError, QueryResult};
use crate::storage::{Column, ColumnKind, ColumnValue};

/// Filter comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// Greater than or equal to
    Gte,
    /// Less than or equal to
    Lte,
    /// Equal to
    Eq,
}

impl Comparison {
    /// All operators, in compilation order
    pub const ALL: [Comparison; 3] = [Comparison::Gte, Comparison::Lte, Comparison::Eq];

    /// Parse from a request key
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "gte" => Some(Self::Gte),
            "lte" => Some(Self::Lte),
            "eq" => Some(Self::Eq),
            _ => None,
        }
    }

    /// Request key for this operator
    pub fn key(&self) -> &'static str {
        match self {
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Eq => "eq",
        }
    }

    /// Whether `value <op> operand` holds given `value.cmp(operand)`
    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Gte => matches!(ordering, Greater | Equal),
            Self::Lte => matches!(ordering, Less | Equal),
            Self::Eq => ordering == Equal,
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gte => write!(f, ">="),
            Self::Lte => write!(f, "<="),
            Self::Eq => write!(f, "="),
        }
    }
}

/// Conditions on a single column, all of which must hold
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Predicate {
    pub gte: Option<ColumnValue>,
    pub lte: Option<ColumnValue>,
    pub eq: Option<ColumnValue>,
}

impl Predicate {
    pub fn get(&self, op: Comparison) -> Option<ColumnValue> {
        match op {
            Comparison::Gte => self.gte,
            Comparison::Lte => self.lte,
            Comparison::Eq => self.eq,
        }
    }

    /// Set an operand, replacing any previous one for the same operator
    pub fn set(&mut self, op: Comparison, value: ColumnValue) {
        let slot = match op {
            Comparison::Gte => &mut self.gte,
            Comparison::Lte => &mut self.lte,
            Comparison::Eq => &mut self.eq,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        self.gte.is_none() && self.lte.is_none() && self.eq.is_none()
    }

    /// Present (operator, operand) pairs in gte, lte, eq order
    pub fn iter(&self) -> impl Iterator<Item = (Comparison, ColumnValue)> + '_ {
        Comparison::ALL
            .into_iter()
            .filter_map(move |op| self.get(op).map(|value| (op, value)))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Normalize a request value
    ///
    /// Only `"descending"` and `"desc"` select descending order. Every other
    /// value, including a missing one, falls back to ascending.
    pub fn from_request(value: Option<&str>) -> Self {
        match value {
            Some("descending") | Some("desc") => Self::Descending,
            _ => Self::Ascending,
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ascending => write!(f, "ASC"),
            Self::Descending => write!(f, "DESC"),
        }
    }
}

/// Sort clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: Column,
    pub order: SortOrder,
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateOp {
    Count,
    Max,
    Min,
    Sum,
    Avg,
}

impl AggregateOp {
    /// Parse an operator name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "COUNT" => Some(Self::Count),
            "MAX" => Some(Self::Max),
            "MIN" => Some(Self::Min),
            "SUM" => Some(Self::Sum),
            "AVG" => Some(Self::Avg),
            _ => None,
        }
    }

    /// Key under which the result is reported, e.g. `_avg`
    pub fn result_key(&self) -> &'static str {
        match self {
            Self::Count => "_count",
            Self::Max => "_max",
            Self::Min => "_min",
            Self::Sum => "_sum",
            Self::Avg => "_avg",
        }
    }

    /// Whether the operator can be applied to a column
    ///
    /// COUNT works on every column; the others need numbers.
    pub fn supports(&self, column: Column) -> bool {
        matches!(self, Self::Count) || column.is_numeric()
    }
}

impl std::fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count => write!(f, "COUNT"),
            Self::Max => write!(f, "MAX"),
            Self::Min => write!(f, "MIN"),
            Self::Sum => write!(f, "SUM"),
            Self::Avg => write!(f, "AVG"),
        }
    }
}

/// Aggregate clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSpec {
    pub column: Column,
    pub op: AggregateOp,
}

/// A validated search request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    filters: BTreeMap<Column, Predicate>,
    sort: Option<SortSpec>,
    aggregate: Option<AggregateSpec>,
}

impl QuerySpec {
    /// Start building a spec programmatically
    pub fn builder() -> QuerySpecBuilder {
        QuerySpecBuilder::default()
    }

    /// Per-column predicates, in schema order
    pub fn filters(&self) -> &BTreeMap<Column, Predicate> {
        &self.filters
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn aggregate(&self) -> Option<&AggregateSpec> {
        self.aggregate.as_ref()
    }
}

/// Builder for constructing query specs programmatically
///
/// `build` applies the same checks as the JSON parser.
#[derive(Debug, Clone, Default)]
pub struct QuerySpecBuilder {
    filters: Vec<(Column, Comparison, ColumnValue)>,
    sort: Option<SortSpec>,
    aggregate: Option<AggregateSpec>,
}

impl QuerySpecBuilder {
    /// Add a filter condition
    pub fn filter(mut self, column: Column, op: Comparison, value: impl Into<ColumnValue>) -> Self {
        self.filters.push((column, op, value.into()));
        self
    }

    /// Add a `gte`/`lte` pair on one column
    pub fn range(self, column: Column, low: impl Into<ColumnValue>, high: impl Into<ColumnValue>) -> Self {
        self.filter(column, Comparison::Gte, low)
            .filter(column, Comparison::Lte, high)
    }

    /// Set the sort clause
    pub fn sort(mut self, column: Column, order: SortOrder) -> Self {
        self.sort = Some(SortSpec { column, order });
        self
    }

    /// Set the aggregate clause
    pub fn aggregate(mut self, column: Column, op: AggregateOp) -> Self {
        self.aggregate = Some(AggregateSpec { column, op });
        self
    }

    /// Validate and build the spec
    pub fn build(self) -> QueryResult<QuerySpec> {
        let mut filters: BTreeMap<Column, Predicate> = BTreeMap::new();
        for (column, op, value) in self.filters {
            let value = coerce_operand(column, op, value)?;
            filters.entry(column).or_default().set(op, value);
        }

        if let Some(agg) = &self.aggregate {
            check_aggregate(agg.column, agg.op)?;
        }

        Ok(QuerySpec {
            filters,
            sort: self.sort,
            aggregate: self.aggregate,
        })
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        ColumnValue::Integer(v)
    }
}

impl From<f64> for ColumnValue {
    fn from(v: f64) -> Self {
        ColumnValue::Real(v)
    }
}

impl From<crate::storage::Visibility> for ColumnValue {
    fn from(v: crate::storage::Visibility) -> Self {
        ColumnValue::Code(v)
    }
}

/// Bring an operand to the kind its column stores
///
/// Integers widen to reals for real columns; integral reals narrow to
/// integers for the timestamp column. Anything else is a type mismatch.
pub(crate) fn coerce_operand(
    column: Column,
    op: Comparison,
    value: ColumnValue,
) -> QueryResult<ColumnValue> {
    let mismatch = |found: &str| QueryError::TypeMismatch {
        column,
        operator: op.key().to_string(),
        expected: column.kind(),
        found: found.to_string(),
    };

    match (column.kind(), value) {
        (ColumnKind::Integer, ColumnValue::Integer(_)) => Ok(value),
        (ColumnKind::Integer, ColumnValue::Real(v)) => {
            if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                Ok(ColumnValue::Integer(v as i64))
            } else {
                Err(mismatch("fractional number"))
            }
        }
        (ColumnKind::Real, ColumnValue::Integer(v)) => Ok(ColumnValue::Real(v as f64)),
        (ColumnKind::Real, ColumnValue::Real(v)) if v.is_finite() => Ok(value),
        (ColumnKind::Real, ColumnValue::Real(_)) => Err(mismatch("non-finite number")),
        (ColumnKind::Enum, ColumnValue::Code(_)) => Ok(value),
        (_, ColumnValue::Code(_)) => Err(mismatch("visibility code")),
        (ColumnKind::Enum, _) => Err(mismatch("number")),
    }
}

/// Check that an aggregate can run on a column
pub(crate) fn check_aggregate(column: Column, op: AggregateOp) -> QueryResult<()> {
    if !column.is_data_column() {
        return Err(QueryError::TimestampAggregate);
    }
    if !op.supports(column) {
        return Err(QueryError::UnsupportedAggregate { op, column });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Visibility;

    #[test]
    fn test_sort_order_normalization() {
        assert_eq!(SortOrder::from_request(Some("descending")), SortOrder::Descending);
        assert_eq!(SortOrder::from_request(Some("desc")), SortOrder::Descending);
        assert_eq!(SortOrder::from_request(Some("ascending")), SortOrder::Ascending);
        assert_eq!(SortOrder::from_request(Some("DESC")), SortOrder::Ascending);
        assert_eq!(SortOrder::from_request(Some("decsending")), SortOrder::Ascending);
        assert_eq!(SortOrder::from_request(None), SortOrder::Ascending);
    }

    #[test]
    fn test_aggregate_op_case_insensitive() {
        assert_eq!(AggregateOp::from_name("avg"), Some(AggregateOp::Avg));
        assert_eq!(AggregateOp::from_name("Count"), Some(AggregateOp::Count));
        assert_eq!(AggregateOp::from_name("SUM"), Some(AggregateOp::Sum));
        assert_eq!(AggregateOp::from_name("median"), None);
        assert_eq!(AggregateOp::from_name(""), None);
    }

    #[test]
    fn test_aggregate_op_support() {
        assert!(AggregateOp::Count.supports(Column::Visibility));
        assert!(!AggregateOp::Avg.supports(Column::Visibility));
        assert!(AggregateOp::Max.supports(Column::WindSpeed));
    }

    #[test]
    fn test_predicate_iteration_order() {
        let mut p = Predicate::default();
        assert!(p.is_empty());

        p.set(Comparison::Eq, ColumnValue::Real(3.0));
        p.set(Comparison::Gte, ColumnValue::Real(1.0));

        let ops: Vec<_> = p.iter().map(|(op, _)| op).collect();
        assert_eq!(ops, vec![Comparison::Gte, Comparison::Eq]);
    }

    #[test]
    fn test_builder_merges_same_column() {
        let spec = QuerySpec::builder()
            .range(Column::Temperature, 10.0, 20.0)
            .filter(Column::Visibility, Comparison::Eq, Visibility::Good)
            .build()
            .unwrap();

        assert_eq!(spec.filters().len(), 2);
        let temp = spec.filters()[&Column::Temperature];
        assert_eq!(temp.gte, Some(ColumnValue::Real(10.0)));
        assert_eq!(temp.lte, Some(ColumnValue::Real(20.0)));
        assert!(temp.eq.is_none());
    }

    #[test]
    fn test_builder_coerces_operands() {
        let spec = QuerySpec::builder()
            .filter(Column::Humidity, Comparison::Gte, 50_i64)
            .filter(Column::Timestamp, Comparison::Lte, 1_700_000_000.0)
            .build()
            .unwrap();

        assert_eq!(spec.filters()[&Column::Humidity].gte, Some(ColumnValue::Real(50.0)));
        assert_eq!(
            spec.filters()[&Column::Timestamp].lte,
            Some(ColumnValue::Integer(1_700_000_000))
        );
    }

    #[test]
    fn test_builder_rejects_mismatched_operands() {
        let err = QuerySpec::builder()
            .filter(Column::Visibility, Comparison::Eq, 3.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { column: Column::Visibility, .. }));

        let err = QuerySpec::builder()
            .filter(Column::Timestamp, Comparison::Gte, 1.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { column: Column::Timestamp, .. }));

        let err = QuerySpec::builder()
            .filter(Column::Rainfall, Comparison::Eq, f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }

    #[test]
    fn test_builder_rejects_bad_aggregates() {
        let err = QuerySpec::builder()
            .aggregate(Column::Timestamp, AggregateOp::Max)
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryError::TimestampAggregate));

        let err = QuerySpec::builder()
            .aggregate(Column::Visibility, AggregateOp::Sum)
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedAggregate { .. }));

        assert!(QuerySpec::builder()
            .aggregate(Column::Visibility, AggregateOp::Count)
            .build()
            .is_ok());
    }
}
