//! Query plans
//!
//! A [`QueryPlan`] is the executable form of a [`QuerySpec`]: a conjunction of
//! single-column conditions, an optional ordering key and an optional
//! aggregate. Building a plan cannot fail; every check happened when the spec
//! was built.
//!
//! The in-memory evaluators (`Condition::matches`, `OrderKey::compare`,
//! `AggregatePlan::apply`) have the same semantics as the SQLite store and are
//! used by tests and by alternative store backends.

use std::cmp::Ordering;

use crate::query::ast::{AggregateOp, Comparison, QuerySpec, SortOrder};
use crate::storage::{AggregateValue, Column, ColumnValue, Reading};

/// `column <op> value`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub column: Column,
    pub op: Comparison,
    pub value: ColumnValue,
}

impl Condition {
    pub fn new(column: Column, op: Comparison, value: ColumnValue) -> Self {
        Self { column, op, value }
    }

    /// Evaluate against a reading
    pub fn matches(&self, reading: &Reading) -> bool {
        reading
            .value(self.column)
            .compare(&self.value)
            .map(|ord| self.op.holds(ord))
            .unwrap_or(false)
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.column, self.op, self.value)
    }
}

/// Conditions joined with AND; empty matches every reading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conjunction {
    conditions: Vec<Condition>,
}

impl Conjunction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn matches(&self, reading: &Reading) -> bool {
        self.conditions.iter().all(|c| c.matches(reading))
    }
}

impl FromIterator<Condition> for Conjunction {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        Self {
            conditions: iter.into_iter().collect(),
        }
    }
}

/// Ordering key for result rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub column: Column,
    pub order: SortOrder,
}

impl OrderKey {
    /// Compare two readings by this key
    ///
    /// Equal keys compare `Equal`, so a stable sort keeps insertion order.
    pub fn compare(&self, a: &Reading, b: &Reading) -> Ordering {
        let ord = a
            .value(self.column)
            .compare(&b.value(self.column))
            .unwrap_or(Ordering::Equal);
        match self.order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    }
}

/// One aggregate over one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatePlan {
    pub op: AggregateOp,
    pub column: Column,
}

impl AggregatePlan {
    /// Compute the aggregate over already-filtered readings
    pub fn apply<'a, I>(&self, readings: I) -> AggregateValue
    where
        I: IntoIterator<Item = &'a Reading>,
    {
        let values: Vec<_> = readings.into_iter().map(|r| r.value(self.column)).collect();
        let numbers = values.iter().filter_map(|v| v.as_f64());

        match self.op {
            AggregateOp::Count => AggregateValue::Count(values.len() as u64),
            AggregateOp::Max => AggregateValue::Number(numbers.reduce(f64::max)),
            AggregateOp::Min => AggregateValue::Number(numbers.reduce(f64::min)),
            AggregateOp::Sum => AggregateValue::Number(numbers.reduce(|a, b| a + b)),
            AggregateOp::Avg => {
                let (sum, n) = numbers.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
                AggregateValue::Number((n > 0).then(|| sum / n as f64))
            }
        }
    }
}

/// Executable form of a query spec
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    predicate: Conjunction,
    order: Option<OrderKey>,
    aggregate: Option<AggregatePlan>,
}

impl QueryPlan {
    /// Compile a spec
    ///
    /// Conditions come out in schema column order, then gte, lte, eq within a
    /// column, so equal specs always give equal plans.
    pub fn build(spec: &QuerySpec) -> Self {
        let predicate = spec
            .filters()
            .iter()
            .flat_map(|(column, predicate)| {
                predicate
                    .iter()
                    .map(move |(op, value)| Condition::new(*column, op, value))
            })
            .collect();

        Self {
            predicate,
            order: spec.sort().map(|s| OrderKey {
                column: s.column,
                order: s.order,
            }),
            aggregate: spec.aggregate().map(|a| AggregatePlan {
                op: a.op,
                column: a.column,
            }),
        }
    }

    pub fn predicate(&self) -> &Conjunction {
        &self.predicate
    }

    /// Requested ordering, even when it will not be applied
    pub fn order(&self) -> Option<&OrderKey> {
        self.order.as_ref()
    }

    /// Ordering that applies to the result
    ///
    /// An aggregate yields one row, so sorting is dropped.
    pub fn effective_order(&self) -> Option<&OrderKey> {
        if self.aggregate.is_some() {
            None
        } else {
            self.order.as_ref()
        }
    }

    pub fn aggregate(&self) -> Option<&AggregatePlan> {
        self.aggregate.as_ref()
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query_spec;
    use crate::storage::Visibility;
    use serde_json::json;

    fn readings() -> Vec<Reading> {
        vec![
            Reading::new(100, 15.0, 0.0, 70.0, 3.0, Visibility::Good),
            Reading::new(200, 22.5, 1.5, 60.0, 8.0, Visibility::Moderate),
            Reading::new(300, 9.0, 2.5, 90.0, 12.0, Visibility::VeryPoor),
            Reading::new(400, 15.0, 0.5, 75.0, 0.0, Visibility::Excellent),
        ]
    }

    fn plan(body: serde_json::Value) -> QueryPlan {
        QueryPlan::build(&parse_query_spec(&body).unwrap())
    }

    #[test]
    fn test_condition_order_is_deterministic() {
        let p = plan(json!({
            "filters": {
                "visibility": { "eq": "G" },
                "temperature": { "eq": 15, "lte": 20, "gte": 10 }
            }
        }));

        let ops: Vec<_> = p
            .predicate()
            .conditions()
            .iter()
            .map(|c| (c.column, c.op))
            .collect();
        assert_eq!(
            ops,
            vec![
                (Column::Temperature, Comparison::Gte),
                (Column::Temperature, Comparison::Lte),
                (Column::Temperature, Comparison::Eq),
                (Column::Visibility, Comparison::Eq),
            ]
        );
    }

    #[test]
    fn test_empty_conjunction_matches_all() {
        let p = plan(json!({}));
        assert!(p.predicate().is_empty());
        assert!(readings().iter().all(|r| p.predicate().matches(r)));
    }

    #[test]
    fn test_range_matches() {
        let p = plan(json!({ "filters": { "temperature": { "gte": 10, "lte": 20 } } }));
        let hits: Vec<i64> = readings()
            .iter()
            .filter(|r| p.predicate().matches(r))
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(hits, vec![100, 400]);
    }

    #[test]
    fn test_column_filters_only_count_under_filters_clause() {
        let nested = plan(json!({
            "filters": {
                "temperature": { "gte": 5, "lte": 25 },
                "visibility": { "gte": "M" }
            }
        }));
        assert_eq!(nested.predicate().len(), 3);

        let top_level = plan(json!({
            "temperature": { "gte": 5, "lte": 25 },
            "visibility": { "gte": "M" }
        }));
        assert!(top_level.predicate().is_empty());
    }

    #[test]
    fn test_visibility_compares_along_scale() {
        let p = plan(json!({ "filters": { "visibility": { "gte": "M" } } }));
        let hits: Vec<i64> = readings()
            .iter()
            .filter(|r| p.predicate().matches(r))
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(hits, vec![100, 200, 400]);
    }

    #[test]
    fn test_order_key_ties_keep_insertion_order() {
        let key = OrderKey {
            column: Column::Temperature,
            order: SortOrder::Descending,
        };
        let mut rows = readings();
        rows.sort_by(|a, b| key.compare(a, b));
        let ts: Vec<i64> = rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(ts, vec![200, 100, 400, 300]);
    }

    #[test]
    fn test_sort_ignored_with_aggregate() {
        let p = plan(json!({
            "sort": { "column": "humidity", "order": "desc" },
            "aggregate": { "column": "rainfall", "operator": "sum" }
        }));
        assert!(p.order().is_some());
        assert!(p.effective_order().is_none());
        assert!(p.is_aggregate());
    }

    #[test]
    fn test_aggregate_apply() {
        let rows = readings();
        let avg = AggregatePlan {
            op: AggregateOp::Avg,
            column: Column::Rainfall,
        };
        assert_eq!(avg.apply(&rows), AggregateValue::Number(Some(1.125)));

        let max = AggregatePlan {
            op: AggregateOp::Max,
            column: Column::WindSpeed,
        };
        assert_eq!(max.apply(&rows), AggregateValue::Number(Some(12.0)));

        let min = AggregatePlan {
            op: AggregateOp::Min,
            column: Column::Temperature,
        };
        assert_eq!(min.apply(&rows), AggregateValue::Number(Some(9.0)));

        let sum = AggregatePlan {
            op: AggregateOp::Sum,
            column: Column::Humidity,
        };
        assert_eq!(sum.apply(&rows), AggregateValue::Number(Some(295.0)));

        let count = AggregatePlan {
            op: AggregateOp::Count,
            column: Column::Visibility,
        };
        assert_eq!(count.apply(&rows), AggregateValue::Count(4));
    }

    #[test]
    fn test_aggregate_apply_empty() {
        let none: Vec<Reading> = Vec::new();
        let sum = AggregatePlan {
            op: AggregateOp::Sum,
            column: Column::Humidity,
        };
        assert_eq!(sum.apply(&none), AggregateValue::Number(None));

        let count = AggregatePlan {
            op: AggregateOp::Count,
            column: Column::Humidity,
        };
        assert_eq!(count.apply(&none), AggregateValue::Count(0));
    }
}
