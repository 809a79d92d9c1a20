//! Query Executor
//!
//! Runs a [`QueryPlan`] against a [`ReadingStore`] and shapes the result.
//!
//! # Execution Pipeline
//!
//! ```text
//! JSON → QuerySpec → QueryPlan → Store (find | aggregate) → QueryOutcome
//! ```

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::query::ast::{AggregateOp, QuerySpec};
use crate::query::error::QueryResult;
use crate::query::parser::{parse_query_spec, parse_query_str};
use crate::query::plan::QueryPlan;
use crate::storage::{AggregateValue, Column, Reading, ReadingStore};

/// Result of running a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    /// Matching readings, in the requested order
    Rows(Vec<Reading>),
    /// A single aggregate value
    Aggregate(AggregateResult),
}

impl QueryOutcome {
    /// Number of rows returned (1 for an aggregate)
    pub fn len(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Aggregate(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> Option<&[Reading]> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Aggregate(_) => None,
        }
    }

    pub fn aggregate(&self) -> Option<&AggregateResult> {
        match self {
            Self::Aggregate(agg) => Some(agg),
            Self::Rows(_) => None,
        }
    }
}

/// Aggregate value together with what produced it
///
/// Serializes keyed by operator, then column: `{"_avg": {"rainfall": 1.25}}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateResult {
    pub op: AggregateOp,
    pub column: Column,
    pub value: AggregateValue,
}

impl AggregateResult {
    /// Numeric view of the value (`None` for an empty MAX/MIN/SUM/AVG)
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            AggregateValue::Count(n) => Some(n as f64),
            AggregateValue::Number(v) => v,
        }
    }
}

impl Serialize for AggregateResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Inner<'a>(&'a AggregateResult);

        impl Serialize for Inner<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(1))?;
                match self.0.value {
                    AggregateValue::Count(n) => map.serialize_entry(self.0.column.name(), &n)?,
                    AggregateValue::Number(v) => map.serialize_entry(self.0.column.name(), &v)?,
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.op.result_key(), &Inner(self))?;
        map.end()
    }
}

/// Query executor
pub struct QueryExecutor {
    store: Arc<dyn ReadingStore>,
}

impl QueryExecutor {
    /// Create a new query executor
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    /// Parse, plan and execute a JSON request body
    pub async fn execute_json(&self, body: &Value) -> QueryResult<QueryOutcome> {
        let spec = parse_query_spec(body)?;
        self.execute_spec(&spec).await
    }

    /// Parse, plan and execute a JSON request string
    pub async fn execute_str(&self, input: &str) -> QueryResult<QueryOutcome> {
        let spec = parse_query_str(input)?;
        self.execute_spec(&spec).await
    }

    /// Plan and execute a validated spec
    pub async fn execute_spec(&self, spec: &QuerySpec) -> QueryResult<QueryOutcome> {
        self.execute(&QueryPlan::build(spec)).await
    }

    /// Execute a plan
    pub async fn execute(&self, plan: &QueryPlan) -> QueryResult<QueryOutcome> {
        let start = Instant::now();

        let outcome = match plan.aggregate() {
            Some(aggregate) => {
                let value = self.store.aggregate(plan.predicate(), aggregate).await?;
                QueryOutcome::Aggregate(AggregateResult {
                    op: aggregate.op,
                    column: aggregate.column,
                    value,
                })
            }
            None => {
                let rows = self
                    .store
                    .find(plan.predicate(), plan.effective_order())
                    .await?;
                QueryOutcome::Rows(rows)
            }
        };

        tracing::debug!(
            conditions = plan.predicate().len(),
            aggregate = plan.is_aggregate(),
            rows = outcome.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query executed"
        );

        Ok(outcome)
    }
}
