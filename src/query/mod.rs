//! Query Engine
//!
//! Turns an untyped JSON search body into a result:
//!
//! - **AST**: `QuerySpec` and its clause types
//! - **Parser**: validate JSON into a `QuerySpec`
//! - **Plan**: compile a spec into a conjunction, order key and aggregate
//! - **Executor**: run a plan against a `ReadingStore`
//!
//! # Examples
//!
//! ## Using the Query Builder
//!
//! ```rust,ignore
//! use weatherlog::query::{AggregateOp, QueryExecutor, QuerySpec, SortOrder};
//! use weatherlog::storage::Column;
//!
//! let spec = QuerySpec::builder()
//!     .range(Column::Temperature, 10.0, 20.0)
//!     .sort(Column::Humidity, SortOrder::Descending)
//!     .build()?;
//!
//! let outcome = executor.execute_spec(&spec).await?;
//! ```
//!
//! ## Using a JSON Body
//!
//! ```rust,ignore
//! let outcome = executor.execute_json(&serde_json::json!({
//!     "filters": { "visibility": { "eq": "G" } },
//!     "aggregate": { "column": "rainfall", "operator": "avg" }
//! })).await?;
//! ```

mod ast;
mod error;
mod executor;
mod parser;
mod plan;

pub use ast::{
    AggregateOp, AggregateSpec, Comparison, Predicate, QuerySpec, QuerySpecBuilder, SortOrder,
    SortSpec,
};
pub use error::{QueryError, QueryResult};
pub use executor::{AggregateResult, QueryExecutor, QueryOutcome};
pub use parser::{parse_query_spec, parse_query_str};
pub use plan::{AggregatePlan, Condition, Conjunction, OrderKey, QueryPlan};
