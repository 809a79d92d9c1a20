//! Reading store interface
//!
//! The query executor and the ingestor only see this trait, so the SQLite
//! engine can be swapped for another backend.

use async_trait::async_trait;

use crate::query::{AggregatePlan, Conjunction, OrderKey};
use crate::storage::error::StorageResult;
use crate::storage::types::Reading;

/// Value produced by an aggregate operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateValue {
    /// Number of matching rows
    Count(u64),
    /// MAX/MIN/SUM/AVG result, `None` when no row matched
    Number(Option<f64>),
}

/// Persistent storage for readings
///
/// Implementations backed by blocking I/O must move that work off the async
/// workers (e.g. `tokio::task::spawn_blocking`), since handlers await these
/// methods directly.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Append a batch of readings atomically
    ///
    /// Either every reading is stored or none is. Returns the number stored.
    async fn append(&self, readings: &[Reading]) -> StorageResult<usize>;

    /// Find readings matching the predicate
    ///
    /// Without an order key rows come back in insertion order; ties under an
    /// order key also keep insertion order.
    async fn find(
        &self,
        predicate: &Conjunction,
        order: Option<&OrderKey>,
    ) -> StorageResult<Vec<Reading>>;

    /// Compute one aggregate over the readings matching the predicate
    async fn aggregate(
        &self,
        predicate: &Conjunction,
        aggregate: &AggregatePlan,
    ) -> StorageResult<AggregateValue>;

    /// Total number of stored readings
    async fn count(&self) -> StorageResult<u64>;
}
