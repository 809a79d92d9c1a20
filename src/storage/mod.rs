//! Reading Storage
//!
//! This module provides persistence for weather readings:
//!
//! - **schema**: The six sensor columns, their kinds and bounds
//! - **types**: Core data structures (Reading, Visibility, ColumnValue)
//! - **store**: The `ReadingStore` trait the rest of the crate talks to
//! - **engine**: SQLite implementation of `ReadingStore`
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use weatherlog::storage::{Reading, ReadingStore, StorageEngine, Visibility};
//! use weatherlog::query::Conjunction;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = StorageEngine::open("./weather.db")?;
//!
//!     engine
//!         .append(&[Reading::new(1_700_000_000, 12.5, 0.0, 80.0, 4.2, Visibility::Good)])
//!         .await?;
//!
//!     let all = engine.find(&Conjunction::new(), None).await?;
//!     println!("{} readings", all.len());
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod schema;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use engine::StorageEngine;
pub use error::{StorageError, StorageResult};
pub use schema::{Column, ColumnKind};
pub use store::{AggregateValue, ReadingStore};
pub use types::{ColumnValue, Reading, Visibility};
