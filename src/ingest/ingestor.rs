//! Batch ingestion into the reading store

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use super::decoder::CsvDecoder;
use super::normalizer::normalize_batch;
use super::{IngestError, IngestResult};
use crate::storage::ReadingStore;

/// Outcome of a successful upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Number of readings stored
    pub accepted: usize,
}

/// Decodes, validates and stores CSV batches
pub struct Ingestor {
    store: Arc<dyn ReadingStore>,
    decoder: CsvDecoder,
    max_batch_rows: usize,
}

impl Ingestor {
    pub fn new(store: Arc<dyn ReadingStore>, max_batch_rows: usize) -> Self {
        Self {
            store,
            decoder: CsvDecoder::new(),
            max_batch_rows,
        }
    }

    /// Replace the default comma decoder
    pub fn with_decoder(mut self, decoder: CsvDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn max_batch_rows(&self) -> usize {
        self.max_batch_rows
    }

    /// Ingest a CSV body
    ///
    /// Nothing is stored unless every row is valid.
    pub async fn ingest_csv(&self, body: &str) -> IngestResult<IngestSummary> {
        let start = Instant::now();

        let rows = self.decoder.decode(body)?;
        if rows.is_empty() {
            return Err(IngestError::EmptyOrInvalidPayload);
        }
        if rows.len() > self.max_batch_rows {
            return Err(IngestError::BatchTooLarge {
                rows: rows.len(),
                max: self.max_batch_rows,
            });
        }

        let readings = normalize_batch(&rows)?;
        let accepted = self.store.append(&readings).await?;

        tracing::info!(
            accepted,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Ingested CSV batch"
        );

        Ok(IngestSummary { accepted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Conjunction;
    use crate::storage::{StorageEngine, Visibility};

    const HEADER: &str = "timestamp,temperature,rainfall,humidity,wind_speed,visibility\n";

    fn create_test_ingestor(max: usize) -> (Ingestor, Arc<StorageEngine>) {
        let engine = Arc::new(StorageEngine::open_in_memory().unwrap());
        let ingestor = Ingestor::new(engine.clone(), max);
        (ingestor, engine)
    }

    #[tokio::test]
    async fn test_ingest_valid_batch() {
        let (ingestor, engine) = create_test_ingestor(100);
        let body = format!(
            "{}1700000000,12.5,0.0,80,4.2,G\n1700000060,13.1,0.4,78,5.0,VG\n",
            HEADER
        );

        let summary = ingestor.ingest_csv(&body).await.unwrap();
        assert_eq!(summary.accepted, 2);

        let rows = engine.find(&Conjunction::new(), None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].temperature, 13.1);
        assert_eq!(rows[1].visibility, Visibility::VeryGood);
    }

    #[tokio::test]
    async fn test_ingest_empty_body() {
        let (ingestor, engine) = create_test_ingestor(100);

        for body in ["", "   ", HEADER] {
            let err = ingestor.ingest_csv(body).await.unwrap_err();
            assert!(matches!(err, IngestError::EmptyOrInvalidPayload));
        }
        assert_eq!(engine.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_invalid_row_stores_nothing() {
        let (ingestor, engine) = create_test_ingestor(100);
        let body = format!(
            "{}1700000000,12.5,0.0,80,4.2,G\n1700000060,hot,0.4,78,5.0,VG\n",
            HEADER
        );

        let err = ingestor.ingest_csv(&body).await.unwrap_err();
        assert!(matches!(err, IngestError::MalformedRow { line: 3, .. }));
        assert_eq!(engine.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_batch_limit() {
        let (ingestor, engine) = create_test_ingestor(1);
        let body = format!("{}1,1,0,1,0,G\n2,1,0,1,0,G\n", HEADER);

        let err = ingestor.ingest_csv(&body).await.unwrap_err();
        assert!(matches!(err, IngestError::BatchTooLarge { rows: 2, max: 1 }));
        assert_eq!(engine.count().await.unwrap(), 0);
    }
}
