//! Background metadata backfill.
//!
//! Books added by hand often lack a cover, description, page count or categories. The backfill
//! loop periodically picks up books that have never been looked up, asks the metadata providers
//! about them and fills whatever is still empty. Every scanned book is marked as attempted
//! whether or not anything was found, so a book is looked up at most once by the loop. Owners
//! can still ask for a fresh lookup through `POST /api/v1/books/{id}/enrich`.
//!
//! Provider APIs are rate limited, so books are processed one at a time with a fixed delay in
//! between. There is no retry or backoff: a failed lookup is counted and the book is not picked
//! up again.

use crate::config::BackfillConfig;
use crate::db::handlers::Books;
use crate::db::models::books::BookDBResponse;
use crate::errors::Error;
use crate::metadata::MetadataService;
use crate::types::abbrev_uuid;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Outcome of one backfill batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub scanned: usize,
    pub enriched: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// Result of enriching a single book.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub book: BookDBResponse,
    /// Columns that were empty before and are filled now
    pub filled: Vec<&'static str>,
}

/// Look a book up and fill the columns it is missing.
///
/// Returns `Ok(None)` when no provider knows the book; the book is still marked as attempted.
/// Provider failures propagate after the book has been marked.
#[instrument(skip(conn, metadata, book), fields(book_id = %abbrev_uuid(&book.id)), err)]
pub async fn enrich_book(conn: &mut PgConnection, metadata: &MetadataService, book: &BookDBResponse) -> Result<Option<Enrichment>, Error> {
    let found = match metadata.find_for_book(book).await {
        Ok(found) => found,
        Err(e) => {
            Books::new(&mut *conn).mark_metadata_attempted(book.id).await?;
            return Err(e);
        }
    };

    let Some(found) = found else {
        Books::new(&mut *conn).mark_metadata_attempted(book.id).await?;
        return Ok(None);
    };

    let before = book.missing_metadata();
    let updated = Books::new(&mut *conn).apply_metadata(book.id, &found.to_fill()).await?;
    let after = updated.missing_metadata();
    let filled = before.into_iter().filter(|field| !after.contains(field)).collect();

    Ok(Some(Enrichment { book: updated, filled }))
}

/// Enrich up to `batch_size` books that have not been looked up yet.
#[instrument(skip(pool, metadata), err)]
pub async fn run_batch(pool: &PgPool, metadata: &MetadataService, batch_size: i64, delay: Duration) -> anyhow::Result<BackfillReport> {
    let mut conn = pool.acquire().await?;
    let candidates = Books::new(&mut conn).list_backfill_candidates(batch_size).await?;

    let mut report = BackfillReport::default();
    for (i, book) in candidates.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        report.scanned += 1;

        match enrich_book(&mut conn, metadata, book).await {
            Ok(Some(enrichment)) => {
                debug!(book_id = %abbrev_uuid(&book.id), filled = ?enrichment.filled, "Book enriched");
                report.enriched += 1;
            }
            Ok(None) => report.not_found += 1,
            Err(e) => {
                warn!(book_id = %abbrev_uuid(&book.id), error = %e, "Metadata lookup failed");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Periodic backfill loop.
pub struct BackfillService {
    pool: PgPool,
    metadata: Arc<MetadataService>,
    config: BackfillConfig,
}

impl BackfillService {
    pub fn new(pool: PgPool, metadata: Arc<MetadataService>, config: BackfillConfig) -> Self {
        Self { pool, metadata, config }
    }

    /// Run batches every `interval` until `shutdown` is cancelled. The first batch runs immediately.
    pub async fn run(self, shutdown: CancellationToken) {
        if self.metadata.is_empty() {
            info!("No metadata providers enabled, backfill not started");
            return;
        }
        info!(
            interval = ?self.config.interval,
            batch_size = self.config.batch_size,
            "Starting metadata backfill"
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            let batch = run_batch(&self.pool, &self.metadata, self.config.batch_size, self.config.request_delay);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = batch => match result {
                    Ok(report) if report.scanned > 0 => info!(?report, "Backfill batch complete"),
                    Ok(_) => debug!("Nothing to backfill"),
                    Err(e) => warn!(error = %e, "Backfill batch failed"),
                },
            }
        }

        info!("Metadata backfill stopped");
    }
}
