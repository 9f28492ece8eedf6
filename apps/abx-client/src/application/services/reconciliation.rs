//! Reconciliation Service
//!
//! Orchestrates one "stream all" operation: bulk fetch, gap analysis against
//! the high watermark, and ascending one-at-a-time backfill of every missing
//! sequence. Also serves single-record requests from the operator.
//!
//! No fault aborts a run. Connection faults and malformed records degrade to
//! absent sequences, which the returned [`ReconciliationReport`] lists.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::backfill_retry::{BackfillRetryConfig, BackfillRetryPolicy};
use crate::application::ports::{PacketSource, TransportError};
use crate::domain::order::{OrderRecord, Sequence};
use crate::domain::reconciliation::{BackfillOutcome, RetrievalSession};
use crate::infrastructure::metrics::{self, BackfillResult};

// =============================================================================
// Errors
// =============================================================================

/// Failure of a caller-facing request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Sequence outside `1..=255`; rejected before any connection.
    #[error("invalid sequence number {0}: must be between 1 and 255")]
    InvalidSequence(i64),

    /// Operator input is not an integer.
    #[error("not a number: {0:?}")]
    Parse(String),

    /// Connection-level fault while fetching.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Parse operator input into a candidate sequence number.
///
/// # Errors
///
/// Returns [`RequestError::Parse`] if the trimmed input is not an integer.
pub fn parse_sequence_input(input: &str) -> Result<i64, RequestError> {
    let trimmed = input.trim();
    trimmed
        .parse()
        .map_err(|_| RequestError::Parse(trimmed.to_string()))
}

// =============================================================================
// Report
// =============================================================================

/// Result of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    /// Identifier carried on the run's tracing span.
    pub run_id: Uuid,
    /// Records sorted ascending by sequence.
    pub records: Vec<OrderRecord>,
    /// Highest sequence seen in the bulk stream.
    pub high_watermark: Option<Sequence>,
    /// Distinct sequences decoded from the bulk stream.
    pub streamed: usize,
    /// Sequences missing after the bulk stream.
    pub gaps: Vec<Sequence>,
    /// Gaps that backfill could not recover.
    pub unresolved: Vec<Sequence>,
    /// Connection fault that ended the bulk stream early.
    pub stream_fault: Option<String>,
    /// Completion timestamp.
    pub completed_at: DateTime<Utc>,
    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl ReconciliationReport {
    /// Whether every sequence in `[1, watermark]` is present and the bulk
    /// stream ended without a fault.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.stream_fault.is_none()
    }

    /// Number of gaps recovered by backfill.
    #[must_use]
    pub fn recovered(&self) -> usize {
        self.gaps.len() - self.unresolved.len()
    }
}

// =============================================================================
// Service
// =============================================================================

/// Stream, detect gaps, backfill.
pub struct ReconciliationService<S>
where
    S: PacketSource,
{
    source: Arc<S>,
    retry: BackfillRetryConfig,
}

impl<S> ReconciliationService<S>
where
    S: PacketSource,
{
    /// Create a service over a packet source.
    pub const fn new(source: Arc<S>, retry: BackfillRetryConfig) -> Self {
        Self { source, retry }
    }

    /// Fetch every record, backfilling gaps, sorted by sequence.
    pub async fn get_all_packets(&self) -> Vec<OrderRecord> {
        self.reconcile().await.records
    }

    /// Fetch a single record by sequence.
    ///
    /// `Ok(None)` means the server did not deliver a complete, valid record.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidSequence`] without connecting when
    /// `sequence` is outside `1..=255`, or [`RequestError::Transport`] on a
    /// connection fault.
    pub async fn request_packet_by_sequence(
        &self,
        sequence: i64,
    ) -> Result<Option<OrderRecord>, RequestError> {
        let sequence =
            Sequence::new(sequence).map_err(|_| RequestError::InvalidSequence(sequence))?;
        let record = self.source.fetch_one(sequence).await?;
        if record.is_none() {
            tracing::info!(%sequence, "No record received");
        }
        Ok(record)
    }

    /// Run a full stream-and-backfill operation.
    pub async fn reconcile(&self) -> ReconciliationReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("reconciliation", %run_id);
        self.run(run_id).instrument(span).await
    }

    async fn run(&self, run_id: Uuid) -> ReconciliationReport {
        let started = Instant::now();
        let mut session = RetrievalSession::new();
        tracing::info!(phase = %session.phase(), "Requesting full stream");

        let fetch = self.source.fetch_stream().await;
        let stream_fault = fetch.fault.map(|e| {
            tracing::warn!(error = %e, "Bulk stream interrupted");
            e.to_string()
        });
        for record in fetch.records {
            session.observe_streamed(record);
        }

        let gaps = session.analyze_gaps();
        tracing::info!(
            phase = %session.phase(),
            streamed = session.streamed_count(),
            watermark = session.high_watermark().map(Sequence::as_u8),
            gaps = gaps.len(),
            "Bulk stream complete"
        );

        let mut unresolved = Vec::new();
        if !gaps.is_empty() {
            metrics::record_gaps(gaps.len());
            tracing::warn!(missing = ?gaps_display(&gaps), "Gaps detected");

            session.begin_backfill();
            for &gap in &gaps {
                if !self.backfill(&mut session, gap).await {
                    unresolved.push(gap);
                }
            }
        }

        let high_watermark = session.high_watermark();
        let streamed = session.streamed_count();
        let records = session.finish();

        let elapsed = started.elapsed();
        metrics::record_reconciliation_duration(elapsed);

        let report = ReconciliationReport {
            run_id,
            records,
            high_watermark,
            streamed,
            gaps,
            unresolved,
            stream_fault,
            completed_at: Utc::now(),
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        };

        if report.unresolved.is_empty() {
            tracing::info!(
                records = report.records.len(),
                recovered = report.recovered(),
                duration_ms = report.duration_ms,
                "Reconciliation complete"
            );
        } else {
            tracing::warn!(
                records = report.records.len(),
                recovered = report.recovered(),
                unresolved = ?gaps_display(&report.unresolved),
                duration_ms = report.duration_ms,
                "Reconciliation finished with missing sequences"
            );
        }

        report
    }

    /// Request one missing sequence, retrying per policy. Returns whether it
    /// was filled.
    async fn backfill(&self, session: &mut RetrievalSession, gap: Sequence) -> bool {
        let mut policy = BackfillRetryPolicy::new(self.retry.clone());

        loop {
            let attempt = policy.attempts();
            match self.source.fetch_one(gap).await {
                Ok(Some(record)) => match session.fill(gap, record) {
                    BackfillOutcome::Filled => {
                        metrics::record_backfill(BackfillResult::Recovered);
                        tracing::debug!(sequence = %gap, attempt, "Gap filled");
                        return true;
                    }
                    BackfillOutcome::SequenceMismatch {
                        requested,
                        received,
                    } => {
                        metrics::record_backfill(BackfillResult::Mismatch);
                        tracing::warn!(
                            %requested,
                            %received,
                            attempt,
                            "Discarding resent record with wrong sequence"
                        );
                    }
                },
                Ok(None) => {
                    metrics::record_backfill(BackfillResult::Absent);
                    tracing::warn!(sequence = %gap, attempt, "Backfill returned no record");
                }
                Err(e) => {
                    metrics::record_backfill(BackfillResult::Fault);
                    tracing::warn!(sequence = %gap, attempt, error = %e, "Backfill failed");
                }
            }

            match policy.next_delay() {
                Some(delay) => {
                    tracing::debug!(
                        sequence = %gap,
                        delay_ms = delay.as_millis(),
                        "Retrying backfill"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return false,
            }
        }
    }
}

fn gaps_display(gaps: &[Sequence]) -> Vec<u8> {
    gaps.iter().map(|s| s.as_u8()).collect()
}

// =============================================================================
// Tests
// =============================================================================
