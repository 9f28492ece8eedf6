//! Retrieval Session State
//!
//! Transient bookkeeping for one "stream all" operation: which records were
//! observed, which sequences arrived during the bulk stream, and the high
//! watermark that defines the completeness range `[1, watermark]`.
//!
//! # Lifecycle
//!
//! ```text
//! Streaming ──► GapAnalysis ──► Backfilling ──► Done
//! ```
//!
//! The watermark is frozen when the bulk stream phase ends. Backfilled records
//! are stored but never move the watermark, so the gap set computed at
//! `GapAnalysis` is the full list of sequences that will be re-requested.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::domain::order::{OrderRecord, Sequence};

// =============================================================================
// Phase
// =============================================================================

/// Phase of a single reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconciliationPhase {
    /// Consuming the bulk stream.
    Streaming,
    /// Computing the missing set against the watermark.
    GapAnalysis,
    /// Re-requesting missing sequences one at a time.
    Backfilling,
    /// Result published to the caller.
    Done,
}

impl ReconciliationPhase {
    /// Phase name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::GapAnalysis => "gap_analysis",
            Self::Backfilling => "backfilling",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ReconciliationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Backfill Outcome
// =============================================================================

/// Result of storing a backfilled record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// Record stored under the requested sequence.
    Filled,
    /// Server answered with a different sequence; the record was discarded.
    SequenceMismatch {
        /// Sequence that was requested.
        requested: Sequence,
        /// Sequence carried by the response.
        received: Sequence,
    },
}

// =============================================================================
// Retrieval Session
// =============================================================================

/// Mutable state of one reconciliation run.
#[derive(Debug)]
pub struct RetrievalSession {
    observed: BTreeMap<Sequence, OrderRecord>,
    seen: BTreeSet<Sequence>,
    high_watermark: Option<Sequence>,
    phase: ReconciliationPhase,
}

impl Default for RetrievalSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RetrievalSession {
    /// Start a new session in the `Streaming` phase.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            observed: BTreeMap::new(),
            seen: BTreeSet::new(),
            high_watermark: None,
            phase: ReconciliationPhase::Streaming,
        }
    }

    /// Record a record decoded from the bulk stream.
    ///
    /// A repeated sequence replaces the earlier record.
    pub fn observe_streamed(&mut self, record: OrderRecord) {
        debug_assert_eq!(self.phase, ReconciliationPhase::Streaming);
        let sequence = record.sequence();
        self.seen.insert(sequence);
        self.high_watermark = Some(self.high_watermark.map_or(sequence, |hw| hw.max(sequence)));
        self.observed.insert(sequence, record);
    }

    /// Freeze the watermark and compute the missing sequences in ascending order.
    ///
    /// Returns an empty list when nothing was streamed.
    pub fn analyze_gaps(&mut self) -> Vec<Sequence> {
        self.phase = ReconciliationPhase::GapAnalysis;
        self.high_watermark
            .map(|hw| hw.up_to().filter(|seq| !self.seen.contains(seq)).collect())
            .unwrap_or_default()
    }

    /// Enter the `Backfilling` phase.
    pub fn begin_backfill(&mut self) {
        self.phase = ReconciliationPhase::Backfilling;
    }

    /// Store a record returned for a resend request.
    ///
    /// The record is kept only when it carries the requested sequence.
    pub fn fill(&mut self, requested: Sequence, record: OrderRecord) -> BackfillOutcome {
        let received = record.sequence();
        if received != requested {
            return BackfillOutcome::SequenceMismatch {
                requested,
                received,
            };
        }
        self.observed.insert(requested, record);
        BackfillOutcome::Filled
    }

    /// Highest sequence seen during the bulk stream.
    #[must_use]
    pub const fn high_watermark(&self) -> Option<Sequence> {
        self.high_watermark
    }

    /// Number of distinct sequences decoded from the bulk stream.
    #[must_use]
    pub fn streamed_count(&self) -> usize {
        self.seen.len()
    }

    #[cfg(test)]
    fn contains(&self, sequence: Sequence) -> bool {
        self.observed.contains_key(&sequence)
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ReconciliationPhase {
        self.phase
    }

    /// Move to `Done` and hand back the records sorted by sequence.
    #[must_use]
    pub fn finish(&mut self) -> Vec<OrderRecord> {
        self.phase = ReconciliationPhase::Done;
        std::mem::take(&mut self.observed).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Side, Symbol};

    fn record(seq: i32) -> OrderRecord {
        OrderRecord::new(
            Symbol::try_from("MSFT").unwrap(),
            Side::Buy,
            100,
            250,
            seq,
        )
        .unwrap()
    }

    fn seq(value: i64) -> Sequence {
        Sequence::new(value).unwrap()
    }

    #[test]
    fn empty_session_has_no_gaps() {
        let mut session = RetrievalSession::new();
        assert_eq!(session.high_watermark(), None);
        assert!(session.analyze_gaps().is_empty());
        assert!(session.finish().is_empty());
    }

    #[test]
    fn watermark_tracks_maximum_regardless_of_order() {
        let mut session = RetrievalSession::new();
        for s in [3, 9, 1, 4] {
            session.observe_streamed(record(s));
        }
        assert_eq!(session.high_watermark(), Some(seq(9)));
        assert_eq!(session.streamed_count(), 4);
    }

    #[test]
    fn gaps_are_missing_sequences_up_to_watermark() {
        let mut session = RetrievalSession::new();
        for s in [1, 2, 4, 5] {
            session.observe_streamed(record(s));
        }
        assert_eq!(session.analyze_gaps(), vec![seq(3)]);
        assert_eq!(session.phase(), ReconciliationPhase::GapAnalysis);
    }

    #[test]
    fn leading_gaps_are_included() {
        let mut session = RetrievalSession::new();
        session.observe_streamed(record(4));
        assert_eq!(session.analyze_gaps(), vec![seq(1), seq(2), seq(3)]);
    }

    #[test]
    fn duplicate_stream_sequence_keeps_latest_record() {
        let mut session = RetrievalSession::new();
        session.observe_streamed(record(1));
        let replacement = OrderRecord::new(
            Symbol::try_from("AAPL").unwrap(),
            Side::Sell,
            7,
            70,
            1,
        )
        .unwrap();
        session.observe_streamed(replacement.clone());
        assert_eq!(session.streamed_count(), 1);
        assert_eq!(session.finish(), vec![replacement]);
    }

    #[test]
    fn fill_inserts_and_finish_sorts() {
        let mut session = RetrievalSession::new();
        for s in [5, 1, 2, 4] {
            session.observe_streamed(record(s));
        }
        let gaps = session.analyze_gaps();
        session.begin_backfill();
        for gap in gaps {
            assert_eq!(
                session.fill(gap, record(i32::from(gap.as_u8()))),
                BackfillOutcome::Filled
            );
        }
        let sequences: Vec<u8> = session
            .finish()
            .iter()
            .map(|r| r.sequence().as_u8())
            .collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn fill_rejects_mismatched_sequence_and_keeps_watermark() {
        let mut session = RetrievalSession::new();
        session.observe_streamed(record(1));
        session.observe_streamed(record(3));
        session.analyze_gaps();
        session.begin_backfill();

        let outcome = session.fill(seq(2), record(200));
        assert_eq!(
            outcome,
            BackfillOutcome::SequenceMismatch {
                requested: seq(2),
                received: seq(200),
            }
        );
        assert!(!session.contains(seq(2)));
        assert!(!session.contains(seq(200)));
        assert_eq!(session.high_watermark(), Some(seq(3)));
    }

    #[test]
    fn phases_advance_through_backfill_to_done() {
        let mut session = RetrievalSession::new();
        assert_eq!(session.phase(), ReconciliationPhase::Streaming);

        session.observe_streamed(record(2));
        session.analyze_gaps();
        assert_eq!(session.phase(), ReconciliationPhase::GapAnalysis);

        session.begin_backfill();
        assert_eq!(session.phase(), ReconciliationPhase::Backfilling);

        assert_eq!(session.fill(seq(1), record(1)), BackfillOutcome::Filled);
        assert_eq!(session.phase(), ReconciliationPhase::Backfilling);
        assert!(session.contains(seq(1)));

        let records = session.finish();
        assert_eq!(session.phase(), ReconciliationPhase::Done);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn phase_names() {
        assert_eq!(ReconciliationPhase::Streaming.as_str(), "streaming");
        assert_eq!(ReconciliationPhase::Done.to_string(), "done");
    }
}
