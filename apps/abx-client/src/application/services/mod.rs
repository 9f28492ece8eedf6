//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `ReconciliationService`: Bulk stream, gap analysis and backfill
//! - `BackfillRetryPolicy`: Bounded backoff between resend attempts

mod backfill_retry;
mod reconciliation;

pub use backfill_retry::{BackfillRetryConfig, BackfillRetryPolicy};
pub use reconciliation::{
    ReconciliationReport, ReconciliationService, RequestError, parse_sequence_input,
};
