//! Prometheus Metrics Module
//!
//! Exposes client metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Records**: Records decoded and decode failures by reason
//! - **Connections**: Connection faults by operation
//! - **Reconciliation**: Gaps detected, backfill outcomes, run duration
//!
//! # Integration
//!
//! When `ABX_METRICS_PORT` is non-zero the exporter serves `/metrics` on that
//! port for the lifetime of the process. Without an installed recorder every
//! recording call is a no-op.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// =============================================================================
// Recorder Installation
// =============================================================================

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the Prometheus recorder with an HTTP listener on `port`.
///
/// Does nothing when `port` is 0 or a recorder is already installed.
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the exporter cannot bind or install its recorder.
pub fn init_metrics(port: u16) -> Result<(), BuildError> {
    if port == 0 || INSTALLED.get().is_some() {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        .install()?;

    register_metrics();
    let _ = INSTALLED.set(());
    Ok(())
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "abx_client_records_decoded_total",
        "Total order records decoded by request kind"
    );
    describe_counter!(
        "abx_client_decode_failures_total",
        "Total 17-byte frames dropped by validation reason"
    );
    describe_counter!(
        "abx_client_connection_faults_total",
        "Total connection-level faults by request kind and error kind"
    );
    describe_counter!(
        "abx_client_gaps_detected_total",
        "Total missing sequences found below the watermark"
    );
    describe_counter!(
        "abx_client_backfill_total",
        "Total backfill attempts by outcome"
    );
    describe_histogram!(
        "abx_client_reconciliation_seconds",
        "Wall time of a full stream-and-backfill run"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for a backfill request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillResult {
    /// Record received and stored.
    Recovered,
    /// Server delivered no complete, valid record.
    Absent,
    /// Connection-level fault.
    Fault,
    /// Server answered with a different sequence.
    Mismatch,
}

impl BackfillResult {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Recovered => "recovered",
            Self::Absent => "absent",
            Self::Fault => "fault",
            Self::Mismatch => "mismatch",
        }
    }
}

/// Record a successfully decoded record.
pub fn record_decoded(request: &'static str) {
    counter!("abx_client_records_decoded_total", "request" => request).increment(1);
}

/// Record a frame dropped by field validation.
pub fn record_decode_failure(reason: &'static str) {
    counter!("abx_client_decode_failures_total", "reason" => reason).increment(1);
}

/// Record a connection-level fault.
pub fn record_connection_fault(request: &'static str, kind: &'static str) {
    counter!(
        "abx_client_connection_faults_total",
        "request" => request,
        "kind" => kind
    )
    .increment(1);
}

/// Record gaps found by gap analysis.
pub fn record_gaps(count: usize) {
    counter!("abx_client_gaps_detected_total").increment(count as u64);
}

/// Record one backfill attempt.
pub fn record_backfill(result: BackfillResult) {
    counter!("abx_client_backfill_total", "outcome" => result.as_str()).increment(1);
}

/// Record the duration of a reconciliation run.
pub fn record_reconciliation_duration(duration: Duration) {
    histogram!("abx_client_reconciliation_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
