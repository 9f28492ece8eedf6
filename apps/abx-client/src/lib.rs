#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! ABX Client - Order Stream Retrieval and Reconciliation
//!
//! A client for the ABX exchange server's binary order protocol. It streams
//! fixed-width order records over short-lived TCP connections, detects gaps
//! in the server-assigned sequence, and backfills each missing record with a
//! single-record resend request until a complete, sequence-ordered set is
//! assembled.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Record types and reconciliation state
//!   - `order`: Validated order records and sequence numbers
//!   - `reconciliation`: Watermark, gap analysis and phase tracking
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: The `PacketSource` transport contract
//!   - `services`: Reconciliation and backfill retry policy
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `abx`: Wire codec and TCP transport session
//!   - `config`: Environment-driven configuration
//!   - `metrics`: Prometheus instrumentation
//!   - `telemetry`: Tracing subscriber and OTLP export
//!
//! # Data Flow
//!
//! ```text
//!                 [0x01,0x00]     ┌──────────────┐
//! ABX server ◄────────────────────│              │
//!            ────17-byte frames──►│  Transport   │──► records ──┐
//!                                 │   Session    │              ▼
//!                 [0x02,seq]      │              │     ┌─────────────────┐
//! ABX server ◄────────────────────│              │◄────│ Reconciliation  │
//!            ────0 or 1 frame────►│              │────►│  (gap backfill) │──► sorted records
//!                                 └──────────────┘     └─────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Order records and reconciliation state.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::order::{OrderRecord, RecordError, Sequence, Side, Symbol};
pub use domain::reconciliation::{ReconciliationPhase, RetrievalSession};

// Ports
pub use application::ports::{PacketSource, StreamFetch, TransportError};

// Services
pub use application::services::{
    BackfillRetryConfig, BackfillRetryPolicy, ReconciliationReport, ReconciliationService,
    RequestError, parse_sequence_input,
};

// Transport (for integration tests)
pub use infrastructure::abx::{AbxCodec, AbxTransport, RECORD_LEN};

// Infrastructure config
pub use infrastructure::config::{
    ClientConfig, ConfigError, OutputFormat, ServerEndpoint, TransportSettings,
};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{
    TelemetryConfig, TelemetryError, TelemetryGuard, init as init_telemetry,
};
