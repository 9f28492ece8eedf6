//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `PacketSource`: one-request-per-connection access to the exchange
//!   server's order stream

use std::io;

use async_trait::async_trait;

use crate::domain::order::{OrderRecord, Sequence};

/// Connection-level fault while talking to the exchange server.
///
/// Short reads, stalls and malformed records are not faults; they surface as
/// end-of-stream or "not found".
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// TCP connect failed (refused, unreachable, DNS).
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// `host:port` that was dialed.
        endpoint: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// TCP connect did not complete in time.
    #[error("connection to {endpoint} timed out after {timeout_ms}ms")]
    ConnectTimeout {
        /// `host:port` that was dialed.
        endpoint: String,
        /// Configured connect timeout.
        timeout_ms: u128,
    },

    /// I/O error on an established connection (reset, broken pipe).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Short label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::Io(_) => "io",
        }
    }
}

/// Outcome of a bulk stream fetch.
///
/// A connection fault does not discard what was read before it happened.
#[derive(Debug, Default)]
pub struct StreamFetch {
    /// Records decoded in arrival order.
    pub records: Vec<OrderRecord>,
    /// Fault that ended the stream early, if any.
    pub fault: Option<TransportError>,
}

impl StreamFetch {
    /// A fetch that ended cleanly.
    #[must_use]
    pub const fn complete(records: Vec<OrderRecord>) -> Self {
        Self {
            records,
            fault: None,
        }
    }

    /// A fetch cut short by a connection fault.
    #[must_use]
    pub const fn interrupted(records: Vec<OrderRecord>, fault: TransportError) -> Self {
        Self {
            records,
            fault: Some(fault),
        }
    }
}

/// Source of order records, one request per connection.
///
/// Implementations open a fresh connection for every call and release it
/// before returning.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PacketSource: Send + Sync {
    /// Request the full stream and read records until it ends.
    async fn fetch_stream(&self) -> StreamFetch;

    /// Request a single record by sequence.
    ///
    /// `Ok(None)` means the server did not deliver a complete, valid record.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on connection-level faults.
    async fn fetch_one(&self, sequence: Sequence) -> Result<Option<OrderRecord>, TransportError>;
}
