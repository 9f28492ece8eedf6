//! Transport Session
//!
//! One short-lived TCP connection per request. The session writes a single
//! two-byte request and reads fixed-width records until the server ends the
//! stream, a read stalls, or the connection faults.
//!
//! # Read Discipline
//!
//! Partial reads are accumulated until a full 17-byte frame is assembled.
//! A close or stall part-way through a frame ends the stream; the partial
//! bytes are discarded and never decoded.
//!
//! # Fault Classification
//!
//! | Condition | Bulk stream | Single record |
//! |-----------|-------------|---------------|
//! | Clean close / short final read | end of stream | not found |
//! | Read stall past `read_timeout` | end of stream | not found |
//! | Malformed frame | skipped | not found |
//! | Connect failure / I/O error | fault, records kept | `Err` |

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::codec::{AbxCodec, RECORD_LEN, RecordFrame, Request, RequestKind};
use crate::application::ports::{PacketSource, StreamFetch, TransportError};
use crate::domain::order::{OrderRecord, Sequence};
use crate::infrastructure::config::{ServerEndpoint, TransportSettings};
use crate::infrastructure::metrics;

// =============================================================================
// Frame Reader
// =============================================================================

/// Result of reading one frame from the connection.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete 17-byte frame.
    Frame(RecordFrame),
    /// The peer closed its send side.
    Closed {
        /// Bytes of the unfinished frame, if any.
        received: usize,
    },
    /// No bytes arrived within the read timeout.
    Stalled {
        /// Bytes of the unfinished frame, if any.
        received: usize,
    },
}

/// Read exactly one frame, accumulating partial reads.
///
/// # Errors
///
/// Returns [`TransportError::Io`] if the underlying read fails.
pub async fn read_frame<R>(
    reader: &mut R,
    read_timeout: Duration,
) -> Result<ReadOutcome, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut frame = [0u8; RECORD_LEN];
    let mut filled = 0;

    while filled < RECORD_LEN {
        match timeout(read_timeout, reader.read(&mut frame[filled..])).await {
            Err(_) => return Ok(ReadOutcome::Stalled { received: filled }),
            Ok(Ok(0)) => return Ok(ReadOutcome::Closed { received: filled }),
            Ok(Ok(n)) => filled += n,
            Ok(Err(e)) => return Err(TransportError::Io(e)),
        }
    }

    Ok(ReadOutcome::Frame(frame))
}

/// Read and decode frames until the stream ends.
///
/// Malformed frames are skipped; reading resumes at the next frame boundary.
pub async fn collect_records<R>(
    reader: &mut R,
    codec: &AbxCodec,
    read_timeout: Duration,
) -> StreamFetch
where
    R: AsyncRead + Unpin,
{
    let mut records = Vec::new();

    loop {
        match read_frame(reader, read_timeout).await {
            Ok(ReadOutcome::Frame(frame)) => match codec.decode(&frame) {
                Ok(record) => {
                    metrics::record_decoded(RequestKind::StreamAll.as_str());
                    records.push(record);
                }
                Err(e) => {
                    metrics::record_decode_failure(e.reason());
                    tracing::warn!(
                        error = %e,
                        position = records.len(),
                        "Skipping malformed record"
                    );
                }
            },
            Ok(ReadOutcome::Closed { received }) => {
                if received > 0 {
                    tracing::debug!(received, "Discarding truncated trailing frame");
                }
                return StreamFetch::complete(records);
            }
            Ok(ReadOutcome::Stalled { received }) => {
                tracing::debug!(
                    received,
                    timeout_ms = read_timeout.as_millis(),
                    "Read stalled, treating as end of stream"
                );
                return StreamFetch::complete(records);
            }
            Err(e) => return StreamFetch::interrupted(records, e),
        }
    }
}

/// Read the single frame answering a resend request.
///
/// # Errors
///
/// Returns [`TransportError::Io`] if the underlying read fails.
pub async fn read_single<R>(
    reader: &mut R,
    codec: &AbxCodec,
    read_timeout: Duration,
    requested: Sequence,
) -> Result<Option<OrderRecord>, TransportError>
where
    R: AsyncRead + Unpin,
{
    match read_frame(reader, read_timeout).await? {
        ReadOutcome::Frame(frame) => match codec.decode(&frame) {
            Ok(record) => {
                metrics::record_decoded(RequestKind::Resend.as_str());
                Ok(Some(record))
            }
            Err(e) => {
                metrics::record_decode_failure(e.reason());
                tracing::warn!(sequence = %requested, error = %e, "Resent record is malformed");
                Ok(None)
            }
        },
        ReadOutcome::Closed { received } | ReadOutcome::Stalled { received } => {
            tracing::debug!(sequence = %requested, received, "No complete record received");
            Ok(None)
        }
    }
}

// =============================================================================
// TCP Transport
// =============================================================================

/// TCP adapter for the ABX exchange server.
///
/// Holds only configuration; every call dials a fresh connection that is
/// dropped before the call returns.
#[derive(Debug, Clone)]
pub struct AbxTransport {
    endpoint: ServerEndpoint,
    settings: TransportSettings,
    codec: AbxCodec,
}

impl AbxTransport {
    /// Create a transport for the given server.
    #[must_use]
    pub const fn new(endpoint: ServerEndpoint, settings: TransportSettings) -> Self {
        Self {
            endpoint,
            settings,
            codec: AbxCodec::new(),
        }
    }

    /// Connect with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] or [`TransportError::ConnectTimeout`].
    pub async fn connect(&self) -> Result<TcpStream, TransportError> {
        let dial = TcpStream::connect((self.endpoint.host.as_str(), self.endpoint.port));

        let stream = timeout(self.settings.connect_timeout, dial)
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                endpoint: self.endpoint.to_string(),
                timeout_ms: self.settings.connect_timeout.as_millis(),
            })?
            .map_err(|source| TransportError::Connect {
                endpoint: self.endpoint.to_string(),
                source,
            })?;

        stream.set_nodelay(true)?;
        Ok(stream)
    }

    async fn open(&self, kind: RequestKind, request: Request) -> Result<TcpStream, TransportError> {
        let mut stream = self.connect().await?;
        stream.write_all(&request).await?;
        tracing::debug!(
            endpoint = %self.endpoint,
            request = kind.as_str(),
            "Request sent"
        );
        Ok(stream)
    }

    fn report_fault(&self, kind: RequestKind, error: &TransportError) {
        metrics::record_connection_fault(kind.as_str(), error.kind());
        tracing::warn!(
            endpoint = %self.endpoint,
            request = kind.as_str(),
            error = %error,
            "Connection fault"
        );
    }
}

#[async_trait]
impl PacketSource for AbxTransport {
    async fn fetch_stream(&self) -> StreamFetch {
        let kind = RequestKind::StreamAll;
        let fetch = match self.open(kind, self.codec.encode_stream_all()).await {
            Ok(mut stream) => {
                collect_records(&mut stream, &self.codec, self.settings.read_timeout).await
            }
            Err(e) => StreamFetch::interrupted(Vec::new(), e),
        };

        if let Some(fault) = &fetch.fault {
            self.report_fault(kind, fault);
        }
        tracing::debug!(records = fetch.records.len(), "Bulk stream ended");
        fetch
    }

    async fn fetch_one(&self, sequence: Sequence) -> Result<Option<OrderRecord>, TransportError> {
        let kind = RequestKind::Resend;
        let result = match self.open(kind, self.codec.encode_resend(sequence)).await {
            Ok(mut stream) => {
                read_single(
                    &mut stream,
                    &self.codec,
                    self.settings.read_timeout,
                    sequence,
                )
                .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            self.report_fault(kind, e);
        }
        result
    }
}

// =============================================================================
// Tests
// =============================================================================
