//! In-process ABX exchange server for integration tests.
//!
//! Speaks the two-byte request protocol over a real `TcpListener` and
//! serves scripted replies, recording every request it receives.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use abx_client::{ServerEndpoint, TransportSettings};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Read timeout used by clients in these tests.
pub const TEST_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// How long a hanging server keeps the connection open.
const HANG: Duration = Duration::from_secs(3);

/// Encode one 17-byte record.
pub fn frame(symbol: &[u8; 4], side: u8, quantity: i32, price: i32, sequence: i32) -> Vec<u8> {
    let mut out = Vec::with_capacity(17);
    out.extend_from_slice(symbol);
    out.push(side);
    out.extend_from_slice(&quantity.to_be_bytes());
    out.extend_from_slice(&price.to_be_bytes());
    out.extend_from_slice(&sequence.to_be_bytes());
    out
}

/// A valid record for `sequence`.
pub fn record(sequence: i32) -> Vec<u8> {
    frame(b"MSFT", b'B', 50, 100 + sequence, sequence)
}

/// How the server ends a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// Close the connection after the payload.
    Close,
    /// Keep the connection open without sending anything further.
    Hang,
}

/// Scripted reply for one request.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Bytes written in one chunk each.
    pub chunks: Vec<Vec<u8>>,
    /// What happens after the last chunk.
    pub ending: Ending,
}

impl Reply {
    /// Write `chunks` then close.
    pub fn closing(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            ending: Ending::Close,
        }
    }

    /// Write `chunks` then hang.
    pub fn hanging(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            ending: Ending::Hang,
        }
    }

    /// Close without writing anything.
    pub fn empty() -> Self {
        Self::closing(Vec::new())
    }
}

/// Replies keyed by request.
#[derive(Debug, Clone)]
pub struct Script {
    /// Reply to `[0x01, 0x00]`.
    pub stream_all: Reply,
    /// Replies to `[0x02, seq]`; unknown sequences close immediately.
    pub resend: HashMap<u8, Reply>,
}

impl Script {
    /// Stream the given sequences, answering resends for `backfill`.
    pub fn with_sequences(streamed: &[i32], backfill: &[i32]) -> Self {
        Self {
            stream_all: Reply::closing(streamed.iter().map(|&s| record(s)).collect()),
            resend: backfill
                .iter()
                .map(|&s| (u8::try_from(s).unwrap(), Reply::closing(vec![record(s)])))
                .collect(),
        }
    }
}

/// Running fake server.
pub struct FakeExchange {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<[u8; 2]>>>,
    connections: Arc<Mutex<usize>>,
    handle: JoinHandle<()>,
}

impl FakeExchange {
    /// Bind to an ephemeral port and start serving `script`.
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(Mutex::new(0));
        let script = Arc::new(script);

        let handle = {
            let requests = Arc::clone(&requests);
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                loop {
                    let Ok((socket, _)) = listener.accept().await else {
                        return;
                    };
                    *connections.lock().unwrap() += 1;
                    let script = Arc::clone(&script);
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        serve(socket, &script, &requests).await;
                    });
                }
            })
        };

        Self {
            addr,
            requests,
            connections,
            handle,
        }
    }

    /// Endpoint for clients.
    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::new(self.addr.ip().to_string(), self.addr.port())
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<[u8; 2]> {
        self.requests.lock().unwrap().clone()
    }

    /// Sequences requested via resend, in arrival order.
    pub fn resend_requests(&self) -> Vec<u8> {
        self.requests()
            .iter()
            .filter(|r| r[0] == 0x02)
            .map(|r| r[1])
            .collect()
    }

    /// Number of accepted connections.
    pub fn connections(&self) -> usize {
        *self.connections.lock().unwrap()
    }
}

impl Drop for FakeExchange {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut socket: TcpStream, script: &Script, requests: &Mutex<Vec<[u8; 2]>>) {
    let mut request = [0u8; 2];
    if socket.read_exact(&mut request).await.is_err() {
        return;
    }
    requests.lock().unwrap().push(request);

    let reply = match request {
        [0x01, _] => script.stream_all.clone(),
        [0x02, seq] => script.resend.get(&seq).cloned().unwrap_or_else(Reply::empty),
        _ => Reply::empty(),
    };

    for chunk in &reply.chunks {
        if socket.write_all(chunk).await.is_err() {
            return;
        }
        let _ = socket.flush().await;
    }

    if reply.ending == Ending::Hang {
        tokio::time::sleep(HANG).await;
    }
}

/// Transport settings with short timeouts.
pub fn test_settings() -> TransportSettings {
    TransportSettings {
        connect_timeout: Duration::from_secs(2),
        read_timeout: TEST_READ_TIMEOUT,
    }
}

/// An endpoint nothing is listening on.
pub async fn closed_endpoint() -> ServerEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    ServerEndpoint::new("127.0.0.1", port)
}
