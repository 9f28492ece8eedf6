//! ABX Exchange Adapters
//!
//! Implements the client side of the ABX order protocol:
//!
//! - **Codec**: Two-byte requests and 17-byte big-endian order records
//! - **Session**: One TCP connection per request, framing and stall handling

pub mod codec;
pub mod session;

pub use codec::{AbxCodec, RECORD_LEN, REQUEST_LEN, RecordFrame, Request, RequestKind};
pub use session::{AbxTransport, ReadOutcome, collect_records, read_frame, read_single};
