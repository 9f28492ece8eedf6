//! Wire Codec
//!
//! Encoding of the two outbound request messages and decoding of the
//! fixed-width inbound order record.
//!
//! # Request Format
//!
//! Every request is exactly two bytes: a request-kind tag and a one-byte
//! argument.
//!
//! | Request | Bytes |
//! |---------|-------|
//! | Stream all | `[0x01, 0x00]` |
//! | Resend | `[0x02, seq]` |
//!
//! # Record Format
//!
//! 17 bytes, big-endian, no padding:
//!
//! | Offset | Length | Field |
//! |--------|--------|-------|
//! | 0 | 4 | symbol (ASCII) |
//! | 4 | 1 | side marker (`B`/`S`) |
//! | 5 | 4 | quantity (i32) |
//! | 9 | 4 | price (i32) |
//! | 13 | 4 | sequence (i32) |

use crate::domain::order::{OrderRecord, RecordError, Sequence, Side, Symbol};

/// Size of one encoded order record.
pub const RECORD_LEN: usize = 17;

/// Size of every request message.
pub const REQUEST_LEN: usize = 2;

/// One encoded request message.
pub type Request = [u8; REQUEST_LEN];

/// One encoded order record.
pub type RecordFrame = [u8; RECORD_LEN];

/// Request kinds understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestKind {
    /// Stream every available record, then close.
    StreamAll = 1,
    /// Send back a single record by sequence.
    Resend = 2,
}

impl RequestKind {
    /// Tag byte for this request kind.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StreamAll => "stream_all",
            Self::Resend => "resend",
        }
    }
}

/// Codec for the ABX order protocol.
///
/// Holds no state; decoding never performs I/O and never panics.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbxCodec;

impl AbxCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode the "stream all packets" request.
    #[must_use]
    pub const fn encode_stream_all(&self) -> Request {
        [RequestKind::StreamAll.tag(), 0]
    }

    /// Encode a "resend packet" request.
    ///
    /// The range check lives in [`Sequence`]; the sequence is written as-is.
    #[must_use]
    pub const fn encode_resend(&self, sequence: Sequence) -> Request {
        [RequestKind::Resend.tag(), sequence.as_u8()]
    }

    /// Decode one record frame, applying every field constraint.
    ///
    /// # Errors
    ///
    /// Returns the first [`RecordError`] in wire order (symbol, side,
    /// quantity, price, sequence).
    pub fn decode(&self, frame: &RecordFrame) -> Result<OrderRecord, RecordError> {
        let symbol = Symbol::from_bytes([frame[0], frame[1], frame[2], frame[3]])?;
        let side = Side::from_marker(frame[4])?;
        let quantity = read_i32_be(frame, 5);
        let price = read_i32_be(frame, 9);
        let sequence = read_i32_be(frame, 13);

        OrderRecord::new(symbol, side, quantity, price, sequence)
    }
}

fn read_i32_be(frame: &RecordFrame, offset: usize) -> i32 {
    i32::from_be_bytes([
        frame[offset],
        frame[offset + 1],
        frame[offset + 2],
        frame[offset + 3],
    ])
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn frame(symbol: &[u8; 4], side: u8, quantity: i32, price: i32, sequence: i32) -> RecordFrame {
        let mut out = [0u8; RECORD_LEN];
        out[0..4].copy_from_slice(symbol);
        out[4] = side;
        out[5..9].copy_from_slice(&quantity.to_be_bytes());
        out[9..13].copy_from_slice(&price.to_be_bytes());
        out[13..17].copy_from_slice(&sequence.to_be_bytes());
        out
    }

    #[test]
    fn stream_all_request_bytes() {
        assert_eq!(AbxCodec::new().encode_stream_all(), [0x01, 0x00]);
    }

    #[test]
    fn resend_request_bytes() {
        let codec = AbxCodec::new();
        assert_eq!(codec.encode_resend(Sequence::MIN), [0x02, 0x01]);
        assert_eq!(codec.encode_resend(Sequence::new(17).unwrap()), [0x02, 17]);
        assert_eq!(codec.encode_resend(Sequence::MAX), [0x02, 0xFF]);
    }

    #[test]
    fn decode_valid_record() {
        let record = AbxCodec::new()
            .decode(&frame(b"MSFT", b'B', 50, 101_250, 3))
            .unwrap();
        assert_eq!(record.symbol().as_str(), "MSFT");
        assert_eq!(record.side(), Side::Buy);
        assert_eq!(record.quantity(), 50);
        assert_eq!(record.price(), 101_250);
        assert_eq!(record.sequence().as_u8(), 3);
    }

    #[test]
    fn decode_reads_big_endian() {
        let mut raw = frame(b"AMZN", b'S', 0, 0, 0);
        raw[5..9].copy_from_slice(&[0x00, 0x00, 0x01, 0x00]);
        raw[9..13].copy_from_slice(&[0x00, 0x01, 0x00, 0x00]);
        raw[13..17].copy_from_slice(&[0x00, 0x00, 0x00, 0xFF]);
        let record = AbxCodec::new().decode(&raw).unwrap();
        assert_eq!(record.quantity(), 256);
        assert_eq!(record.price(), 65_536);
        assert_eq!(record.sequence(), Sequence::MAX);
    }

    #[test_case(frame(b"MS1T", b'B', 1, 1, 1), RecordError::InvalidSymbol(*b"MS1T") ; "digit in symbol")]
    #[test_case(frame(b"MS T", b'B', 1, 1, 1), RecordError::InvalidSymbol(*b"MS T") ; "space in symbol")]
    #[test_case(frame(b"\0\0\0\0", b'B', 1, 1, 1), RecordError::InvalidSymbol([0; 4]) ; "nul padding")]
    #[test_case(frame(b"MSFT", b'X', 1, 1, 1), RecordError::InvalidSide(b'X') ; "unknown side")]
    #[test_case(frame(b"MSFT", b'b', 1, 1, 1), RecordError::InvalidSide(b'b') ; "lowercase side")]
    #[test_case(frame(b"MSFT", b'S', 0, 1, 1), RecordError::NonPositiveQuantity(0) ; "zero quantity")]
    #[test_case(frame(b"MSFT", b'S', -4, 1, 1), RecordError::NonPositiveQuantity(-4) ; "negative quantity")]
    #[test_case(frame(b"MSFT", b'S', 1, 0, 1), RecordError::NonPositivePrice(0) ; "zero price")]
    #[test_case(frame(b"MSFT", b'S', 1, i32::MIN, 1), RecordError::NonPositivePrice(i32::MIN) ; "negative price")]
    #[test_case(frame(b"MSFT", b'S', 1, 1, 0), RecordError::SequenceOutOfRange(0) ; "zero sequence")]
    #[test_case(frame(b"MSFT", b'S', 1, 1, 256), RecordError::SequenceOutOfRange(256) ; "sequence above byte range")]
    #[test_case(frame(b"MSFT", b'S', 1, 1, -1), RecordError::SequenceOutOfRange(-1) ; "negative sequence")]
    fn decode_rejects_invalid_fields(raw: RecordFrame, expected: RecordError) {
        assert_eq!(AbxCodec::new().decode(&raw), Err(expected));
    }

    proptest! {
        #[test]
        fn decode_is_total_over_valid_frames(
            symbol in "[A-Za-z]{4}",
            buy in any::<bool>(),
            quantity in 1..=i32::MAX,
            price in 1..=i32::MAX,
            sequence in 1..=255i32,
        ) {
            let mut sym = [0u8; 4];
            sym.copy_from_slice(symbol.as_bytes());
            let side = if buy { b'B' } else { b'S' };
            let raw = frame(&sym, side, quantity, price, sequence);

            let first = AbxCodec::new().decode(&raw).unwrap();
            let second = AbxCodec::new().decode(&raw).unwrap();
            prop_assert_eq!(&first, &second);
            let decoded_symbol = first.symbol();
            prop_assert_eq!(decoded_symbol.as_str(), symbol.as_str());
            prop_assert_eq!(i64::from(first.quantity()), i64::from(quantity));
            prop_assert_eq!(i64::from(first.price()), i64::from(price));
            prop_assert_eq!(i32::from(first.sequence().as_u8()), sequence);
        }

        #[test]
        fn decode_never_yields_invalid_record(raw in proptest::array::uniform17(any::<u8>())) {
            if let Ok(record) = AbxCodec::new().decode(&raw) {
                prop_assert!(record.symbol().as_str().bytes().all(|b| b.is_ascii_alphabetic()));
                prop_assert!(record.quantity() > 0);
                prop_assert!(record.price() > 0);
                prop_assert!(matches!(record.side(), Side::Buy | Side::Sell));
            }
        }
    }
}
