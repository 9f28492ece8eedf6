//! Order Record Types
//!
//! Domain types for a single order snapshot as published by the ABX
//! exchange server. Every field is validated on construction, so a value
//! of [`OrderRecord`] can never carry a malformed symbol, side, quantity,
//! price or sequence number.
//!
//! # Field Constraints
//!
//! | Field | Constraint |
//! |-------|------------|
//! | symbol | exactly 4 ASCII letters |
//! | side | `B` (buy) or `S` (sell) |
//! | quantity | strictly positive |
//! | price | strictly positive, server's native unit |
//! | sequence | `1..=255` (one protocol byte) |

use std::fmt;
use std::num::NonZeroU8;

use serde::{Serialize, Serializer};

// =============================================================================
// Errors
// =============================================================================

/// Field-level validation failure for an order record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Symbol is not exactly four ASCII letters.
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol([u8; 4]),

    /// Side marker is neither `B` nor `S`.
    #[error("invalid buy/sell indicator: {0:#04x}")]
    InvalidSide(u8),

    /// Quantity is zero or negative.
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i32),

    /// Price is zero or negative.
    #[error("price must be positive, got {0}")]
    NonPositivePrice(i32),

    /// Sequence is outside the one-byte protocol range.
    #[error("sequence {0} outside protocol range 1..=255")]
    SequenceOutOfRange(i64),
}

impl RecordError {
    /// Short label for metrics and logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidSymbol(_) => "invalid_symbol",
            Self::InvalidSide(_) => "invalid_side",
            Self::NonPositiveQuantity(_) => "non_positive_quantity",
            Self::NonPositivePrice(_) => "non_positive_price",
            Self::SequenceOutOfRange(_) => "sequence_out_of_range",
        }
    }
}

// =============================================================================
// Sequence
// =============================================================================

/// Server-assigned sequence number, the ordering and completeness key.
///
/// The protocol carries resend requests in a single byte, so the valid
/// range is `1..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sequence(NonZeroU8);

impl Sequence {
    /// Smallest valid sequence number.
    pub const MIN: Self = Self(NonZeroU8::MIN);

    /// Largest sequence number representable on the wire.
    pub const MAX: Self = Self(NonZeroU8::MAX);

    /// Build a sequence from any integer, rejecting values outside `1..=255`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::SequenceOutOfRange`] for 0, negatives and
    /// anything above 255.
    pub fn new(value: i64) -> Result<Self, RecordError> {
        u8::try_from(value)
            .ok()
            .and_then(NonZeroU8::new)
            .map(Self)
            .ok_or(RecordError::SequenceOutOfRange(value))
    }

    /// Wire representation (the resend request's second byte).
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0.get()
    }

    /// Iterate every sequence in `1..=self`, ascending.
    pub fn up_to(self) -> impl Iterator<Item = Self> {
        (1..=self.as_u8()).filter_map(NonZeroU8::new).map(Self)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for Sequence {
    type Error = RecordError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<Sequence> for u8 {
    fn from(value: Sequence) -> Self {
        value.as_u8()
    }
}

impl Serialize for Sequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

// =============================================================================
// Symbol
// =============================================================================

/// Four-letter ticker, fixed width with no padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol([u8; 4]);

impl Symbol {
    /// Validate raw symbol bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidSymbol`] unless every byte is an ASCII
    /// letter.
    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self, RecordError> {
        if bytes.iter().all(u8::is_ascii_alphabetic) {
            Ok(Self(bytes))
        } else {
            Err(RecordError::InvalidSymbol(bytes))
        }
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII, which is always valid UTF-8.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Symbol {
    type Error = RecordError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut bytes = [0u8; 4];
        if value.len() != bytes.len() {
            let mut raw = [0u8; 4];
            for (slot, byte) in raw.iter_mut().zip(value.bytes()) {
                *slot = byte;
            }
            return Err(RecordError::InvalidSymbol(raw));
        }
        bytes.copy_from_slice(value.as_bytes());
        Self::from_bytes(bytes)
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// =============================================================================
// Side
// =============================================================================

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Buy order (`B`).
    Buy,
    /// Sell order (`S`).
    Sell,
}

impl Side {
    /// Parse the single-byte wire marker.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidSide`] for anything other than `B`/`S`.
    pub const fn from_marker(marker: u8) -> Result<Self, RecordError> {
        match marker {
            b'B' => Ok(Self::Buy),
            b'S' => Ok(Self::Sell),
            other => Err(RecordError::InvalidSide(other)),
        }
    }

    /// Single-character marker as sent on the wire.
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Buy => 'B',
            Self::Sell => 'S',
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.marker())
    }
}

// =============================================================================
// Order Record
// =============================================================================

/// A validated order snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRecord {
    symbol: Symbol,
    side: Side,
    quantity: u32,
    price: u32,
    sequence: Sequence,
}

impl OrderRecord {
    /// Build a record from raw wire values, applying every field check.
    ///
    /// # Errors
    ///
    /// Returns the first [`RecordError`] encountered, checked in wire order.
    pub fn new(
        symbol: Symbol,
        side: Side,
        quantity: i32,
        price: i32,
        sequence: i32,
    ) -> Result<Self, RecordError> {
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(RecordError::NonPositiveQuantity(quantity))?;
        let price = u32::try_from(price)
            .ok()
            .filter(|p| *p > 0)
            .ok_or(RecordError::NonPositivePrice(price))?;
        let sequence = Sequence::try_from(sequence)?;

        Ok(Self {
            symbol,
            side,
            quantity,
            price,
            sequence,
        })
    }

    /// Ticker symbol.
    #[must_use]
    pub const fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Buy or sell.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Order quantity.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Price in the server's native unit.
    #[must_use]
    pub const fn price(&self) -> u32 {
        self.price
    }

    /// Server-assigned sequence number.
    #[must_use]
    pub const fn sequence(&self) -> Sequence {
        self.sequence
    }
}

impl fmt::Display for OrderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Seq:{} {} {} Qty:{} Price:{}",
            self.sequence, self.symbol, self.side, self.quantity, self.price
        )
    }
}
