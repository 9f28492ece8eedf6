//! Domain Layer - Order records and reconciliation state.
//!
//! This layer contains the core types for order retrieval with no I/O.
//! Values here are validated on construction.

/// Order record value types (symbol, side, sequence).
pub mod order;

/// Retrieval session state and gap analysis.
pub mod reconciliation;
