//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (exchange server transport).
pub mod ports;

/// Application services for reconciliation and single-record requests.
pub mod services;
