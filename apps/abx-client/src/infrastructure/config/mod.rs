//! Configuration Module
//!
//! Configuration loading for the client: server endpoint, connection
//! timeouts, backfill retries and operator output.

mod settings;

pub use settings::{ClientConfig, ConfigError, OutputFormat, ServerEndpoint, TransportSettings};
