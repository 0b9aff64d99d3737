//! # scout-core
//!
//! Core crate for the scout field-agent client, providing:
//!
//! - **Types** (`types`): positions, addresses, upload body, session identity, state enums
//! - **Geometry** (`geo`): haversine great-circle distance
//! - **Configuration** (`config`): JSON config deserialization and validation
//! - **Error types** (`error`): domain-specific `ScoutError` via thiserror
//! - **Time utilities** (`time_util`): ISO-8601 timestamps
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod geo;
pub mod logging;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
