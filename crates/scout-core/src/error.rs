//! Typed error definitions for the scout workspace.
//!
//! Provides [`ScoutError`] for domain-specific failures. All variants implement
//! `std::error::Error` via `thiserror`, so they compose with `anyhow::Result`
//! at the application edges.

use thiserror::Error;

/// Domain-specific errors.
///
/// None of these is fatal to a running component: callers log and move on,
/// or reconnect in the case of [`ScoutError::Stream`].
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Location provider failure (watch could not start, bad replay file).
    #[error("location error: {0}")]
    Location(String),

    /// Reverse-geocoding request or decoding failure.
    #[error("geocode error: {0}")]
    Geocode(String),

    /// Location upload failure.
    #[error("upload error: {0}")]
    Upload(String),

    /// Event stream connect or read failure.
    #[error("stream error: {0}")]
    Stream(String),

    /// Malformed payload.
    #[error("parse error: {0}")]
    Parse(String),

    /// Local notification could not be scheduled.
    #[error("notification error: {0}")]
    Notification(String),
}

pub type ScoutResult<T> = Result<T, ScoutError>;
