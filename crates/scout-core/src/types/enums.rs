//! Enumerations used throughout the scout workspace.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// Result of a platform permission prompt.
///
/// Only ever used for branching. A denied permission is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    #[default]
    Undetermined,
}

impl PermissionStatus {
    #[inline]
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Undetermined => write!(f, "undetermined"),
        }
    }
}

// ---------------------------------------------------------------------------
// Location accuracy
// ---------------------------------------------------------------------------

/// Requested accuracy of the platform location watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    Lowest,
    Low,
    Balanced,
    #[default]
    High,
    Highest,
}

// ---------------------------------------------------------------------------
// Component lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a position reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReporterState {
    /// Not started, no identity yet, or stopped.
    #[default]
    Idle,
    /// Foreground location permission was refused. Sticky for the instance.
    PermissionDenied,
    /// The location watch is running and samples are being processed.
    Tracking,
    /// The platform terminated the watch. Needs an external `start` to resume.
    WatchEnded,
}

/// Lifecycle state of the live event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    /// Waiting out the reconnect delay before the next `Connecting`.
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_from_json() {
        let status: PermissionStatus = serde_json::from_str("\"granted\"").unwrap();
        assert!(status.is_granted());
        let status: PermissionStatus = serde_json::from_str("\"denied\"").unwrap();
        assert!(!status.is_granted());
        assert!(!PermissionStatus::default().is_granted());
    }
}
