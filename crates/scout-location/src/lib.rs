//! # scout-location
//!
//! Background position reporting for a signed-in field agent.
//!
//! ## Architecture
//!
//! ```text
//! LocationProvider ──samples──▶ PositionReporter ──▶ watch: Position
//!                                 │   │
//!                                 │   └─ GeocodeGate (> threshold?) ──▶ Geocoder ──▶ watch: ResolvedAddress
//!                                 └─ every sample ──▶ PositionSink (POST {base_url}/data)
//! ```
//!
//! The platform pieces are traits so a host can plug in its own location
//! service, geocoder or backend client:
//!
//! - [`LocationProvider`]: permission prompts + continuous watch
//! - [`Geocoder`]: coordinates to city/street
//! - [`PositionSink`]: best-effort upload of each sample

pub mod gate;
pub mod geocoder;
pub mod provider;
pub mod reporter;
pub mod uploader;

use async_trait::async_trait;
use scout_core::config::WatchOptions;
use scout_core::error::ScoutResult;
use scout_core::{LocationReport, PermissionStatus, Position, ResolvedAddress};

pub use gate::{GateDecision, GeocodeGate};
pub use geocoder::NominatimGeocoder;
pub use provider::{ChannelLocationProvider, PositionFeed, ReplayLocationProvider};
pub use reporter::PositionReporter;
pub use uploader::HttpUploader;

/// Receiving end of a running location watch.
///
/// The watch is over when the channel closes.
pub type PositionStream = tokio::sync::mpsc::Receiver<Position>;

/// Platform location service.
///
/// Implementations must deliver samples of one watch in order through a single
/// channel; the reporter relies on that to handle them one at a time.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Prompt for (or look up) foreground location access.
    async fn request_foreground_permission(&self) -> PermissionStatus;

    /// Prompt for background location access. Best effort.
    async fn request_background_permission(&self) -> ScoutResult<PermissionStatus>;

    /// Start a continuous watch with the given gating options.
    async fn watch_position(&self, options: WatchOptions) -> ScoutResult<PositionStream>;
}

/// Reverse geocoding service.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, position: Position) -> ScoutResult<ResolvedAddress>;
}

/// Destination for location reports.
#[async_trait]
pub trait PositionSink: Send + Sync {
    async fn upload(&self, report: &LocationReport) -> ScoutResult<()>;
}
