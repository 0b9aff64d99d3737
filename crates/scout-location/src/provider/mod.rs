//! [`LocationProvider`](crate::LocationProvider) implementations.
//!
//! - [`ChannelLocationProvider`]: bridge for a host that owns the real
//!   platform location service and pushes fixes in
//! - [`ReplayLocationProvider`]: replays recorded fixes from an NDJSON file

pub mod channel;
pub mod replay;

pub use channel::{ChannelLocationProvider, PositionFeed};
pub use replay::ReplayLocationProvider;

/// Buffered samples per watch before the producer has to wait.
const WATCH_CHANNEL_CAPACITY: usize = 64;
