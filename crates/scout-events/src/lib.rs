//! # scout-events
//!
//! Live CRM events turned into local notifications.
//!
//! ## Architecture
//!
//! ```text
//! StreamTransport ──StreamEvent──▶ LiveEventNotifier ──LocalNotification──▶ NotificationSink
//!   (SSE over reqwest)              │ parse JSON, route by `type`
//!                                   └ reconnect after a fixed delay, forever
//! ```
//!
//! - [`notifier`]: connection state machine and message dispatch
//! - [`event`]: wire model of the stream's JSON payloads
//! - [`transport`]: SSE transport (`reqwest` + `eventsource-stream`)
//! - [`notification`]: notification model and sinks

pub mod event;
pub mod notification;
pub mod notifier;
pub mod transport;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use scout_core::PermissionStatus;
use scout_core::error::ScoutResult;

pub use event::{ActivityLog, LiveEvent};
pub use notification::{ChannelNotificationSink, DeliveryTrigger, LocalNotification, LogNotificationSink};
pub use notifier::LiveEventNotifier;
pub use transport::{SseTransport, StreamEvent};

/// Events of one open connection. An `Err` item is a transport failure.
pub type EventStream = Pin<Box<dyn Stream<Item = ScoutResult<StreamEvent>> + Send>>;

/// Opens a fresh event stream per call. Connections are never reused.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn connect(&self) -> ScoutResult<EventStream>;

    /// Endpoint description for logs.
    fn endpoint(&self) -> &str;
}

/// Local notification centre of the host.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Ask for permission to show notifications. Only reported, not enforced.
    async fn request_permission(&self) -> PermissionStatus;

    async fn schedule(&self, notification: LocalNotification, trigger: DeliveryTrigger) -> ScoutResult<()>;
}
