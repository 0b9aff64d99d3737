//! Live event notifier: one SSE connection per session with fixed-delay
//! reconnect.
//!
//! The notifier runs as a tokio task that:
//! 1. Opens a fresh connection through the [`StreamTransport`].
//! 2. Handles each message in arrival order: decode, route by `type`, schedule
//!    a notification for `NEW_ACTIVITY_LOG`.
//! 3. On a connect failure, read error or server close: drops the connection,
//!    waits the reconnect delay and goes back to 1. Forever, no backoff.
//!
//! [`stop`](LiveEventNotifier::stop) interrupts any of these steps, including a
//! pending reconnect delay; once it returns no further connection is opened.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use scout_core::config::EventsConfig;
use scout_core::{ConnectionState, PermissionStatus};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::event::{LiveEvent, parse_live_event};
use crate::notification::DeliveryTrigger;
use crate::transport::StreamEvent;
use crate::{NotificationSink, StreamTransport};

/// Session-scoped live event notifier.
pub struct LiveEventNotifier {
    reconnect_delay: Duration,
    transport: Arc<dyn StreamTransport>,
    notifications: Arc<dyn NotificationSink>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    /// Asked once per notifier.
    permission: Option<PermissionStatus>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl LiveEventNotifier {
    pub fn new(
        config: &EventsConfig,
        transport: Arc<dyn StreamTransport>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay(),
            transport,
            notifications,
            state_tx: Arc::new(watch::channel(ConnectionState::Idle).0),
            permission: None,
            shutdown_tx: None,
            task: None,
        }
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Ask for notification permission (first call only) and start the
    /// connection loop. A refused permission does not stop the connection.
    pub async fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        if self.permission.is_none() {
            let status = self.notifications.request_permission().await;
            if status.is_granted() {
                debug!("[events] notification permission granted");
            } else {
                warn!("[events] notification permission {status}, notifications may not be shown");
            }
            self.permission = Some(status);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ctx = ConnectionContext {
            reconnect_delay: self.reconnect_delay,
            transport: Arc::clone(&self.transport),
            notifications: Arc::clone(&self.notifications),
            state_tx: Arc::clone(&self.state_tx),
        };
        let task = tokio::spawn(connection_loop(ctx, shutdown_rx));

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
    }

    /// Tear down the current connection and cancel any pending reconnect.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.state_tx.send_replace(ConnectionState::Idle);
    }
}

struct ConnectionContext {
    reconnect_delay: Duration,
    transport: Arc<dyn StreamTransport>,
    notifications: Arc<dyn NotificationSink>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
}

impl ConnectionContext {
    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    /// Handle one inbound event. Never fails: bad payloads are logged and dropped.
    async fn dispatch(&self, event: &StreamEvent) {
        if !event.is_message() {
            debug!("[events] ignoring '{}' event", event.event);
            return;
        }

        match parse_live_event(&event.data) {
            Ok(LiveEvent::Connected { connection_id }) => {
                info!("[events] server acknowledged connection {}", connection_label(connection_id.as_ref()));
            }
            Ok(LiveEvent::NewActivityLog(log)) => {
                let notification = log.to_notification();
                debug!("[events] activity: {}", notification.title);
                if let Err(e) = self.notifications.schedule(notification, DeliveryTrigger::Immediate).await {
                    warn!("[events] could not schedule notification: {e}");
                }
            }
            Ok(LiveEvent::Unknown) => {
                debug!("[events] ignoring event: {}", event.data);
            }
            Err(e) => {
                warn!("[events] dropping malformed message: {e}");
            }
        }
    }
}

/// Main connection loop. Reconnects after a fixed delay until shutdown.
async fn connection_loop(ctx: ConnectionContext, mut shutdown_rx: watch::Receiver<bool>) {
    let endpoint = ctx.transport.endpoint().to_string();
    let delay = ctx.reconnect_delay;
    let mut attempt: u64 = 0;

    'session: loop {
        if *shutdown_rx.borrow() {
            break;
        }

        attempt += 1;
        ctx.set_state(ConnectionState::Connecting);
        info!("[events] connecting to {endpoint} (attempt {attempt})");

        let connected = tokio::select! {
            res = ctx.transport.connect() => res,
            _ = shutdown_rx.changed() => break 'session,
        };

        match connected {
            Ok(mut stream) => {
                ctx.set_state(ConnectionState::Open);
                info!("[events] stream open");

                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            info!("[events] shutdown signal received");
                            break 'session;
                        }

                        item = stream.next() => match item {
                            Some(Ok(event)) => ctx.dispatch(&event).await,
                            Some(Err(e)) => {
                                error!("[events] stream error: {e}");
                                break;
                            }
                            None => {
                                warn!("[events] stream closed by server");
                                break;
                            }
                        }
                    }
                }
                // `stream` is dropped here, closing the connection before the wait.
            }
            Err(e) => {
                error!("[events] connect failed: {e}");
            }
        }

        ctx.set_state(ConnectionState::Reconnecting);
        warn!("[events] reconnecting in {delay:?}");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {},
            _ = shutdown_rx.changed() => break 'session,
        }
    }

    ctx.set_state(ConnectionState::Idle);
    info!("[events] notifier stopped after {attempt} connection attempt(s)");
}

/// Printable connection id: strings without JSON quotes, `-` when absent.
fn connection_label(id: Option<&serde_json::Value>) -> String {
    match id {
        None | Some(serde_json::Value::Null) => "-".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
