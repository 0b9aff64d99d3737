//! Local notification model and the bundled sinks.

use std::time::Duration;

use async_trait::async_trait;
use scout_core::PermissionStatus;
use scout_core::error::{ScoutError, ScoutResult};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::NotificationSink;

/// Content of a device notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalNotification {
    pub title: String,
    pub body: String,
    /// Opaque payload handed back to the app when the notification is opened.
    pub data: serde_json::Value,
}

/// When a notification should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryTrigger {
    #[default]
    Immediate,
    After(Duration),
}

/// A notification together with its trigger, as handed to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledNotification {
    pub notification: LocalNotification,
    pub trigger: DeliveryTrigger,
}

/// Forwards notifications to the host over a channel.
pub struct ChannelNotificationSink {
    permission: PermissionStatus,
    tx: mpsc::UnboundedSender<ScheduledNotification>,
}

impl ChannelNotificationSink {
    pub fn new(permission: PermissionStatus) -> (Self, mpsc::UnboundedReceiver<ScheduledNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { permission, tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelNotificationSink {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn schedule(&self, notification: LocalNotification, trigger: DeliveryTrigger) -> ScoutResult<()> {
        self.tx
            .send(ScheduledNotification { notification, trigger })
            .map_err(|_| ScoutError::Notification("host receiver dropped".into()))
    }
}

/// Writes notifications to the log. Used by the runner, which has no screen.
#[derive(Debug, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn schedule(&self, notification: LocalNotification, trigger: DeliveryTrigger) -> ScoutResult<()> {
        info!(
            title = %notification.title,
            data = %notification.data,
            ?trigger,
            "[notify] {}",
            notification.body
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_sink_forwards() {
        let (sink, mut rx) = ChannelNotificationSink::new(PermissionStatus::Denied);
        assert_eq!(sink.request_permission().await, PermissionStatus::Denied);

        let n = LocalNotification { title: "t".into(), body: "b".into(), data: serde_json::json!({"k": 1}) };
        sink.schedule(n.clone(), DeliveryTrigger::Immediate).await.unwrap();
        let got = rx.recv().await.unwrap();
        assert_eq!(got.notification, n);
        assert_eq!(got.trigger, DeliveryTrigger::Immediate);

        drop(rx);
        assert!(matches!(
            sink.schedule(n, DeliveryTrigger::default()).await,
            Err(ScoutError::Notification(_))
        ));
    }
}
