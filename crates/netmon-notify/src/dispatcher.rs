use crate::error::{NotifyError, Result};
use crate::registry::NotifierFactory;
use crate::Notifier;
use netmon_common::types::{Alert, DeliveryState, NotificationChannel};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Fans one alert out to its channels with bounded concurrency.
///
/// Channel outcomes are independent: a failing channel marks only its own
/// entry failed and never blocks the others. The send timeout caps a
/// single slow endpoint, the dispatch timeout caps the whole fan-out.
pub struct NotificationDispatcher {
    factory: Arc<dyn NotifierFactory>,
    max_concurrent: usize,
    send_timeout: Duration,
    dispatch_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        factory: Arc<dyn NotifierFactory>,
        max_concurrent: usize,
        send_timeout: Duration,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            factory,
            max_concurrent,
            send_timeout,
            dispatch_timeout,
        }
    }

    /// Sends `alert` through every eligible channel and returns the
    /// delivery outcome per channel id.
    ///
    /// Eligible means enabled and with a `min_severity` at or below the
    /// alert's. Ineligible channels are skipped and get no entry. Sends
    /// still unfinished when the dispatch deadline passes are aborted and
    /// left pending, whether in flight or still queued for a permit.
    pub async fn dispatch(
        &self,
        alert: &Alert,
        channels: &[NotificationChannel],
    ) -> HashMap<String, DeliveryState> {
        let mut statuses = HashMap::new();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent.max(1)));
        let mut sends = JoinSet::new();

        for channel in channels {
            if !channel.enabled {
                tracing::debug!(channel_id = %channel.id, "Channel disabled, skipping");
                continue;
            }
            if let Some(min) = channel.min_severity {
                if alert.severity < min {
                    tracing::debug!(
                        channel_id = %channel.id,
                        "Alert below channel's minimum severity, skipping"
                    );
                    continue;
                }
            }

            statuses.insert(channel.id.clone(), DeliveryState::Pending);

            let notifier = match self.factory.build(channel) {
                Ok(notifier) => notifier,
                Err(e) => {
                    tracing::warn!(
                        channel_id = %channel.id,
                        channel_name = %channel.name,
                        error = %e,
                        "Failed to build notifier from channel config"
                    );
                    statuses.insert(channel.id.clone(), DeliveryState::Failed);
                    continue;
                }
            };

            // Every task is spawned immediately and waits for its permit
            // inside, so the dispatch deadline below covers sends still
            // queued on the semaphore, not only those already in flight.
            let semaphore = semaphore.clone();
            let kind = notifier.kind();
            let channel_id = channel.id.clone();
            let alert = alert.clone();
            let limit = self.send_timeout;
            sends.spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (channel_id, DeliveryState::Pending);
                };
                let state = match send_with_timeout(&*notifier, &alert, limit).await {
                    Ok(()) => {
                        tracing::info!(channel_id = %channel_id, channel = kind, "Notification sent");
                        DeliveryState::Sent
                    }
                    Err(e) => {
                        tracing::warn!(
                            channel_id = %channel_id,
                            channel = kind,
                            error = %e,
                            "Notification failed"
                        );
                        DeliveryState::Failed
                    }
                };
                (channel_id, state)
            });
        }

        let deadline = timeout(self.dispatch_timeout, async {
            while let Some(result) = sends.join_next().await {
                match result {
                    Ok((channel_id, state)) => {
                        statuses.insert(channel_id, state);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Notification task panicked");
                    }
                }
            }
        })
        .await;

        if deadline.is_err() {
            tracing::warn!(
                alert_id = %alert.id,
                "Dispatch deadline hit, unfinished sends stay pending"
            );
            sends.abort_all();
            // Sends that completed before the deadline but were never
            // joined keep their real outcome; aborted ones stay pending.
            while let Some(result) = sends.try_join_next() {
                if let Ok((channel_id, state)) = result {
                    statuses.insert(channel_id, state);
                }
            }
        }

        statuses
    }
}

async fn send_with_timeout(notifier: &dyn Notifier, alert: &Alert, limit: Duration) -> Result<()> {
    match timeout(limit, notifier.send(alert)).await {
        Ok(result) => result,
        Err(_) => Err(NotifyError::Timeout(limit.as_secs())),
    }
}
