/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::redis::keys::location_updates_channel;
use crate::tools::error::AppError;
use async_trait::async_trait;
use fred::clients::SubscriberClient;
use fred::interfaces::{EventInterface, PubsubInterface};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::warn;

/// Handle to one registered change callback.
///
/// Unsubscribing is synchronous, idempotent and safe to call any number
/// of times; dropping the handle unsubscribes as well. Once
/// unsubscribed no further events are delivered.
pub struct Subscription {
    topic: ChangeTopic,
    active: Arc<AtomicBool>,
    events: mpsc::Receiver<ChangeEvent>,
    forwarder: Option<JoinHandle<()>>,
    on_unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn topic(&self) -> ChangeTopic {
        self.topic
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Next change event, or `None` once the subscription is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        if !self.is_active() {
            return None;
        }
        self.events.recv().await
    }

    pub fn unsubscribe(&mut self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        if let Some(on_unsubscribe) = self.on_unsubscribe.take() {
            on_unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Push interface of the store's change feed. The consumer only
/// registers and unregisters callbacks; delivery is at-least-once and
/// unordered, which the presenter tolerates by doing a full fetch on
/// mount.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn subscribe(&self, topic: ChangeTopic) -> Result<Subscription, AppError>;
}

/// Change notifier over Redis pub/sub channels.
pub struct RedisChangeNotifier {
    subscriber: SubscriberClient,
    channel_refs: Arc<Mutex<FxHashMap<ChangeTopic, usize>>>,
}

impl RedisChangeNotifier {
    pub fn new(subscriber: SubscriberClient) -> Self {
        Self {
            subscriber,
            channel_refs: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    fn retain_channel(&self, topic: ChangeTopic) {
        if let Ok(mut refs) = self.channel_refs.lock() {
            *refs.entry(topic).or_insert(0) += 1;
        }
    }

    /// Decrements the per-channel refcount and lazily drops the Redis
    /// subscription when the last local subscriber is gone. The actual
    /// UNSUBSCRIBE runs detached because handle teardown is sync.
    fn release_channel(
        subscriber: SubscriberClient,
        channel_refs: Arc<Mutex<FxHashMap<ChangeTopic, usize>>>,
        topic: ChangeTopic,
    ) {
        let last_subscriber = match channel_refs.lock() {
            Ok(mut refs) => match refs.get_mut(&topic) {
                Some(count) => {
                    *count = count.saturating_sub(1);
                    *count == 0
                }
                None => false,
            },
            Err(_) => false,
        };

        if last_subscriber {
            tokio::spawn(async move {
                if let Err(err) = subscriber
                    .unsubscribe(location_updates_channel(&topic))
                    .await
                {
                    warn!(tag = "[Notifier Unsubscribe Failed]", error = %err);
                }
            });
        }
    }
}

#[async_trait]
impl ChangeNotifier for RedisChangeNotifier {
    async fn subscribe(&self, topic: ChangeTopic) -> Result<Subscription, AppError> {
        let channel = location_updates_channel(&topic);

        self.subscriber
            .subscribe(channel.as_str())
            .await
            .map_err(|err| AppError::InternalError(format!("SUBSCRIBE failed : {err}")))?;
        self.retain_channel(topic);

        let mut message_rx = self.subscriber.message_rx();
        let (tx, rx) = mpsc::channel(64);
        let active = Arc::new(AtomicBool::new(true));

        let forwarder = tokio::spawn({
            let active = active.clone();
            async move {
                while active.load(Ordering::SeqCst) {
                    match message_rx.recv().await {
                        Ok(message) => {
                            if message.channel.to_string() != channel {
                                continue;
                            }
                            let payload = match message.value.as_str() {
                                Some(payload) => payload.to_string(),
                                None => continue,
                            };
                            match serde_json::from_str::<ChangeEvent>(&payload) {
                                Ok(event) => {
                                    if tx.send(event).await.is_err() {
                                        break;
                                    }
                                }
                                Err(err) => {
                                    warn!(tag = "[Malformed Change Event]", error = %err);
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Tolerated: the consumer refetches the full
                            // latest view on every event anyway.
                            warn!(tag = "[Notifier Lagged]", skipped = %skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        let subscriber = self.subscriber.clone();
        let channel_refs = self.channel_refs.clone();

        Ok(Subscription {
            topic,
            active,
            events: rx,
            forwarder: Some(forwarder),
            on_unsubscribe: Some(Box::new(move || {
                Self::release_channel(subscriber, channel_refs, topic);
            })),
        })
    }
}

/// In-process notifier over tokio broadcast channels. Backs embedded
/// presenters and the test suites.
#[derive(Default)]
pub struct InProcessChangeNotifier {
    senders: Mutex<FxHashMap<ChangeTopic, broadcast::Sender<ChangeEvent>>>,
}

impl InProcessChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: ChangeTopic) -> Option<broadcast::Sender<ChangeEvent>> {
        self.senders
            .lock()
            .ok()
            .map(|mut senders| {
                senders
                    .entry(topic)
                    .or_insert_with(|| broadcast::channel(64).0)
                    .clone()
            })
    }

    pub fn notify(&self, event: ChangeEvent) {
        if let Some(sender) = self.sender(event.topic) {
            // No receivers is fine; nobody is watching this topic.
            let _ = sender.send(event);
        }
    }

    pub fn active_subscriptions(&self, topic: ChangeTopic) -> usize {
        self.senders
            .lock()
            .ok()
            .and_then(|senders| senders.get(&topic).map(|sender| sender.receiver_count()))
            .unwrap_or(0)
    }
}

#[async_trait]
impl ChangeNotifier for InProcessChangeNotifier {
    async fn subscribe(&self, topic: ChangeTopic) -> Result<Subscription, AppError> {
        let mut broadcast_rx = self
            .sender(topic)
            .ok_or_else(|| AppError::InternalError("notifier lock poisoned".to_string()))?
            .subscribe();

        let (tx, rx) = mpsc::channel(64);
        let active = Arc::new(AtomicBool::new(true));

        let forwarder = tokio::spawn({
            let active = active.clone();
            async move {
                while active.load(Ordering::SeqCst) {
                    match broadcast_rx.recv().await {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        Ok(Subscription {
            topic,
            active,
            events: rx,
            forwarder: Some(forwarder),
            on_unsubscribe: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn event(actor: &str) -> ChangeEvent {
        ChangeEvent {
            topic: ChangeTopic::DriverLocations,
            actor_id: ActorId(actor.to_string()),
            recorded_at: TimeStamp(Utc::now()),
        }
    }

    #[tokio::test]
    async fn delivers_events_to_subscriber() {
        let notifier = InProcessChangeNotifier::new();
        let mut subscription = notifier
            .subscribe(ChangeTopic::DriverLocations)
            .await
            .unwrap();

        notifier.notify(event("driver-1"));

        let received = subscription.recv().await.unwrap();
        assert_eq!(received.actor_id, ActorId("driver-1".to_string()));
    }

    #[tokio::test]
    async fn double_unsubscribe_is_idempotent_and_leaves_no_subscriptions() {
        let notifier = InProcessChangeNotifier::new();
        let mut subscription = notifier
            .subscribe(ChangeTopic::DriverLocations)
            .await
            .unwrap();

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            notifier.active_subscriptions(ChangeTopic::DriverLocations),
            0
        );
    }

    #[tokio::test]
    async fn recv_after_unsubscribe_yields_nothing() {
        let notifier = InProcessChangeNotifier::new();
        let mut subscription = notifier
            .subscribe(ChangeTopic::PassengerLocations)
            .await
            .unwrap();

        subscription.unsubscribe();
        notifier.notify(ChangeEvent {
            topic: ChangeTopic::PassengerLocations,
            actor_id: ActorId("passenger-1".to_string()),
            recorded_at: TimeStamp(Utc::now()),
        });

        assert!(subscription.recv().await.is_none());
    }
}
