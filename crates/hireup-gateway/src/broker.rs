use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use hireup_types::events::GatewayEvent;

/// Publish/subscribe bus keyed by channel name (one channel per user
/// slug). Created once at process start and injected wherever events are
/// published or consumed; there is no ambient global registry.
///
/// Publishing is fire-and-forget: no delivery confirmation, no
/// persistence, and a channel with no live subscribers silently drops
/// the event. Each subscriber has its own unbounded queue, so a slow
/// consumer never stalls the publisher or other subscribers.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

struct BrokerInner {
    channels: RwLock<HashMap<String, Vec<Subscriber>>>,
}

struct Subscriber {
    id: Uuid,
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Attach a subscriber to a channel. Several subscribers may share a
    /// channel (the same user open in two tabs); all of them receive
    /// every publish.
    pub async fn subscribe(&self, channel: &str) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        self.inner
            .channels
            .write()
            .await
            .entry(channel.to_string())
            .or_default()
            .push(Subscriber { id, tx });

        (id, rx)
    }

    /// Detach one subscriber. The channel entry is dropped when its last
    /// subscriber leaves.
    pub async fn unsubscribe(&self, channel: &str, id: Uuid) {
        let mut channels = self.inner.channels.write().await;
        if let Some(subscribers) = channels.get_mut(channel) {
            subscribers.retain(|s| s.id != id);
            if subscribers.is_empty() {
                channels.remove(channel);
            }
        }
    }

    /// Publish an event to every live subscriber of a channel, in
    /// publish order. Subscribers whose receiving side is gone are
    /// pruned along the way.
    pub async fn publish(&self, channel: &str, event: GatewayEvent) {
        let mut channels = self.inner.channels.write().await;
        let Some(subscribers) = channels.get_mut(channel) else {
            return;
        };

        subscribers.retain(|s| s.tx.send(event.clone()).is_ok());
        if subscribers.is_empty() {
            channels.remove(channel);
        }
    }

    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.inner
            .channels
            .read()
            .await
            .get(channel)
            .map_or(0, Vec::len)
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireup_types::events::{GatewayEvent, SentMessage};
    use hireup_types::models::{MessageView, UserProfile};

    fn event(content: &str) -> GatewayEvent {
        GatewayEvent::SentMessage(SentMessage {
            message: MessageView {
                id: 1,
                content: content.into(),
                read: false,
                deleted: false,
                created_at: chrono::Utc::now(),
                sender: UserProfile {
                    id: 1,
                    slug: "alice".into(),
                    first_name: "Alice".into(),
                    last_name: "Archer".into(),
                },
                reply: None,
            },
            conversation_id: "conv-1".into(),
        })
    }

    fn content_of(event: &GatewayEvent) -> &str {
        match event {
            GatewayEvent::SentMessage(payload) => &payload.message.content,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn fans_out_to_every_subscriber_on_the_channel() {
        let broker = Broker::new();
        let (_a, mut rx_a) = broker.subscribe("bob").await;
        let (_b, mut rx_b) = broker.subscribe("bob").await;

        broker.publish("bob", event("hi")).await;

        assert_eq!(content_of(&rx_a.recv().await.unwrap()), "hi");
        assert_eq!(content_of(&rx_b.recv().await.unwrap()), "hi");
    }

    #[tokio::test]
    async fn delivery_order_matches_publish_order_per_channel() {
        let broker = Broker::new();
        let (_id, mut rx) = broker.subscribe("bob").await;

        for i in 0..5 {
            broker.publish("bob", event(&format!("m{i}"))).await;
        }
        for i in 0..5 {
            assert_eq!(content_of(&rx.recv().await.unwrap()), format!("m{i}"));
        }
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let broker = Broker::new();
        let (id, mut rx) = broker.subscribe("bob").await;

        broker.unsubscribe("bob", id).await;
        broker.publish("bob", event("late")).await;

        assert!(rx.recv().await.is_none());
        assert_eq!(broker.subscriber_count("bob").await, 0);
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let broker = Broker::new();
        let (_id, mut bob_rx) = broker.subscribe("bob").await;
        let (_id, mut eve_rx) = broker.subscribe("eve").await;

        broker.publish("bob", event("for bob")).await;

        assert_eq!(content_of(&bob_rx.recv().await.unwrap()), "for bob");
        assert!(eve_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let broker = Broker::new();
        broker.publish("nobody", event("dropped")).await;
        assert_eq!(broker.subscriber_count("nobody").await, 0);
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned_on_publish() {
        let broker = Broker::new();
        let (_id, rx) = broker.subscribe("bob").await;
        drop(rx);

        broker.publish("bob", event("hi")).await;
        assert_eq!(broker.subscriber_count("bob").await, 0);
    }
}
