use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::Document;

/// One push from the store: the complete current result set of a
/// collection, or the error that prevented loading it.
#[derive(Debug, Clone)]
pub enum Snapshot {
    Data(Arc<[Document]>),
    Error(String),
}

impl Snapshot {
    #[must_use]
    pub fn documents(&self) -> Option<&[Document]> {
        match self {
            Snapshot::Data(docs) => Some(docs),
            Snapshot::Error(_) => None,
        }
    }
}

struct Channel {
    sender: watch::Sender<Snapshot>,
    subscribers: usize,
}

/// Per-collection last-value channels. A channel exists only while at least
/// one [`Subscription`] for its collection is alive.
#[derive(Default)]
pub struct SubscriptionHub {
    channels: Mutex<HashMap<String, Channel>>,
}

impl SubscriptionHub {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn channels(&self) -> std::sync::MutexGuard<'_, HashMap<String, Channel>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a subscriber, seeding a new channel with `initial`. An
    /// existing channel keeps its latest value.
    pub fn subscribe(self: &Arc<Self>, collection: &str, initial: Snapshot) -> Subscription {
        let mut channels = self.channels();
        let channel = channels
            .entry(collection.to_string())
            .or_insert_with(|| Channel {
                sender: watch::channel(initial).0,
                subscribers: 0,
            });
        channel.subscribers += 1;
        tracing::debug!(
            "Subscribed to '{}' ({} subscribers)",
            collection,
            channel.subscribers
        );
        Subscription {
            hub: Arc::clone(self),
            collection: collection.to_string(),
            receiver: channel.sender.subscribe(),
            primed: false,
            active: true,
        }
    }

    /// Replaces the latest value of a collection's channel. No-op when
    /// nobody is subscribed.
    pub fn publish(&self, collection: &str, snapshot: Snapshot) {
        if let Some(channel) = self.channels().get(collection) {
            channel.sender.send_replace(snapshot);
        }
    }

    #[must_use]
    pub fn is_subscribed(&self, collection: &str) -> bool {
        self.channels().contains_key(collection)
    }

    #[must_use]
    pub fn subscribed_collections(&self) -> Vec<String> {
        self.channels().keys().cloned().collect()
    }

    #[must_use]
    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.channels()
            .get(collection)
            .map_or(0, |channel| channel.subscribers)
    }

    fn release(&self, collection: &str) {
        let mut channels = self.channels();
        if let Some(channel) = channels.get_mut(collection) {
            channel.subscribers = channel.subscribers.saturating_sub(1);
            if channel.subscribers == 0 {
                channels.remove(collection);
                tracing::debug!("Closed subscription channel for '{}'", collection);
            }
        }
    }
}

/// A live view of one collection. Released when dropped.
pub struct Subscription {
    hub: Arc<SubscriptionHub>,
    collection: String,
    receiver: watch::Receiver<Snapshot>,
    primed: bool,
    active: bool,
}

impl Subscription {
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The most recent push without waiting.
    #[must_use]
    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Waits for the next push. The first call returns the snapshot that was
    /// current when the subscription opened. Intermediate pushes that were
    /// never observed are skipped; only the latest is returned. Returns
    /// `None` once unsubscribed.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if !self.active {
            return None;
        }
        if !self.primed {
            self.primed = true;
            return Some(self.receiver.borrow_and_update().clone());
        }
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            self.hub.release(&self.collection);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn docs(ids: &[&str]) -> Snapshot {
        Snapshot::Data(
            ids.iter()
                .map(|id| Document {
                    id: id.to_string(),
                    data: Map::new(),
                })
                .collect(),
        )
    }

    fn ids(snapshot: &Snapshot) -> Vec<String> {
        snapshot
            .documents()
            .unwrap()
            .iter()
            .map(|d| d.id.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_first_next_returns_initial_snapshot() {
        let hub = SubscriptionHub::new();
        let mut sub = hub.subscribe("contacts", docs(&["a"]));
        let first = sub.next().await.unwrap();
        assert_eq!(ids(&first), vec!["a"]);
    }

    #[tokio::test]
    async fn test_latest_push_wins() {
        let hub = SubscriptionHub::new();
        let mut sub = hub.subscribe("contacts", docs(&[]));
        sub.next().await.unwrap();

        hub.publish("contacts", docs(&["a"]));
        hub.publish("contacts", docs(&["a", "b"]));

        let next = sub.next().await.unwrap();
        assert_eq!(ids(&next), vec!["a", "b"]);
    }

    #[test]
    fn test_drop_releases_channel() {
        let hub = SubscriptionHub::new();
        let first = hub.subscribe("contacts", docs(&[]));
        let second = hub.subscribe("contacts", docs(&[]));
        assert_eq!(hub.subscriber_count("contacts"), 2);

        drop(first);
        assert!(hub.is_subscribed("contacts"));

        second.unsubscribe();
        assert!(!hub.is_subscribed("contacts"));
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let hub = SubscriptionHub::new();
        hub.publish("contacts", docs(&["a"]));
        assert!(hub.subscribed_collections().is_empty());
    }
}
