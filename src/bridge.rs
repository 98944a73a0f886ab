//! The sync bridge: an eventually-consistent, subscribable key-value store
//! replicating room state between clients.
//!
//! The core only depends on the small capability set in [`SyncBridge`];
//! per-key single-writer discipline is the application's job, not the
//! store's. Keys are slash-separated paths into a JSON document tree
//! (`rooms/AB12CD/players/<id>`), and a subscriber of a key sees that key's
//! updates in write order.
//!
//! [`MemoryBridge`] is the in-process implementation used by tests, the demo
//! binary, and as the reference semantics for a real backend.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch, RwLock};

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The bridge has no connectivity; the operation was not applied.
    #[error("bridge is not connected")]
    Disconnected,

    #[error("value serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A change notification for a subscribed key: the key's new value, or
/// `None` when the key was removed.
#[derive(Debug, Clone)]
pub struct KeyChange {
    pub key: String,
    pub value: Option<Value>,
}

/// A live subscription to one key. Dropping it unsubscribes.
pub struct Subscription {
    key: String,
    receiver: mpsc::UnboundedReceiver<KeyChange>,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The next change, or `None` once the bridge is gone.
    pub async fn recv(&mut self) -> Option<KeyChange> {
        self.receiver.recv().await
    }
}

/// Minimal capability set of the replicated store.
#[async_trait]
pub trait SyncBridge: Send + Sync {
    /// Replace the value at `key`.
    async fn set(&self, key: &str, value: Value) -> BridgeResult<()>;

    /// Merge `partial` into the object at `key`, creating it if absent.
    /// A `null` field deletes that child.
    async fn update(&self, key: &str, partial: Map<String, Value>) -> BridgeResult<()>;

    /// Remove the subtree at `key`.
    async fn remove(&self, key: &str) -> BridgeResult<()>;

    /// One-shot read of the value at `key`.
    async fn once(&self, key: &str) -> BridgeResult<Option<Value>>;

    /// Subscribe to `key`. The current value is delivered immediately,
    /// then every change to the key or anything beneath it.
    async fn subscribe(&self, key: &str) -> BridgeResult<Subscription>;

    fn connected(&self) -> bool;

    /// Watch connectivity transitions.
    fn connectivity(&self) -> watch::Receiver<bool>;
}

struct Subscriber {
    key: String,
    sender: mpsc::UnboundedSender<KeyChange>,
}

/// In-process bridge over a JSON document tree.
pub struct MemoryBridge {
    root: RwLock<Value>,
    subscribers: RwLock<Vec<Subscriber>>,
    connectivity: watch::Sender<bool>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        let (connectivity, _) = watch::channel(true);
        Self {
            root: RwLock::new(Value::Object(Map::new())),
            subscribers: RwLock::new(Vec::new()),
            connectivity,
        }
    }

    /// Flip the simulated connectivity signal.
    pub fn set_connected(&self, connected: bool) {
        self.connectivity.send_replace(connected);
    }

    async fn notify(&self, changed: &str) {
        let root = self.root.read().await;
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|s| !s.sender.is_closed());
        for sub in subscribers.iter() {
            if paths_related(&sub.key, changed) {
                let value = lookup(&root, &sub.key).cloned();
                let _ = sub.sender.send(KeyChange {
                    key: sub.key.clone(),
                    value,
                });
            }
        }
    }

    fn check_connected(&self) -> BridgeResult<()> {
        if *self.connectivity.borrow() {
            Ok(())
        } else {
            Err(BridgeError::Disconnected)
        }
    }
}

impl Default for MemoryBridge {
    fn default() -> Self {
        Self::new()
    }
}

fn segments(key: &str) -> Vec<&str> {
    key.split('/').filter(|s| !s.is_empty()).collect()
}

/// Two paths are related when one is the other's ancestor (or they are
/// equal): a write anywhere in a subscriber's subtree, or above it, changes
/// what the subscriber sees.
fn paths_related(a: &str, b: &str) -> bool {
    let a = segments(a);
    let b = segments(b);
    let shared = a.len().min(b.len());
    a[..shared] == b[..shared]
}

fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    let mut node = root;
    for seg in segments(key) {
        node = node.as_object()?.get(seg)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn node_at<'a>(root: &'a mut Value, segs: &[&str]) -> &'a mut Value {
    let mut node = root;
    for seg in segs {
        node = ensure_object(node).entry(seg.to_string()).or_insert(Value::Null);
    }
    node
}

#[async_trait]
impl SyncBridge for MemoryBridge {
    async fn set(&self, key: &str, value: Value) -> BridgeResult<()> {
        self.check_connected()?;
        {
            let mut root = self.root.write().await;
            *node_at(&mut root, &segments(key)) = value;
        }
        self.notify(key).await;
        Ok(())
    }

    async fn update(&self, key: &str, partial: Map<String, Value>) -> BridgeResult<()> {
        self.check_connected()?;
        {
            let mut root = self.root.write().await;
            let target = ensure_object(node_at(&mut root, &segments(key)));
            for (field, value) in partial {
                if value.is_null() {
                    target.remove(&field);
                } else {
                    target.insert(field, value);
                }
            }
        }
        self.notify(key).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> BridgeResult<()> {
        self.check_connected()?;
        {
            let mut root = self.root.write().await;
            let segs = segments(key);
            match segs.split_last() {
                Some((last, parents)) => {
                    if let Value::Object(map) = node_at(&mut root, parents) {
                        map.remove(*last);
                    }
                }
                None => *root = Value::Object(Map::new()),
            }
        }
        self.notify(key).await;
        Ok(())
    }

    async fn once(&self, key: &str) -> BridgeResult<Option<Value>> {
        self.check_connected()?;
        let root = self.root.read().await;
        Ok(lookup(&root, key).cloned())
    }

    async fn subscribe(&self, key: &str) -> BridgeResult<Subscription> {
        self.check_connected()?;
        let (sender, receiver) = mpsc::unbounded_channel();

        let current = {
            let root = self.root.read().await;
            lookup(&root, key).cloned()
        };
        let _ = sender.send(KeyChange {
            key: key.to_string(),
            value: current,
        });

        self.subscribers.write().await.push(Subscriber {
            key: key.to_string(),
            sender,
        });

        Ok(Subscription {
            key: key.to_string(),
            receiver,
        })
    }

    fn connected(&self) -> bool {
        *self.connectivity.borrow()
    }

    fn connectivity(&self) -> watch::Receiver<bool> {
        self.connectivity.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn test_set_and_once_roundtrip() {
        let bridge = MemoryBridge::new();
        bridge
            .set("rooms/AB12CD", json!({"started": false}))
            .await
            .unwrap();

        let value = bridge.once("rooms/AB12CD").await.unwrap().unwrap();
        assert_eq!(value, json!({"started": false}));
        assert_eq!(
            bridge.once("rooms/AB12CD/started").await.unwrap().unwrap(),
            json!(false)
        );
        assert!(bridge.once("rooms/XXXXXX").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_merges_and_null_deletes() {
        let bridge = MemoryBridge::new();
        bridge
            .set("r", json!({"a": 1, "b": 2}))
            .await
            .unwrap();
        bridge
            .update("r", obj(json!({"b": 3, "c": 4, "a": null})))
            .await
            .unwrap();

        let value = bridge.once("r").await.unwrap().unwrap();
        assert_eq!(value, json!({"b": 3, "c": 4}));
    }

    #[tokio::test]
    async fn test_remove_deletes_subtree() {
        let bridge = MemoryBridge::new();
        bridge.set("rooms/R/players/p1", json!({"score": 0})).await.unwrap();
        bridge.remove("rooms/R").await.unwrap();
        assert!(bridge.once("rooms/R").await.unwrap().is_none());
        assert!(bridge.once("rooms/R/players/p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_then_changes_in_order() {
        let bridge = MemoryBridge::new();
        bridge.set("rooms/R", json!({"v": 0})).await.unwrap();

        let mut sub = bridge.subscribe("rooms/R").await.unwrap();
        assert_eq!(sub.recv().await.unwrap().value, Some(json!({"v": 0})));

        for v in 1..=3 {
            bridge.set("rooms/R", json!({ "v": v })).await.unwrap();
        }
        for v in 1..=3 {
            assert_eq!(sub.recv().await.unwrap().value, Some(json!({ "v": v })));
        }
    }

    #[tokio::test]
    async fn test_child_write_notifies_parent_subscriber() {
        let bridge = MemoryBridge::new();
        bridge.set("rooms/R", json!({"players": {}})).await.unwrap();
        let mut sub = bridge.subscribe("rooms/R").await.unwrap();
        let _ = sub.recv().await; // initial snapshot

        bridge
            .set("rooms/R/players/p1", json!({"score": 10}))
            .await
            .unwrap();
        let change = sub.recv().await.unwrap();
        assert_eq!(
            change.value,
            Some(json!({"players": {"p1": {"score": 10}}}))
        );
    }

    #[tokio::test]
    async fn test_removal_notifies_with_none() {
        let bridge = MemoryBridge::new();
        bridge.set("rooms/R", json!({"v": 1})).await.unwrap();
        let mut sub = bridge.subscribe("rooms/R").await.unwrap();
        let _ = sub.recv().await;

        bridge.remove("rooms/R").await.unwrap();
        assert!(sub.recv().await.unwrap().value.is_none());
    }

    #[tokio::test]
    async fn test_unrelated_write_is_silent() {
        let bridge = MemoryBridge::new();
        let mut sub = bridge.subscribe("rooms/R").await.unwrap();
        let _ = sub.recv().await;

        bridge.set("rooms/OTHER", json!(1)).await.unwrap();
        assert!(sub.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnected_operations_fail_cleanly() {
        let bridge = MemoryBridge::new();
        bridge.set("k", json!(1)).await.unwrap();
        bridge.set_connected(false);
        assert!(!bridge.connected());

        assert!(matches!(
            bridge.set("k", json!(2)).await,
            Err(BridgeError::Disconnected)
        ));
        assert!(matches!(
            bridge.once("k").await,
            Err(BridgeError::Disconnected)
        ));

        // State was not corrupted; reconnect and read back.
        bridge.set_connected(true);
        assert_eq!(bridge.once("k").await.unwrap().unwrap(), json!(1));
    }
}
