//! Polling queues
//!
//! A queue is a JSON array stored under `queue__<key>` in a
//! [`KeyValueBackend`]. Producers append to it, possibly from another
//! process sharing the backend. A watcher task pops one item per active
//! queue on every tick and hands it to that queue's callback.

use crate::storage::KeyValueBackend;
use crate::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const QUEUE_PREFIX: &str = "queue__";
pub const DEFAULT_POLLING_RATE: Duration = Duration::from_millis(250);

pub type QueueCallback = Arc<dyn Fn(Value) + Send + Sync>;

struct Watcher {
    polling_rate: Duration,
    task: JoinHandle<()>,
}

struct QueueInner {
    backend: Arc<dyn KeyValueBackend>,
    callbacks: RwLock<BTreeMap<String, QueueCallback>>,
    watcher: Mutex<Option<Watcher>>,
    // Held across every read-modify-write of stored queues
    storage_lock: tokio::sync::Mutex<()>,
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            watcher.task.abort();
        }
    }
}

#[derive(Clone)]
pub struct QueueHandler {
    inner: Arc<QueueInner>,
}

/// `queue__<key>`, leaving already prefixed keys alone
pub fn to_queue_key(key: &str) -> String {
    if key.starts_with(QUEUE_PREFIX) {
        key.to_string()
    } else {
        format!("{}{}", QUEUE_PREFIX, key)
    }
}

impl QueueHandler {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                backend,
                callbacks: RwLock::new(BTreeMap::new()),
                watcher: Mutex::new(None),
                storage_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn is_queue_active(&self, key: &str) -> bool {
        self.inner
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&to_queue_key(key))
    }

    pub fn active_queues(&self) -> Vec<String> {
        self.inner.callbacks.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }

    /// Rate of the running watcher, if any
    pub fn polling_rate(&self) -> Option<Duration> {
        self.inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|w| w.polling_rate)
    }

    /// Start a queue, resetting its stored content
    ///
    /// Returns `false` when the queue is already active. Starts the watcher
    /// at the default rate if none runs yet.
    pub async fn set_queue(&self, key: &str, callback: impl Fn(Value) + Send + Sync + 'static) -> Result<bool> {
        let queue_key = to_queue_key(key);
        {
            let mut callbacks = self.inner.callbacks.write().unwrap_or_else(PoisonError::into_inner);
            if callbacks.contains_key(&queue_key) {
                log::debug!("Queue {} is already being watched", key);
                return Ok(false);
            }
            callbacks.insert(queue_key.clone(), Arc::new(callback));
        }

        {
            let _guard = self.inner.storage_lock.lock().await;
            self.inner.backend.set(&queue_key, "[]".to_string()).await?;
        }
        log::debug!("Queue {} is now being watched", key);

        let rate = self.polling_rate().unwrap_or(DEFAULT_POLLING_RATE);
        self.watch(rate);
        Ok(true)
    }

    /// Stop a queue and delete its stored content
    pub async fn destroy_queue(&self, key: &str) -> Result<bool> {
        let queue_key = to_queue_key(key);
        let removed = self
            .inner
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&queue_key)
            .is_some();
        if removed {
            let _guard = self.inner.storage_lock.lock().await;
            self.inner.backend.remove(&queue_key).await?;
        }
        Ok(removed)
    }

    /// Append an item; inactive queues refuse it
    pub async fn add_to_queue(&self, key: &str, item: Value) -> Result<bool> {
        if !self.is_queue_active(key) {
            log::warn!("Failed to add to queue {}: not active", key);
            return Ok(false);
        }
        let queue_key = to_queue_key(key);
        let _guard = self.inner.storage_lock.lock().await;
        let mut queue = self.parsed_queue(&queue_key).await?;
        queue.push(item);
        self.inner.backend.set(&queue_key, serde_json::to_string(&queue)?).await?;
        Ok(true)
    }

    /// Stored items of a queue; unreadable content counts as empty
    pub async fn parsed_queue(&self, key: &str) -> Result<Vec<Value>> {
        let raw = self.inner.backend.get(&to_queue_key(key)).await?;
        Ok(raw.and_then(|r| serde_json::from_str(&r).ok()).unwrap_or_default())
    }

    /// Pop the head of a queue and pass it to the queue's callback
    pub async fn consume_queue_item(&self, key: &str) -> Result<Option<Value>> {
        let queue_key = to_queue_key(key);
        let next = {
            let _guard = self.inner.storage_lock.lock().await;
            let mut queue = self.parsed_queue(&queue_key).await?;
            if queue.is_empty() {
                return Ok(None);
            }
            let next = queue.remove(0);
            self.inner.backend.set(&queue_key, serde_json::to_string(&queue)?).await?;
            next
        };

        let callback = self
            .inner
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&queue_key)
            .cloned();
        if let Some(callback) = callback {
            callback(next.clone());
        }
        Ok(Some(next))
    }

    /// Run the watcher at `polling_rate`
    ///
    /// A watcher already running at that rate is kept; one at another rate
    /// is replaced. Must be called inside a Tokio runtime.
    pub fn watch(&self, polling_rate: Duration) {
        let mut watcher = self.inner.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = watcher.as_ref() {
            if current.polling_rate == polling_rate && !current.task.is_finished() {
                return;
            }
            current.task.abort();
        }

        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(poll(weak, polling_rate));
        *watcher = Some(Watcher { polling_rate, task });
    }

    pub fn stop(&self) {
        if let Some(watcher) = self.inner.watcher.lock().unwrap_or_else(PoisonError::into_inner).take() {
            watcher.task.abort();
        }
    }
}

async fn poll(inner: Weak<QueueInner>, polling_rate: Duration) {
    let mut interval = tokio::time::interval(polling_rate);
    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let handler = QueueHandler { inner };
        for key in handler.active_queues() {
            if let Err(e) = handler.consume_queue_item(&key).await {
                log::error!("Failed to consume {}: {}", key, e);
            }
        }
    }
}
