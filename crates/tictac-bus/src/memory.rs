//! In-process sync bus over a `tokio` broadcast channel.
//!
//! Clones share one channel, so several coordinators in one process behave
//! like instances on a shared NATS server: each subscriber sees every
//! event, its own included. The most recent `(channel, event)` pairs are
//! kept for inspection.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tictac_types::SyncEvent;
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::BusError;
use crate::{DEFAULT_PREFIX, SyncBus, SyncStream};

/// Buffered events per subscriber before it starts lagging.
const CAPACITY: usize = 256;

/// Published events retained by [`MemoryBus::history`].
pub const HISTORY_LIMIT: usize = 128;

#[derive(Debug)]
struct Inner {
    sender: broadcast::Sender<SyncEvent>,
    prefix: String,
    history: Mutex<VecDeque<(String, SyncEvent)>>,
    offline: AtomicBool,
}

/// Shared in-memory [`SyncBus`].
#[derive(Debug, Clone)]
pub struct MemoryBus {
    inner: Arc<Inner>,
}

impl MemoryBus {
    /// Create a bus publishing below `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self {
            inner: Arc::new(Inner {
                sender,
                prefix: prefix.into(),
                history: Mutex::new(VecDeque::with_capacity(HISTORY_LIMIT)),
                offline: AtomicBool::new(false),
            }),
        }
    }

    /// Simulate losing (`false`) or regaining (`true`) the bus.
    pub fn set_available(&self, available: bool) {
        self.inner.offline.store(!available, Ordering::SeqCst);
    }

    /// The last [`HISTORY_LIMIT`] published events, oldest first, with the
    /// channel each went out on.
    pub fn history(&self) -> Vec<(String, SyncEvent)> {
        self.inner.history.lock().iter().cloned().collect()
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

#[async_trait]
impl SyncBus for MemoryBus {
    async fn publish(&self, event: &SyncEvent) -> Result<(), BusError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(BusError::Unavailable(String::from("memory bus is offline")));
        }
        let channel = event.channel().name(&self.inner.prefix);
        {
            let mut history = self.inner.history.lock();
            if history.len() >= HISTORY_LIMIT {
                history.pop_front();
            }
            history.push_back((channel, event.clone()));
        }
        // No receivers is not an error: nobody is listening yet.
        let _ = self.inner.sender.send(event.clone());
        Ok(())
    }

    async fn subscribe(&self) -> Result<SyncStream, BusError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(BusError::Unavailable(String::from("memory bus is offline")));
        }
        let receiver = self.inner.sender.subscribe();
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "sync subscriber lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }
}
